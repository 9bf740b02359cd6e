use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::{claims::Claims, jwt::TokenManager, policy::AccessPolicy};
use crate::error::{AppError, AppResult};

/// Enforces the [`AccessPolicy`] once per inbound call, before the handler
/// or any body extractor runs.
#[derive(Clone)]
pub struct AccessInterceptor {
    tokens: TokenManager,
    policy: Arc<AccessPolicy>,
}

impl AccessInterceptor {
    pub fn new(tokens: TokenManager, policy: Arc<AccessPolicy>) -> Self {
        Self { tokens, policy }
    }

    /// Returns the verified claims for protected operations, `None` for public ones.
    pub fn authorize(&self, operation: &str, headers: &HeaderMap) -> AppResult<Option<Claims>> {
        let Some(allowed) = self.policy.allowed_roles(operation) else {
            return Ok(None);
        };

        let claims = self.tokens.claims_from_headers(headers)?;
        if allowed.contains(&claims.role) {
            debug!(operation, sub = %claims.sub, "access granted");
            return Ok(Some(claims));
        }

        warn!(operation, sub = %claims.sub, role = ?claims.role, "access denied");
        Err(AppError::Forbidden)
    }
}

/// `/Service/Method` -> `Service.Method`.
pub fn operation_id(path: &str) -> Option<String> {
    let mut parts = path.trim_start_matches('/').split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(service), Some(method), None) if !service.is_empty() && !method.is_empty() => {
            Some(format!("{service}.{method}"))
        }
        _ => None,
    }
}

/// Verified claims travel to the handler in the request extensions.
pub async fn enforce_access(
    State(interceptor): State<AccessInterceptor>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(operation) = operation_id(req.uri().path()) {
        if let Some(claims) = interceptor.authorize(&operation, req.headers())? {
            req.extensions_mut().insert(claims);
        }
    }
    Ok(next.run(req).await)
}
