use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use super::{claims::Claims, jwt::TokenManager};
use crate::error::AppError;

/// Verified claims of the caller's own bearer token.
///
/// Taken from the request extensions when the access layer already checked
/// the token; verified from the header otherwise.
pub struct Caller(pub Claims);

impl Caller {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.0.user_id()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
    TokenManager: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(Caller(claims.clone()));
        }
        let tokens = TokenManager::from_ref(state);
        tokens.claims_from_headers(&parts.headers).map(Caller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::Role;
    use axum::http::{header::AUTHORIZATION, Request};
    use std::time::Duration;

    fn claims() -> Claims {
        Claims {
            sub: "12".into(),
            email: "a@x.com".into(),
            role: Role::User,
            exp: 0,
        }
    }

    async fn extract(req: Request<()>) -> Result<Caller, AppError> {
        let tokens = TokenManager::new(b"test", Duration::from_secs(60));
        let (mut parts, _) = req.into_parts();
        Caller::from_request_parts(&mut parts, &tokens).await
    }

    #[tokio::test]
    async fn claims_from_access_layer_are_reused() {
        // exp 0 and no header: only the extension can satisfy this
        let req = Request::builder().extension(claims()).body(()).unwrap();
        let caller = extract(req).await.unwrap();
        assert_eq!(caller.user_id().unwrap(), 12);
    }

    #[tokio::test]
    async fn falls_back_to_header() {
        let req = Request::builder().body(()).unwrap();
        assert!(matches!(extract(req).await, Err(AppError::NoToken)));

        let req = Request::builder()
            .header(AUTHORIZATION, "Bearer nope")
            .body(())
            .unwrap();
        assert!(matches!(extract(req).await, Err(AppError::InvalidToken)));
    }
}
