use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::FromRef,
    http::{header::AUTHORIZATION, HeaderMap},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use super::claims::Claims;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::users::repo_types::User;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS384;
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Issues and verifies HMAC-signed bearer tokens. Immutable after startup.
#[derive(Clone)]
pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl FromRef<AppState> for TokenManager {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl TokenManager {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn issue(&self, user: &User) -> AppResult<String> {
        let exp = OffsetDateTime::now_utc() + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            exp: exp.unix_timestamp() as u64,
        };
        let token = encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding)
            .context("sign token")?;
        debug!(user_id = user.id, role = ?user.role, "jwt signed");
        Ok(token)
    }

    /// Rejects non-HMAC algorithms, bad signatures, malformed payloads and
    /// expired tokens alike with `InvalidToken`.
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            AppError::InvalidToken
        })?;
        Ok(data.claims)
    }

    /// Reads `authorization: Bearer <token>` and verifies the token.
    pub fn claims_from_headers(&self, headers: &HeaderMap) -> AppResult<Claims> {
        let value = headers.get(AUTHORIZATION).ok_or(AppError::NoToken)?;
        let value = value.to_str().map_err(|_| AppError::InvalidToken)?;
        let token = parse_bearer(value)?;
        self.verify(token)
    }
}

/// Splits a header value into exactly a `Bearer` scheme and a token.
pub fn parse_bearer(value: &str) -> AppResult<&str> {
    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => {
            warn!("malformed authorization header");
            Err(AppError::InvalidToken)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::Role;
    use axum::http::HeaderValue;

    const NONE_ALG_TOKEN: &str = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.eyJzdWIiOiIxIiwiZW1haWwiOiJhQHguY29tIiwicm9sZSI6ImFkbWluIiwiZXhwIjo0MTAyNDQ0ODAwfQ.";
    const RS256_TOKEN: &str = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.eyJzdWIiOiIxIiwiZW1haWwiOiJhQHguY29tIiwicm9sZSI6ImFkbWluIiwiZXhwIjo0MTAyNDQ0ODAwfQ.c2ln";

    fn make_tokens(secret: &str) -> TokenManager {
        TokenManager::new(secret.as_bytes(), Duration::from_secs(3600))
    }

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            email: "a@x.com".into(),
            phone_number: "+1".into(),
            name: "A".into(),
            surname: "B".into(),
            password_hash: String::new(),
            registered_at: OffsetDateTime::now_utc(),
            role,
            family_ids: vec![],
        }
    }

    #[test]
    fn issue_and_verify_reproduces_identity() {
        let tokens = make_tokens("dev-secret");
        let before = OffsetDateTime::now_utc().unix_timestamp();
        let token = tokens.issue(&user(5, Role::Admin)).expect("sign");
        let claims = tokens.verify(&token).expect("verify");
        assert_eq!(claims.user_id().unwrap(), 5);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, Role::Admin);
        let expected = before + 3600;
        assert!((claims.exp as i64 - expected).abs() <= 1);
    }

    #[test]
    fn verify_rejects_foreign_signature() {
        let token = make_tokens("one").issue(&user(1, Role::User)).unwrap();
        assert!(matches!(
            make_tokens("two").verify(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn verify_rejects_algorithm_substitution() {
        let tokens = make_tokens("dev-secret");
        assert!(matches!(tokens.verify(NONE_ALG_TOKEN), Err(AppError::InvalidToken)));
        assert!(matches!(tokens.verify(RS256_TOKEN), Err(AppError::InvalidToken)));
    }

    #[test]
    fn verify_accepts_other_hmac_variants() {
        let claims = Claims {
            sub: "3".into(),
            email: "a@x.com".into(),
            role: Role::User,
            exp: (OffsetDateTime::now_utc().unix_timestamp() + 60) as u64,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"dev-secret"),
        )
        .unwrap();
        assert_eq!(make_tokens("dev-secret").verify(&token).unwrap(), claims);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let claims = Claims {
            sub: "3".into(),
            email: "a@x.com".into(),
            role: Role::User,
            exp: (OffsetDateTime::now_utc().unix_timestamp() - 10) as u64,
        };
        let token = encode(
            &Header::new(SIGNING_ALGORITHM),
            &claims,
            &EncodingKey::from_secret(b"dev-secret"),
        )
        .unwrap();
        assert!(matches!(
            make_tokens("dev-secret").verify(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn verify_rejects_garbage() {
        assert!(matches!(
            make_tokens("s").verify("not.a.jwt"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn bearer_parsing_is_bounds_checked() {
        assert_eq!(parse_bearer("Bearer abc").unwrap(), "abc");
        assert_eq!(parse_bearer("bearer   abc").unwrap(), "abc");
        assert!(matches!(parse_bearer("Bearer"), Err(AppError::InvalidToken)));
        assert!(matches!(parse_bearer(""), Err(AppError::InvalidToken)));
        assert!(matches!(parse_bearer("Bearer a b"), Err(AppError::InvalidToken)));
        assert!(matches!(parse_bearer("Basic abc"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn claims_from_headers_distinguishes_missing_and_malformed() {
        let tokens = make_tokens("dev-secret");
        let mut headers = HeaderMap::new();
        assert!(matches!(
            tokens.claims_from_headers(&headers),
            Err(AppError::NoToken)
        ));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));
        assert!(matches!(
            tokens.claims_from_headers(&headers),
            Err(AppError::InvalidToken)
        ));

        let token = tokens.issue(&user(9, Role::User)).unwrap();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        let claims = tokens.claims_from_headers(&headers).unwrap();
        assert_eq!(claims.user_id().unwrap(), 9);
    }
}
