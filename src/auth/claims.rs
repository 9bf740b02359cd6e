use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::users::repo_types::Role;

/// JWT payload. Decoded and validated once, in `TokenManager::verify`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // user ID
    pub email: String,
    pub role: Role,
    pub exp: u64, // expires at (unix timestamp)
}

impl Claims {
    /// The subject must be a whole number.
    pub fn user_id(&self) -> AppResult<i64> {
        self.sub.parse::<i64>().map_err(|_| AppError::TokenClaims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str) -> Claims {
        Claims {
            sub: sub.into(),
            email: "a@x.com".into(),
            role: Role::User,
            exp: 0,
        }
    }

    #[test]
    fn numeric_subject_yields_user_id() {
        assert_eq!(claims("42").user_id().unwrap(), 42);
    }

    #[test]
    fn non_numeric_subject_is_a_claims_error() {
        assert!(matches!(claims("4.2").user_id(), Err(AppError::TokenClaims)));
        assert!(matches!(claims("abc").user_id(), Err(AppError::TokenClaims)));
        assert!(matches!(claims("").user_id(), Err(AppError::TokenClaims)));
    }
}
