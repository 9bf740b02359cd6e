use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{ProfileFields, User};

/// Public view of an account. Hash, role and family ids stay inside.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: i64,
    pub email: String,
    pub phone_number: String,
    pub name: String,
    pub surname: String,
    #[serde(with = "time::serde::rfc3339")]
    pub registered_at: OffsetDateTime,
}

impl From<User> for ProfileResponse {
    fn from(u: User) -> Self {
        Self {
            user_id: u.id,
            email: u.email,
            phone_number: u.phone_number,
            name: u.name,
            surname: u.surname,
            registered_at: u.registered_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserIdRequest {
    pub user_id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateUserInfoRequest {
    pub new_email: String,
    pub new_phone_number: String,
    pub new_name: String,
    pub new_surname: String,
}

impl From<UpdateUserInfoRequest> for ProfileFields {
    fn from(r: UpdateUserInfoRequest) -> Self {
        Self {
            email: r.new_email.trim().to_lowercase(),
            phone_number: r.new_phone_number.trim().to_string(),
            name: r.new_name.trim().to_string(),
            surname: r.new_surname.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct FamilyRequest {
    pub user_id: i64,
    pub family_id: i64,
}

#[derive(Debug, Serialize)]
pub struct SucceedResponse {
    pub succeed: bool,
}

impl SucceedResponse {
    pub fn ok() -> Self {
        Self { succeed: true }
    }
}
