use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::error::AppError;

/// Role attached to every account. New accounts are always `User`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => anyhow::bail!("unknown role {other:?}"),
        }
    }
}

/// User record as held by the credential store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub phone_number: String,
    pub name: String,
    pub surname: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never returned
    #[serde(with = "time::serde::rfc3339")]
    pub registered_at: OffsetDateTime,
    pub role: Role,
    pub family_ids: Vec<i64>,
}

/// Input to `CredentialStore::create_user`. Id and role are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub phone_number: String,
    pub name: String,
    pub surname: String,
    pub password_hash: String,
    pub registered_at: OffsetDateTime,
}

/// Editable profile fields. In a patch an empty string means "keep current".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFields {
    pub email: String,
    pub phone_number: String,
    pub name: String,
    pub surname: String,
}

impl ProfileFields {
    /// Fills every empty field of the patch from `current`.
    pub fn merged_onto(self, current: &User) -> ProfileFields {
        fn pick(new: String, old: &str) -> String {
            if new.is_empty() {
                old.to_string()
            } else {
                new
            }
        }
        ProfileFields {
            email: pick(self.email, &current.email),
            phone_number: pick(self.phone_number, &current.phone_number),
            name: pick(self.name, &current.name),
            surname: pick(self.surname, &current.surname),
        }
    }
}

/// Row shape of the `users` table.
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: i64,
    pub email: String,
    pub phone_number: String,
    pub name: String,
    pub surname: String,
    pub password_hash: String,
    pub registered_at: OffsetDateTime,
    pub role: String,
    pub family_ids: Vec<i64>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let role = r.role.parse::<Role>()?;
        Ok(Self {
            id: r.id,
            email: r.email,
            phone_number: r.phone_number,
            name: r.name,
            surname: r.surname,
            password_hash: r.password_hash,
            registered_at: r.registered_at,
            role,
            family_ids: r.family_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample() -> User {
        User {
            id: 7,
            email: "a@x.com".into(),
            phone_number: "+100".into(),
            name: "Ann".into(),
            surname: "Old".into(),
            password_hash: "$argon2id$secret".into(),
            registered_at: datetime!(2024-01-02 03:04:05 UTC),
            role: Role::User,
            family_ids: vec![1, 2],
        }
    }

    #[test]
    fn patch_keeps_unspecified_fields() {
        let patch = ProfileFields {
            surname: "New".into(),
            ..Default::default()
        };
        let merged = patch.merged_onto(&sample());
        assert_eq!(merged.name, "Ann");
        assert_eq!(merged.surname, "New");
        assert_eq!(merged.email, "a@x.com");
        assert_eq!(merged.phone_number, "+100");
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"user\""));
    }

    #[test]
    fn role_parses_only_known_values() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }
}
