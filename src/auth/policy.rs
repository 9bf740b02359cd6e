use std::collections::{HashMap, HashSet};

use crate::users::repo_types::Role;

/// Protected operation id -> roles allowed to invoke it.
/// Operations missing from the table are public.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: HashMap<String, HashSet<Role>>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protect(mut self, operation: &str, roles: &[Role]) -> Self {
        self.rules
            .insert(operation.to_string(), roles.iter().copied().collect());
        self
    }

    /// The table served by this process.
    pub fn standard() -> Self {
        use Role::{Admin, User};
        Self::new()
            .protect("Permissions.IsAdmin", &[Admin])
            .protect("UserInfo.GetUserInfo", &[User, Admin])
            .protect("UserInfo.UpdateUserInfo", &[User, Admin])
            .protect("UserInfo.ChangePassword", &[User, Admin])
            .protect("UserInfo.GetUserInfoByID", &[Admin])
            .protect("UserInfo.AddFamily", &[Admin])
            .protect("UserInfo.DeleteFamily", &[Admin])
            .protect("UserInfo.DeleteUser", &[Admin])
    }

    /// `None` when the operation is public.
    pub fn allowed_roles(&self, operation: &str) -> Option<&HashSet<Role>> {
        self.rules.get(operation)
    }
}
