use std::collections::{HashMap, HashSet};

use super::users::Role;
use crate::proto::methods;

/// Maps a full gRPC method path to the roles allowed to call it.
///
/// A method that is not listed is public: the server lets it through
/// without looking for a token. Every protected method must be registered
/// here explicitly.
#[derive(Clone, Debug, Default)]
pub struct AccessPolicy {
    rules: HashMap<String, HashSet<Role>>,
}

impl AccessPolicy {
    /// Creates an empty policy (everything public).
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts `method` to `roles`.
    pub fn allow(
        mut self,
        method: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        self.rules
            .entry(method.into())
            .or_default()
            .extend(roles);
        self
    }

    /// Policy for the laptop catalog.
    pub fn laptop_service() -> Self {
        Self::new()
            .allow(methods::CREATE_LAPTOP, [Role::Admin])
            .allow(methods::UPLOAD_IMAGE, [Role::Admin])
            .allow(methods::RATE_LAPTOP, [Role::Admin, Role::User])
    }

    /// Allowed roles for `method`, or `None` when it is public.
    pub fn allowed_roles(&self, method: &str) -> Option<&HashSet<Role>> {
        self.rules.get(method)
    }

    /// Whether `method` requires a token.
    pub fn is_protected(&self, method: &str) -> bool {
        self.rules.contains_key(method)
    }

    /// All protected method paths; clients use this to decide where to
    /// attach their token.
    pub fn protected_methods(&self) -> HashSet<String> {
        self.rules.keys().cloned().collect()
    }
}
