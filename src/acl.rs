use dashmap::DashMap;
use std::collections::HashSet;
use tracing::debug;

use crate::models::{Capability, UserId, UserRecord};

// Answers "may this user do X"
pub trait PermissionOracle: Send + Sync {
    fn has_capability(&self, user: &UserRecord, capability: Capability) -> bool;
}

// Per-user capability sets
#[derive(Debug, Default)]
pub struct Acl {
    grants: DashMap<UserId, HashSet<Capability>>,
}

impl Acl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, user_id: UserId, capability: Capability) {
        debug!("Granting {} to user {}", capability, user_id);
        self.grants.entry(user_id).or_default().insert(capability);
    }

    pub fn revoke(&self, user_id: UserId, capability: Capability) {
        if let Some(mut caps) = self.grants.get_mut(&user_id) {
            caps.remove(&capability);
        }
    }
}

impl PermissionOracle for Acl {
    fn has_capability(&self, user: &UserRecord, capability: Capability) -> bool {
        self.grants
            .get(&user.id)
            .is_some_and(|caps| caps.contains(&capability))
    }
}
