#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use schoolyard::middleware::permissions::PermissionStore;
use schoolyard::middleware::tenant::RoleContext;

/// In-memory permission store mirroring the Postgres store's contract:
/// grants resolve only through live roles, and deactivated roles yield an
/// empty set.
#[derive(Default)]
pub struct InMemoryStore {
    grants: Mutex<HashMap<Uuid, HashSet<String>>>,
    inactive: Mutex<HashSet<Uuid>>,
    lookups: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, role_id: Uuid, permissions: &[&str]) {
        self.grants
            .lock()
            .unwrap()
            .entry(role_id)
            .or_default()
            .extend(permissions.iter().map(|p| p.to_string()));
    }

    pub fn deactivate_role(&self, role_id: Uuid) {
        self.inactive.lock().unwrap().insert(role_id);
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionStore for InMemoryStore {
    async fn permissions_for_role(&self, role_id: Uuid) -> anyhow::Result<HashSet<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.inactive.lock().unwrap().contains(&role_id) {
            return Ok(HashSet::new());
        }
        Ok(self
            .grants
            .lock()
            .unwrap()
            .get(&role_id)
            .cloned()
            .unwrap_or_default())
    }
}

pub fn role_context(user_id: Uuid, school_id: Option<Uuid>, role_id: Uuid) -> RoleContext {
    RoleContext {
        user_id,
        school_id,
        role_id,
        is_global: school_id.is_none(),
    }
}
