//! Principal persistence contract and in-memory backing.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::error::StoreError;
use crate::principal::Principal;

/// Collaborator contract for principal persistence.
///
/// Calls are synchronous boundary calls; implementations may block.
pub trait PrincipalStore: Send + Sync {
    /// Find a principal using its `email` natural key.
    fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError>;

    /// Find a principal using its assigned id.
    fn find_by_id(&self, id: i64) -> Result<Option<Principal>, StoreError>;

    /// Insert a new principal, assigning its id and `created_at`, or
    /// overwrite the row with the same id. Maintains `updated_at`.
    fn upsert(&self, principal: Principal) -> Result<Principal, StoreError>;
}

/// Map-backed [`PrincipalStore`].
#[derive(Debug, Default)]
pub struct MemoryPrincipalStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    rows: HashMap<i64, Principal>,
}

impl PrincipalStore for MemoryPrincipalStore {
    fn find_by_email(&self, email: &str) -> Result<Option<Principal>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;

        Ok(inner.rows.values().find(|p| p.email == email).cloned())
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Principal>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;

        Ok(inner.rows.get(&id).cloned())
    }

    fn upsert(&self, mut principal: Principal) -> Result<Principal, StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        let now = Utc::now();

        if principal.id == 0 {
            // same unique constraint a SQL backend would enforce.
            if inner.rows.values().any(|p| p.email == principal.email) {
                return Err(StoreError::Backend(format!(
                    "email '{}' already taken",
                    principal.email
                )));
            }

            inner.next_id += 1;
            principal.id = inner.next_id;
            principal.created_at = now;
        }
        principal.updated_at = now;

        inner.rows.insert(principal.id, principal.clone());
        Ok(principal)
    }
}
