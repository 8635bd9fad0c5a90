//! Refresh-token ledger.
//!
//! Single source of truth mapping a principal to its one currently-valid
//! refresh token. Upserting for a principal that already has a row
//! overwrites the token value; that overwrite is the rotation point making
//! the prior value unusable for exchange.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Ledger row: at most one per principal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub principal_id: i64,
    pub token_value: String,
    pub updated_at: DateTime<Utc>,
}

/// Collaborator contract for refresh-token persistence.
///
/// No delete path exists; the core never revokes ledger rows.
pub trait RefreshTokenLedger: Send + Sync {
    fn find_by_principal_id(
        &self,
        principal_id: i64,
    ) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Lookup by the currently stored value only. A rotated-away value
    /// never matches.
    fn find_by_token_value(
        &self,
        token_value: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Insert if absent, else overwrite `token_value` on the existing row
    /// keyed by `principal_id`. Last writer wins under concurrent logins.
    fn upsert(
        &self,
        principal_id: i64,
        token_value: &str,
    ) -> Result<RefreshTokenRecord, StoreError>;
}

/// Map-backed [`RefreshTokenLedger`], keyed by principal id.
#[derive(Debug, Default)]
pub struct MemoryRefreshTokenLedger {
    rows: Mutex<HashMap<i64, RefreshTokenRecord>>,
}

impl RefreshTokenLedger for MemoryRefreshTokenLedger {
    fn find_by_principal_id(
        &self,
        principal_id: i64,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let rows = self.rows.lock().map_err(|_| StoreError::Poisoned)?;

        Ok(rows.get(&principal_id).cloned())
    }

    fn find_by_token_value(
        &self,
        token_value: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let rows = self.rows.lock().map_err(|_| StoreError::Poisoned)?;

        Ok(rows.values().find(|r| r.token_value == token_value).cloned())
    }

    fn upsert(
        &self,
        principal_id: i64,
        token_value: &str,
    ) -> Result<RefreshTokenRecord, StoreError> {
        let mut rows = self.rows.lock().map_err(|_| StoreError::Poisoned)?;

        let record = RefreshTokenRecord {
            principal_id,
            token_value: token_value.to_owned(),
            updated_at: Utc::now(),
        };
        rows.insert(principal_id, record.clone());

        Ok(record)
    }
}
