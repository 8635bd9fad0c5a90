//! Principal model and federated reconciliation.

mod store;

pub use store::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::provider::VerifiedProfile;

/// Account as reconciled from federated logins.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Assigned by the store on first insert, immutable afterwards.
    pub id: i64,
    /// Unique natural key for federated reconciliation.
    pub email: String,
    /// Follows the provider-asserted name on every login.
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    /// Build a principal not yet persisted. The store assigns its id.
    pub fn new(email: &str, display_name: &str) -> Self {
        Self {
            email: email.to_owned(),
            display_name: display_name.to_owned(),
            ..Default::default()
        }
    }
}

/// Find-update-or-create on the federated natural key.
///
/// An existing principal keeps its id and email; only the display name
/// follows the provider. Runs on every successful federated login, so
/// repeated calls for the same profile re-upsert the same row.
pub fn reconcile(
    store: &dyn PrincipalStore,
    profile: &VerifiedProfile,
) -> Result<Principal, StoreError> {
    let principal = match store.find_by_email(&profile.email)? {
        Some(mut principal) => {
            principal.display_name = profile.display_name.clone();
            principal
        },
        None => Principal::new(&profile.email, &profile.display_name),
    };

    store.upsert(principal)
}
