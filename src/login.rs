//! Federated-login bootstrap.

use chrono::Duration;

use crate::config::TokenPolicy;
use crate::error::Result;
use crate::ledger::RefreshTokenLedger;
use crate::principal::{self, PrincipalStore};
use crate::provider::VerifiedProfile;
use crate::token::TokenManager;

/// Outcome of a successful bootstrap.
#[derive(Clone, Debug)]
pub struct Login {
    pub access_token: String,
    pub refresh_token: String,
    pub principal_id: i64,
}

/// Convert a verified federated identity into first-party tokens.
///
/// Exactly one principal write and one ledger upsert per invocation; the
/// upsert is the rotation point keeping at most one live refresh token per
/// principal. Safe to repeat for the same profile under provider retries:
/// last writer wins, no rows accumulate.
pub fn bootstrap(
    tokens: &TokenManager,
    principals: &dyn PrincipalStore,
    ledger: &dyn RefreshTokenLedger,
    policy: TokenPolicy,
    profile: &VerifiedProfile,
) -> Result<Login> {
    let principal = principal::reconcile(principals, profile)?;

    let refresh_token =
        tokens.create(&principal, Duration::seconds(policy.refresh_ttl as i64))?;
    ledger.upsert(principal.id, &refresh_token)?;

    let access_token =
        tokens.create(&principal, Duration::seconds(policy.access_ttl as i64))?;

    tracing::info!(principal_id = principal.id, "federated login completed");

    Ok(Login {
        access_token,
        refresh_token,
        principal_id: principal.id,
    })
}
