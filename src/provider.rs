//! Identity-provider seam.
//!
//! The authorization-code exchange and user-info fetch happen outside this
//! crate. Whatever performs them hands back a [`VerifiedProfile`] in
//! exchange for the provider-issued grant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Externally-asserted identity, already verified by the provider.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifiedProfile {
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no identity provider configured")]
    Unconfigured,

    #[error("identity assertion rejected")]
    Rejected,
}

/// Black-box federation capability.
pub trait IdentityProvider: Send + Sync {
    /// Exchange a provider-issued grant for a verified profile.
    fn resolve(&self, grant: &str) -> Result<VerifiedProfile, ProviderError>;
}

/// Placeholder wired at startup until a deployment injects a real
/// federation client. Rejects every grant.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnconfiguredProvider;

impl IdentityProvider for UnconfiguredProvider {
    fn resolve(&self, _grant: &str) -> Result<VerifiedProfile, ProviderError> {
        Err(ProviderError::Unconfigured)
    }
}

/// Provider stub answering every grant with the same profile.
#[cfg(test)]
pub struct StaticProvider(pub VerifiedProfile);

#[cfg(test)]
impl IdentityProvider for StaticProvider {
    fn resolve(&self, _grant: &str) -> Result<VerifiedProfile, ProviderError> {
        Ok(self.0.clone())
    }
}
