//! Exchange a refresh token for a new access token.

use chrono::Duration;
use thiserror::Error;

use crate::error::StoreError;
use crate::ledger::RefreshTokenLedger;
use crate::principal::PrincipalStore;
use crate::token::TokenManager;

/// Why an exchange was refused.
///
/// The HTTP boundary collapses the three token rejections to the same
/// answer, with the distinction kept for server-side logs only. `Store`
/// and `Mint` are infrastructure failures and surface as server faults.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Malformed, tampered or expired refresh token.
    #[error("invalid refresh token")]
    InvalidToken,

    /// Valid signature but no ledger row holds this value: rotated away or
    /// never issued.
    #[error("unknown refresh token")]
    UnknownToken,

    /// Ledger row points to a principal that no longer exists.
    #[error("unknown principal")]
    UnknownPrincipal,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("token minting failed")]
    Mint(#[from] jsonwebtoken::errors::Error),
}

/// Mint a new short-lived access token against a stored refresh token.
///
/// Never re-issues or rotates the refresh token itself; rotation happens
/// only during login bootstrap, so the same refresh token keeps working
/// until rotated or expired.
pub fn exchange(
    tokens: &TokenManager,
    ledger: &dyn RefreshTokenLedger,
    principals: &dyn PrincipalStore,
    lifetime: Duration,
    refresh_token: &str,
) -> Result<String, ExchangeError> {
    if !tokens.validate(refresh_token) {
        return Err(ExchangeError::InvalidToken);
    }

    let record = ledger
        .find_by_token_value(refresh_token)?
        .ok_or(ExchangeError::UnknownToken)?;

    let principal = principals
        .find_by_id(record.principal_id)?
        .ok_or(ExchangeError::UnknownPrincipal)?;

    Ok(tokens.create(&principal, lifetime)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenPolicy;
    use crate::ledger::MemoryRefreshTokenLedger;
    use crate::login;
    use crate::principal::{MemoryPrincipalStore, Principal};
    use crate::provider::VerifiedProfile;

    fn exchange_ttl() -> Duration {
        Duration::hours(2)
    }

    fn policy() -> TokenPolicy {
        crate::config::Configuration::default().policy()
    }

    fn setup() -> (TokenManager, MemoryPrincipalStore, MemoryRefreshTokenLedger) {
        (
            TokenManager::new("https://auth.test/", "secret"),
            MemoryPrincipalStore::default(),
            MemoryRefreshTokenLedger::default(),
        )
    }

    fn profile() -> VerifiedProfile {
        VerifiedProfile {
            email: "a@x.com".into(),
            display_name: "Alice".into(),
        }
    }

    #[test]
    fn exchange_mints_fresh_access_token() {
        let (tokens, principals, ledger) = setup();
        let login =
            login::bootstrap(&tokens, &principals, &ledger, policy(), &profile())
                .unwrap();

        let access = exchange(
            &tokens,
            &ledger,
            &principals,
            exchange_ttl(),
            &login.refresh_token,
        )
        .unwrap();

        assert_ne!(access, login.access_token);
        assert_eq!(tokens.decode(&access).unwrap().sub, "a@x.com");

        // exchange does not invalidate the refresh token.
        assert!(
            exchange(
                &tokens,
                &ledger,
                &principals,
                exchange_ttl(),
                &login.refresh_token,
            )
            .is_ok()
        );
    }

    #[test]
    fn garbage_is_rejected_as_invalid() {
        let (tokens, principals, ledger) = setup();

        let err = exchange(&tokens, &ledger, &principals, exchange_ttl(), "garbage")
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidToken));
    }

    #[test]
    fn rotated_away_token_is_rejected_as_unknown() {
        let (tokens, principals, ledger) = setup();

        let first =
            login::bootstrap(&tokens, &principals, &ledger, policy(), &profile())
                .unwrap();
        // second login rotates the ledger row.
        login::bootstrap(&tokens, &principals, &ledger, policy(), &profile())
            .unwrap();

        let err = exchange(
            &tokens,
            &ledger,
            &principals,
            exchange_ttl(),
            &first.refresh_token,
        )
        .unwrap_err();
        assert!(matches!(err, ExchangeError::UnknownToken));
    }

    #[test]
    fn orphaned_ledger_row_is_rejected_as_unknown_principal() {
        let (tokens, principals, ledger) = setup();

        // ledger row pointing at a principal the store never held.
        let ghost = Principal {
            id: 99,
            email: "ghost@x.com".into(),
            display_name: "Ghost".into(),
            ..Default::default()
        };
        let refresh_token = tokens.create(&ghost, Duration::days(14)).unwrap();
        ledger.upsert(ghost.id, &refresh_token).unwrap();

        let err = exchange(&tokens, &ledger, &principals, exchange_ttl(), &refresh_token)
            .unwrap_err();
        assert!(matches!(err, ExchangeError::UnknownPrincipal));
    }

    #[test]
    fn expired_refresh_token_is_rejected_as_invalid() {
        let (tokens, principals, ledger) = setup();
        let principal = principals
            .upsert(Principal::new("a@x.com", "Alice"))
            .unwrap();

        let stale = tokens.create(&principal, Duration::seconds(-60)).unwrap();
        ledger.upsert(principal.id, &stale).unwrap();

        let err = exchange(&tokens, &ledger, &principals, exchange_ttl(), &stale)
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidToken));
    }
}
