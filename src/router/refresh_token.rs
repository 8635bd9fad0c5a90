//! Get a new access token with a refresh token.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::refresh;
use crate::router::Valid;
use crate::{AppState, ServerError};

pub const TOKEN_TYPE: &str = "Bearer";

fn validate_grant_type(grant_type: &str) -> Result<(), ValidationError> {
    // As specified on OAuth2.0 spec, reject if grant_type is not valid.
    if grant_type != "refresh_token" {
        return Err(ValidationError::new("invalid_grant_type"));
    }

    Ok(())
}

fn invalid_refresh_token() -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        "refresh_token",
        ValidationError::new("refresh_token")
            .with_message("Invalid refresh token.".into()),
    );
    errors
}

#[derive(Debug, Validate, Serialize, Deserialize)]
pub struct Body {
    #[validate(length(min = 1, message = "Missing refresh token."))]
    pub refresh_token: String,
    #[validate(custom(
        function = "validate_grant_type",
        message = "\"grant_type\" must be \"refresh_token\"."
    ))]
    pub grant_type: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub token_type: String,
    pub token: String,
    pub expires_in: u64,
}

pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>, ServerError> {
    let policy = state.config.policy();

    let token = refresh::exchange(
        &state.token,
        state.ledger.as_ref(),
        state.principals.as_ref(),
        chrono::Duration::seconds(policy.exchange_ttl as i64),
        &body.refresh_token,
    )
    .map_err(|err| match err {
        // infrastructure failures are server faults, not token rejections.
        refresh::ExchangeError::Store(err) => ServerError::Store(err),
        refresh::ExchangeError::Mint(err) => ServerError::Token(err),
        rejection => {
            // rejection stays uniform toward the caller; the cause is only
            // visible in server logs.
            tracing::debug!(reason = %rejection, "refresh exchange rejected");
            ServerError::Validation(invalid_refresh_token())
        },
    })?;

    Ok(Json(Response {
        token_type: TOKEN_TYPE.to_owned(),
        token,
        expires_in: policy.exchange_ttl,
    }))
}
