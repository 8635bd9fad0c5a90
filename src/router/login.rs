//! Federated-login callback.
//!
//! The identity provider redirects here with a grant. The provider seam
//! turns the grant into a verified profile and the bootstrap flow answers
//! with a `refresh_token` cookie plus a redirect carrying the access token.

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::AppState;
use crate::error::Result;
use crate::login;

pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

#[derive(Debug, Deserialize)]
pub struct Params {
    /// Provider-issued grant (authorization code).
    pub code: String,
}

pub async fn handler(
    State(state): State<AppState>,
    Query(params): Query<Params>,
) -> Result<Response> {
    let profile = state.provider.resolve(&params.code)?;

    let policy = state.config.policy();
    let login = login::bootstrap(
        &state.token,
        state.principals.as_ref(),
        state.ledger.as_ref(),
        policy,
        &profile,
    )?;

    // side channel for the refresh token: path-root cookie whose max-age
    // matches the token's own expiry.
    let cookie = format!(
        "{REFRESH_TOKEN_COOKIE}={}; Path=/; Max-Age={}; HttpOnly",
        login.refresh_token, policy.refresh_ttl,
    );
    let target = format!(
        "{}?token={}",
        state.config.redirect_path(),
        login.access_token
    );

    Ok((
        StatusCode::FOUND,
        [(header::SET_COOKIE, cookie), (header::LOCATION, target)],
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode, header};
    use http_body_util::BodyExt;

    use super::REFRESH_TOKEN_COOKIE;
    use crate::provider::{StaticProvider, UnconfiguredProvider, VerifiedProfile};
    use crate::router::refresh_token::TOKEN_TYPE;
    use crate::*;

    fn state_with_provider() -> AppState {
        AppState {
            provider: Arc::new(StaticProvider(VerifiedProfile {
                email: "a@x.com".into(),
                display_name: "Alice".into(),
            })),
            ..test_state()
        }
    }

    #[tokio::test]
    async fn callback_sets_cookie_and_redirects() {
        let state = state_with_provider();
        let app = app(state.clone());

        let response = make_request(
            app,
            Method::GET,
            "/login/callback?code=grant",
            None,
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FOUND);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .unwrap();
        assert!(cookie.starts_with("refresh_token="));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains(&format!(
            "Max-Age={}",
            state.config.policy().refresh_ttl
        )));

        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|h| h.to_str().ok())
            .unwrap();
        let access_token = location.split_once("?token=").unwrap().1;
        assert!(location.starts_with("/articles"));
        assert!(state.token.validate(access_token));
        assert_eq!(state.token.decode(access_token).unwrap().sub, "a@x.com");
    }

    #[tokio::test]
    async fn issued_refresh_token_is_exchangeable() {
        let state = state_with_provider();

        let response = make_request(
            app(state.clone()),
            Method::GET,
            "/login/callback?code=grant",
            None,
            String::default(),
        )
        .await;

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .unwrap();
        let refresh_token = cookie
            .split(';')
            .next()
            .and_then(|pair| pair.strip_prefix(&format!("{REFRESH_TOKEN_COOKIE}=")))
            .unwrap();

        let body = serde_json::json!({
            "refresh_token": refresh_token,
            "grant_type": "refresh_token",
        });
        let response = make_request(
            app(state.clone()),
            Method::POST,
            "/oauth/token",
            None,
            body.to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: router::refresh_token::Response =
            serde_json::from_slice(&body).unwrap();
        assert_eq!(body.token_type, TOKEN_TYPE);
        assert!(state.token.validate(&body.token));
    }

    #[tokio::test]
    async fn unconfigured_provider_rejects_grant() {
        let state = AppState {
            provider: Arc::new(UnconfiguredProvider),
            ..test_state()
        };
        let app = app(state);

        let response = make_request(
            app,
            Method::GET,
            "/login/callback?code=grant",
            None,
            String::default(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
