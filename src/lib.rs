//! authd is a stateless authentication core: signed bearer tokens,
//! federated-login bootstrap and refresh-token rotation.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod ledger;
pub mod login;
pub mod middleware;
pub mod principal;
pub mod provider;
pub mod refresh;
mod router;
pub mod token;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::{get, post};
use axum::{Router, middleware as AxumMiddleware};
pub use error::ServerError;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// Blank state backed by in-memory stores, for handler tests.
#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    let mut config = config::Configuration::default();
    config.name = "authd".to_owned();
    config.url = "https://auth.test/".to_owned();
    let config = Arc::new(config);

    AppState {
        token: token::TokenManager::new(&config.url, "test-signing-secret"),
        config,
        principals: Arc::new(principal::MemoryPrincipalStore::default()),
        ledger: Arc::new(ledger::MemoryRefreshTokenLedger::default()),
        provider: Arc::new(provider::UnconfiguredProvider),
    }
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub token: token::TokenManager,
    pub principals: Arc<dyn principal::PrincipalStore>,
    pub ledger: Arc<dyn ledger::RefreshTokenLedger>,
    pub provider: Arc<dyn provider::IdentityProvider>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let stack = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::handler))
        // `GET /login/callback` finishes a federated login.
        .route("/login/callback", get(router::login::handler))
        // `POST /oauth/token` exchanges a refresh token.
        .route("/oauth/token", post(router::refresh_token::handler))
        // `GET /users/@me` introspects the caller identity.
        .route("/users/@me", get(router::me::handler))
        // Establish caller identity on every request; never rejects.
        .route_layer(AxumMiddleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ))
        .with_state(state)
        .layer(stack)
}

/// Initialize the application state.
pub fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>> {
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;

    let Some(secret) = config.secret() else {
        tracing::error!(
            "missing signing secret: set `token.secret` on `config.yaml` or the `SECRET` environnement variable"
        );
        std::process::exit(0);
    };

    // handle jwt.
    let token = token::TokenManager::new(&config.url, &secret);

    // federation is a collaborator: deployments swap in a real client.
    tracing::warn!("no identity provider wired; federated login rejects every grant");

    Ok(AppState {
        config,
        token,
        principals: Arc::new(principal::MemoryPrincipalStore::default()),
        ledger: Arc::new(ledger::MemoryRefreshTokenLedger::default()),
        provider: Arc::new(provider::UnconfiguredProvider),
    })
}
