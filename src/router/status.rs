//! Instance status route.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub name: String,
    pub url: String,
    pub version: String,
}

pub async fn handler(State(state): State<AppState>) -> Json<Response> {
    Json(Response {
        name: state.config.name.clone(),
        url: state.config.url.clone(),
        version: VERSION.to_owned(),
    })
}
