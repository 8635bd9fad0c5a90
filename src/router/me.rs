//! Authenticated-identity introspection.

use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::ServerError;
use crate::middleware::Identity;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: i64,
    pub subject: String,
}

/// Return the caller identity carried by the bearer token.
///
/// Authorization decision for this route: anonymous callers are refused.
pub async fn handler(
    Extension(identity): Extension<Identity>,
) -> Result<Json<Response>, ServerError> {
    match identity {
        Identity::Authenticated {
            principal_id,
            subject,
        } => Ok(Json(Response {
            id: principal_id,
            subject,
        })),
        Identity::Anonymous => Err(ServerError::Unauthorized),
    }
}
