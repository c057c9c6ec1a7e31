use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::services::AppServices;
use crate::authz;
use crate::context::BearerToken;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Identity as seen by the verifier. No policy or scope check.
pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(token): Extension<BearerToken>,
) -> axum::response::Response {
    let principal = match authz::authenticate_request(&services, &token) {
        Ok(p) => p,
        Err(res) => return res,
    };

    Json(serde_json::json!({
        "principal_id": principal.principal_id.to_string(),
        "role": principal.role.as_str(),
        "organization_id": principal.home_organization.map(|id| id.to_string()),
        "org_scope": principal.scope_override.map(|id| id.to_string()),
    }))
    .into_response()
}
