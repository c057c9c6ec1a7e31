use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use carehub_auth::AuthzError;
use carehub_infra::DataAccessError;

/// Map an authorization failure to a response.
///
/// Every `Forbidden` reason produces the same body, so a caller cannot tell
/// a missing capability from a cross-tenant attempt or learn whether another
/// organization exists.
pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    match err {
        AuthzError::Unauthenticated(_) => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "unauthenticated")
        }
        AuthzError::Forbidden(_) => forbidden(),
        AuthzError::OrganizationNotFound => {
            json_error(StatusCode::NOT_FOUND, "organization_not_found", "organization not found")
        }
        AuthzError::Unavailable(msg) => {
            tracing::error!(error = %msg, "authorization backend unavailable");
            unavailable()
        }
    }
}

pub fn data_error_to_response(err: DataAccessError) -> axum::response::Response {
    match err {
        DataAccessError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DataAccessError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DataAccessError::NoTenantPartition => json_error(
            StatusCode::BAD_REQUEST,
            "organization_required",
            "this operation needs an organization",
        ),
        DataAccessError::RegistryScopeRequired => json_error(
            StatusCode::BAD_REQUEST,
            "organization_not_allowed",
            "this operation must not name an organization",
        ),
        DataAccessError::OperationNotAuthorized { action, resource } => {
            tracing::error!(%action, %resource, "executor used outside its authorized operation");
            forbidden()
        }
        DataAccessError::Timeout => unavailable(),
        DataAccessError::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "storage error")
        }
    }
}

pub fn forbidden() -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden")
}

pub fn unavailable() -> axum::response::Response {
    json_error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", "service unavailable")
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
