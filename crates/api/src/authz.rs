//! Request-side entry to the authorization gate.
//!
//! Handlers call [`authorize_request`] before touching storage and get back
//! either a scoped executor or the denial response.

use std::future::Future;
use std::time::Duration;

use carehub_auth::{Action, AuthzError, DenialReason, Principal, ResourceType};
use carehub_infra::ScopedExecutor;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::{BearerToken, RequestedOrganization};

/// Run `fut` under the request deadline; on expiry the future is dropped.
pub async fn with_deadline<T>(
    deadline: Duration,
    fut: impl Future<Output = T>,
) -> Result<T, axum::response::Response> {
    tokio::time::timeout(deadline, fut).await.map_err(|_| {
        tracing::warn!(deadline_ms = deadline.as_millis() as u64, "request deadline exceeded");
        errors::unavailable()
    })
}

/// Verify, check policy, resolve scope, and bind an executor.
///
/// If the request names conflicting organizations it is still
/// authenticated first, so an anonymous caller gets 401 rather than 403.
pub async fn authorize_request(
    services: &AppServices,
    token: &BearerToken,
    action: Action,
    resource: ResourceType,
    requested: &RequestedOrganization,
) -> Result<ScopedExecutor, axum::response::Response> {
    let requested_org = match requested.resolve() {
        Ok(org) => org,
        Err(_) => {
            let principal = services
                .gate
                .authenticate(token.as_deref())
                .map_err(errors::authz_error_to_response)?;
            tracing::info!(
                principal_id = %principal.principal_id,
                role = %principal.role,
                "denied: conflicting organization in request"
            );
            return Err(errors::authz_error_to_response(AuthzError::Forbidden(
                DenialReason::AmbiguousOrganization,
            )));
        }
    };

    let decision = with_deadline(
        services.request_timeout,
        services
            .gate
            .authorize(token.as_deref(), &action, &resource, requested_org),
    )
    .await?;

    let ctx = decision.map_err(errors::authz_error_to_response)?;
    Ok(services.data.with_scope(&ctx))
}

/// Verify the credential only (identity endpoints).
pub fn authenticate_request(
    services: &AppServices,
    token: &BearerToken,
) -> Result<Principal, axum::response::Response> {
    services
        .gate
        .authenticate(token.as_deref())
        .map_err(errors::authz_error_to_response)
}
