use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};

use carehub_auth::{Action, ResourceType};
use carehub_core::EntityId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::{authorize_request, with_deadline};
use crate::context::{BearerToken, RequestedOrganization};
use crate::middleware::organization_header;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", delete(delete_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(token): Extension<BearerToken>,
    headers: HeaderMap,
) -> axum::response::Response {
    let requested = RequestedOrganization::default().with_header(organization_header(&headers));
    let exec = match authorize_request(&services, &token, Action::LIST, ResourceType::USER, &requested)
        .await
    {
        Ok(exec) => exec,
        Err(res) => return res,
    };

    match with_deadline(services.request_timeout, exec.list_users()).await {
        Ok(Ok(users)) => {
            let items = users.into_iter().map(dto::user_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Ok(Err(e)) => errors::data_error_to_response(e),
        Err(res) => res,
    }
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(token): Extension<BearerToken>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let requested = RequestedOrganization::default()
        .with_header(organization_header(&headers))
        .with_body(dto::body_organization(&body));
    let exec =
        match authorize_request(&services, &token, Action::CREATE, ResourceType::USER, &requested)
            .await
        {
            Ok(exec) => exec,
            Err(res) => return res,
        };

    let req: dto::CreateUserRequest = match dto::parse_body(&body) {
        Ok(r) => r,
        Err(res) => return res,
    };

    match with_deadline(services.request_timeout, exec.create_user(req.into())).await {
        Ok(Ok(user)) => (StatusCode::CREATED, Json(dto::user_to_json(user))).into_response(),
        Ok(Err(e)) => errors::data_error_to_response(e),
        Err(res) => res,
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(token): Extension<BearerToken>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> axum::response::Response {
    let requested = RequestedOrganization::default().with_header(organization_header(&headers));
    let exec =
        match authorize_request(&services, &token, Action::DELETE, ResourceType::USER, &requested)
            .await
        {
            Ok(exec) => exec,
            Err(res) => return res,
        };

    // Unparseable ids cannot name a row, so they read as "not found".
    let Ok(user_id) = id.parse::<EntityId>() else {
        return errors::data_error_to_response(carehub_infra::DataAccessError::NotFound);
    };

    match with_deadline(services.request_timeout, exec.delete_user(user_id)).await {
        Ok(Ok(())) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(e)) => errors::data_error_to_response(e),
        Err(res) => res,
    }
}
