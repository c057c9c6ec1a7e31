use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use carehub_auth::{Action, ResourceType};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::{authorize_request, with_deadline};
use crate::context::{BearerToken, RequestedOrganization};
use crate::middleware::organization_header;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_organizations).post(create_organization))
        .route("/:id", get(get_organization).delete(delete_organization))
}

pub async fn list_organizations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(token): Extension<BearerToken>,
    headers: HeaderMap,
) -> axum::response::Response {
    let requested = RequestedOrganization::default().with_header(organization_header(&headers));
    let exec = match authorize_request(
        &services,
        &token,
        Action::LIST,
        ResourceType::ORGANIZATION,
        &requested,
    )
    .await
    {
        Ok(exec) => exec,
        Err(res) => return res,
    };

    match with_deadline(services.request_timeout, exec.list_organizations()).await {
        Ok(Ok(orgs)) => {
            let items = orgs.into_iter().map(dto::organization_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Ok(Err(e)) => errors::data_error_to_response(e),
        Err(res) => res,
    }
}

pub async fn create_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(token): Extension<BearerToken>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let requested = RequestedOrganization::default()
        .with_header(organization_header(&headers))
        .with_body(dto::body_organization(&body));
    let exec = match authorize_request(
        &services,
        &token,
        Action::CREATE,
        ResourceType::ORGANIZATION,
        &requested,
    )
    .await
    {
        Ok(exec) => exec,
        Err(res) => return res,
    };

    let req: dto::CreateOrganizationRequest = match dto::parse_body(&body) {
        Ok(r) => r,
        Err(res) => return res,
    };

    match with_deadline(services.request_timeout, exec.provision_organization(req.name)).await {
        Ok(Ok(org)) => (StatusCode::CREATED, Json(dto::organization_to_json(org))).into_response(),
        Ok(Err(e)) => errors::data_error_to_response(e),
        Err(res) => res,
    }
}

pub async fn get_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(token): Extension<BearerToken>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> axum::response::Response {
    let requested = RequestedOrganization::from_path(id).with_header(organization_header(&headers));
    let exec = match authorize_request(
        &services,
        &token,
        Action::READ,
        ResourceType::ORGANIZATION,
        &requested,
    )
    .await
    {
        Ok(exec) => exec,
        Err(res) => return res,
    };

    match with_deadline(services.request_timeout, exec.organization()).await {
        Ok(Ok(org)) => (StatusCode::OK, Json(dto::organization_to_json(org))).into_response(),
        Ok(Err(e)) => errors::data_error_to_response(e),
        Err(res) => res,
    }
}

pub async fn delete_organization(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(token): Extension<BearerToken>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> axum::response::Response {
    let requested = RequestedOrganization::from_path(id).with_header(organization_header(&headers));
    let exec = match authorize_request(
        &services,
        &token,
        Action::DELETE,
        ResourceType::ORGANIZATION,
        &requested,
    )
    .await
    {
        Ok(exec) => exec,
        Err(res) => return res,
    };

    match with_deadline(services.request_timeout, exec.soft_delete_organization()).await {
        Ok(Ok(_)) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(e)) => errors::data_error_to_response(e),
        Err(res) => res,
    }
}
