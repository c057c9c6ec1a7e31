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
use carehub_core::EntityId;
use carehub_infra::DataAccessError;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz::{authorize_request, with_deadline};
use crate::context::{BearerToken, RequestedOrganization};
use crate::middleware::organization_header;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_patients).post(create_patient))
        .route("/:id", get(get_patient))
}

pub async fn list_patients(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(token): Extension<BearerToken>,
    headers: HeaderMap,
) -> axum::response::Response {
    let requested = RequestedOrganization::default().with_header(organization_header(&headers));
    let exec =
        match authorize_request(&services, &token, Action::LIST, ResourceType::PATIENT, &requested)
            .await
        {
            Ok(exec) => exec,
            Err(res) => return res,
        };

    match with_deadline(services.request_timeout, exec.list_patients()).await {
        Ok(Ok(patients)) => {
            let items = patients.into_iter().map(dto::patient_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Ok(Err(e)) => errors::data_error_to_response(e),
        Err(res) => res,
    }
}

pub async fn create_patient(
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
        ResourceType::PATIENT,
        &requested,
    )
    .await
    {
        Ok(exec) => exec,
        Err(res) => return res,
    };

    let req: dto::CreatePatientRequest = match dto::parse_body(&body) {
        Ok(r) => r,
        Err(res) => return res,
    };

    match with_deadline(services.request_timeout, exec.create_patient(req.into())).await {
        Ok(Ok(patient)) => (StatusCode::CREATED, Json(dto::patient_to_json(patient))).into_response(),
        Ok(Err(e)) => errors::data_error_to_response(e),
        Err(res) => res,
    }
}

pub async fn get_patient(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(token): Extension<BearerToken>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> axum::response::Response {
    let requested = RequestedOrganization::default().with_header(organization_header(&headers));
    let exec =
        match authorize_request(&services, &token, Action::READ, ResourceType::PATIENT, &requested)
            .await
        {
            Ok(exec) => exec,
            Err(res) => return res,
        };

    let Ok(patient_id) = id.parse::<EntityId>() else {
        return errors::data_error_to_response(DataAccessError::NotFound);
    };

    match with_deadline(services.request_timeout, exec.get_patient(patient_id)).await {
        Ok(Ok(patient)) => (StatusCode::OK, Json(dto::patient_to_json(patient))).into_response(),
        Ok(Err(e)) => errors::data_error_to_response(e),
        Err(res) => res,
    }
}
