//! Request bodies and JSON mapping helpers.

use axum::body::Bytes;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use carehub_auth::Role;
use carehub_core::Organization;
use carehub_infra::{NewPatient, NewUser, PatientRecord, UserRecord};

use crate::app::errors;

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

impl From<CreateUserRequest> for NewUser {
    fn from(value: CreateUserRequest) -> Self {
        NewUser {
            email: value.email,
            display_name: value.display_name,
            role: value.role,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePatientRequest {
    pub full_name: String,
    #[serde(default)]
    pub date_of_birth: Option<chrono::NaiveDate>,
}

impl From<CreatePatientRequest> for NewPatient {
    fn from(value: CreatePatientRequest) -> Self {
        NewPatient {
            full_name: value.full_name,
            date_of_birth: value.date_of_birth,
        }
    }
}

/// `organization_id` field of a JSON body, read leniently.
///
/// Bodies are only parsed strictly after authorization, so a malformed body
/// from an unauthenticated caller still gets 401. A non-string id is passed
/// on verbatim and fails scope resolution like any other bad id.
pub fn body_organization(body: &Bytes) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("organization_id")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, axum::response::Response> {
    serde_json::from_slice(body).map_err(|e| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.to_string())
    })
}

pub fn organization_to_json(org: Organization) -> Value {
    json!({
        "id": org.id.to_string(),
        "name": org.name,
        "created_at": org.created_at,
    })
}

pub fn user_to_json(user: UserRecord) -> Value {
    json!({
        "id": user.id.to_string(),
        "email": user.email,
        "display_name": user.display_name,
        "role": user.role.as_str(),
        "created_at": user.created_at,
    })
}

pub fn patient_to_json(patient: PatientRecord) -> Value {
    json!({
        "id": patient.id.to_string(),
        "full_name": patient.full_name,
        "date_of_birth": patient.date_of_birth,
        "created_at": patient.created_at,
    })
}
