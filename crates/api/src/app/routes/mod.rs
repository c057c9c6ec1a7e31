use axum::{routing::get, Router};

pub mod organizations;
pub mod patients;
pub mod system;
pub mod users;

/// Router for all endpoints that go through the authorization gate.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/organizations", organizations::router())
        .nest("/users", users::router())
        .nest("/patients", patients::router())
}
