//! HTTP API: bearer extraction, route → (action, resource) mapping, and
//! translation of authorization and storage outcomes into responses.

pub mod app;
pub mod authz;
pub mod context;
pub mod middleware;
