//! `carehub-core`: shared identifiers and the domain error model.
//!
//! This crate contains **pure** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod organization;
pub mod partition;

pub use error::DomainError;
pub use id::{EntityId, OrganizationId};
pub use organization::Organization;
pub use partition::PartitionId;
