//! Infrastructure layer: configuration, policy loading, the organization
//! registry and schema-qualified tenant storage.

pub mod config;
pub mod error;
pub mod partition;
pub mod policy_source;
pub mod records;
pub mod registry;
pub mod scoped;


pub use config::{AppConfig, ConfigError};
pub use error::DataAccessError;
pub use partition::{InMemoryPartitionStore, PartitionStore, PgPartitionStore};
pub use policy_source::{PolicyLoadError, load_policy, policy_from_json};
pub use records::{NewPatient, NewUser, PatientRecord, UserRecord};
pub use registry::{InMemoryOrganizationRegistry, OrganizationRegistry, PgOrganizationRegistry};
pub use scoped::{DataAccess, ScopedExecutor};
