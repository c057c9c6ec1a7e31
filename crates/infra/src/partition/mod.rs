//! Tenant-partition storage.
//!
//! A [`PartitionStore`] runs every operation inside exactly one named
//! partition. It never decides *which* partition: callers outside this crate
//! reach it only through a [`ScopedExecutor`](crate::ScopedExecutor), which
//! takes the partition from an authorization decision.

mod in_memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use carehub_core::{EntityId, PartitionId};

use crate::records::{PatientRecord, UserRecord};
use crate::DataAccessError;

pub use in_memory::InMemoryPartitionStore;
pub use postgres::PgPartitionStore;

#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Create the partition and its tables. Idempotent.
    async fn create_partition(&self, partition: &PartitionId) -> Result<(), DataAccessError>;

    async fn insert_user(
        &self,
        partition: &PartitionId,
        user: UserRecord,
    ) -> Result<(), DataAccessError>;

    async fn list_users(&self, partition: &PartitionId) -> Result<Vec<UserRecord>, DataAccessError>;

    /// Remove a user. `NotFound` if the partition holds no such user.
    async fn delete_user(&self, partition: &PartitionId, id: EntityId) -> Result<(), DataAccessError>;

    async fn insert_patient(
        &self,
        partition: &PartitionId,
        patient: PatientRecord,
    ) -> Result<(), DataAccessError>;

    async fn list_patients(
        &self,
        partition: &PartitionId,
    ) -> Result<Vec<PatientRecord>, DataAccessError>;

    async fn get_patient(
        &self,
        partition: &PartitionId,
        id: EntityId,
    ) -> Result<Option<PatientRecord>, DataAccessError>;
}

#[async_trait]
impl<S> PartitionStore for Arc<S>
where
    S: PartitionStore + ?Sized,
{
    async fn create_partition(&self, partition: &PartitionId) -> Result<(), DataAccessError> {
        (**self).create_partition(partition).await
    }

    async fn insert_user(
        &self,
        partition: &PartitionId,
        user: UserRecord,
    ) -> Result<(), DataAccessError> {
        (**self).insert_user(partition, user).await
    }

    async fn list_users(&self, partition: &PartitionId) -> Result<Vec<UserRecord>, DataAccessError> {
        (**self).list_users(partition).await
    }

    async fn delete_user(&self, partition: &PartitionId, id: EntityId) -> Result<(), DataAccessError> {
        (**self).delete_user(partition, id).await
    }

    async fn insert_patient(
        &self,
        partition: &PartitionId,
        patient: PatientRecord,
    ) -> Result<(), DataAccessError> {
        (**self).insert_patient(partition, patient).await
    }

    async fn list_patients(
        &self,
        partition: &PartitionId,
    ) -> Result<Vec<PatientRecord>, DataAccessError> {
        (**self).list_patients(partition).await
    }

    async fn get_patient(
        &self,
        partition: &PartitionId,
        id: EntityId,
    ) -> Result<Option<PatientRecord>, DataAccessError> {
        (**self).get_patient(partition, id).await
    }
}
