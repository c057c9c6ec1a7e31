use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use carehub_core::{EntityId, PartitionId};

use super::PartitionStore;
use crate::records::{PatientRecord, UserRecord};
use crate::DataAccessError;

#[derive(Debug, Default, Clone)]
struct Partition {
    users: Vec<UserRecord>,
    patients: Vec<PatientRecord>,
}

/// In-memory partitioned store for tests/dev.
///
/// Each partition is a separate map entry; an operation against a partition
/// that was never created fails the way a missing schema would.
#[derive(Debug, Default)]
pub struct InMemoryPartitionStore {
    inner: RwLock<HashMap<PartitionId, Partition>>,
}

impl InMemoryPartitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition_count(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    fn read<T>(
        &self,
        partition: &PartitionId,
        f: impl FnOnce(&Partition) -> T,
    ) -> Result<T, DataAccessError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let p = map.get(partition).ok_or_else(|| missing(partition))?;
        Ok(f(p))
    }

    fn write<T>(
        &self,
        partition: &PartitionId,
        f: impl FnOnce(&mut Partition) -> Result<T, DataAccessError>,
    ) -> Result<T, DataAccessError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let p = map.get_mut(partition).ok_or_else(|| missing(partition))?;
        f(p)
    }
}

fn poisoned() -> DataAccessError {
    DataAccessError::Storage("partition store lock poisoned".to_string())
}

fn missing(partition: &PartitionId) -> DataAccessError {
    DataAccessError::Storage(format!("partition {} does not exist", partition))
}

#[async_trait]
impl PartitionStore for InMemoryPartitionStore {
    async fn create_partition(&self, partition: &PartitionId) -> Result<(), DataAccessError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.entry(partition.clone()).or_default();
        Ok(())
    }

    async fn insert_user(
        &self,
        partition: &PartitionId,
        user: UserRecord,
    ) -> Result<(), DataAccessError> {
        self.write(partition, |p| {
            // Mirrors the UNIQUE constraint on users.email.
            if p.users.iter().any(|u| u.id == user.id || u.email == user.email) {
                return Err(DataAccessError::Conflict(format!(
                    "user {} already exists",
                    user.email
                )));
            }
            p.users.push(user);
            Ok(())
        })
    }

    async fn list_users(&self, partition: &PartitionId) -> Result<Vec<UserRecord>, DataAccessError> {
        self.read(partition, |p| p.users.clone())
    }

    async fn delete_user(&self, partition: &PartitionId, id: EntityId) -> Result<(), DataAccessError> {
        self.write(partition, |p| {
            let before = p.users.len();
            p.users.retain(|u| u.id != id);
            if p.users.len() == before {
                return Err(DataAccessError::NotFound);
            }
            Ok(())
        })
    }

    async fn insert_patient(
        &self,
        partition: &PartitionId,
        patient: PatientRecord,
    ) -> Result<(), DataAccessError> {
        self.write(partition, |p| {
            if p.patients.iter().any(|x| x.id == patient.id) {
                return Err(DataAccessError::Conflict(format!(
                    "patient {} already exists",
                    patient.id
                )));
            }
            p.patients.push(patient);
            Ok(())
        })
    }

    async fn list_patients(
        &self,
        partition: &PartitionId,
    ) -> Result<Vec<PatientRecord>, DataAccessError> {
        self.read(partition, |p| p.patients.clone())
    }

    async fn get_patient(
        &self,
        partition: &PartitionId,
        id: EntityId,
    ) -> Result<Option<PatientRecord>, DataAccessError> {
        self.read(partition, |p| p.patients.iter().find(|x| x.id == id).cloned())
    }
}
