//! Postgres-backed partition store: one schema per organization.
//!
//! Every operation runs in its own transaction that first pins
//! `search_path` to the target schema with `SET LOCAL`, so the setting dies
//! with the transaction and cannot leak to the next user of the pooled
//! connection. Table names are additionally schema-qualified with the same
//! quoted identifier.
//!
//! Schema names are only ever interpolated from a validated [`PartitionId`];
//! all values go through bind parameters.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{instrument, Span};
use uuid::Uuid;

use carehub_auth::Role;
use carehub_core::{EntityId, PartitionId};

use super::PartitionStore;
use crate::error::map_sqlx_error;
use crate::records::{PatientRecord, UserRecord};
use crate::DataAccessError;

#[derive(Debug, Clone)]
pub struct PgPartitionStore {
    pool: Arc<PgPool>,
}

impl PgPartitionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a transaction pinned to `partition`.
    async fn begin_in(
        &self,
        partition: &PartitionId,
        operation: &str,
    ) -> Result<Transaction<'static, Postgres>, DataAccessError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        let set_path = format!("SET LOCAL search_path TO {}", partition.quoted());
        sqlx::query(&set_path)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        Ok(tx)
    }
}

fn decode_err(what: &str) -> impl Fn(sqlx::Error) -> DataAccessError + '_ {
    move |e| DataAccessError::Storage(format!("failed to decode {} row: {}", what, e))
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, DataAccessError> {
    let decode = decode_err("user");
    let id: Uuid = row.try_get("id").map_err(&decode)?;
    let role: String = row.try_get("role").map_err(&decode)?;
    let role = role
        .parse::<Role>()
        .map_err(|e| DataAccessError::Storage(format!("user {}: {}", id, e)))?;

    Ok(UserRecord {
        id: EntityId::from_uuid(id),
        email: row.try_get("email").map_err(&decode)?,
        display_name: row.try_get("display_name").map_err(&decode)?,
        role,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(&decode)?,
    })
}

fn patient_from_row(row: &PgRow) -> Result<PatientRecord, DataAccessError> {
    let decode = decode_err("patient");
    let id: Uuid = row.try_get("id").map_err(&decode)?;

    Ok(PatientRecord {
        id: EntityId::from_uuid(id),
        full_name: row.try_get("full_name").map_err(&decode)?,
        date_of_birth: row.try_get::<Option<NaiveDate>, _>("date_of_birth").map_err(&decode)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(&decode)?,
    })
}

#[async_trait]
impl PartitionStore for PgPartitionStore {
    #[instrument(skip(self), fields(partition = %partition), err)]
    async fn create_partition(&self, partition: &PartitionId) -> Result<(), DataAccessError> {
        let schema = partition.quoted();
        let statements = [
            format!("CREATE SCHEMA IF NOT EXISTS {schema}"),
            format!(
                "CREATE TABLE IF NOT EXISTS {schema}.users (
                    id           UUID PRIMARY KEY,
                    email        TEXT NOT NULL UNIQUE,
                    display_name TEXT NOT NULL,
                    role         TEXT NOT NULL,
                    created_at   TIMESTAMPTZ NOT NULL
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {schema}.patients (
                    id            UUID PRIMARY KEY,
                    full_name     TEXT NOT NULL,
                    date_of_birth DATE NULL,
                    created_at    TIMESTAMPTZ NOT NULL
                )"
            ),
        ];

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("create_partition", e))?;
        for statement in &statements {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("create_partition", e))?;
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("create_partition", e))?;
        Ok(())
    }

    #[instrument(skip(self, user), fields(partition = %partition, user_id = %user.id), err)]
    async fn insert_user(
        &self,
        partition: &PartitionId,
        user: UserRecord,
    ) -> Result<(), DataAccessError> {
        let mut tx = self.begin_in(partition, "insert_user").await?;
        let sql = format!(
            "INSERT INTO {}.users (id, email, display_name, role, created_at)
             VALUES ($1, $2, $3, $4, $5)",
            partition.quoted()
        );
        sqlx::query(&sql)
            .bind(user.id.as_uuid())
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(user.role.as_str())
            .bind(user.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_user", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    #[instrument(
        skip(self),
        fields(partition = %partition, row_count = tracing::field::Empty),
        err
    )]
    async fn list_users(&self, partition: &PartitionId) -> Result<Vec<UserRecord>, DataAccessError> {
        let mut tx = self.begin_in(partition, "list_users").await?;
        let sql = format!(
            "SELECT id, email, display_name, role, created_at
             FROM {}.users
             ORDER BY created_at ASC, id ASC",
            partition.quoted()
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("list_users", e))?;

        let users = rows.iter().map(user_from_row).collect::<Result<Vec<_>, _>>()?;
        Span::current().record("row_count", users.len());
        Ok(users)
    }

    #[instrument(skip(self), fields(partition = %partition, user_id = %id), err)]
    async fn delete_user(&self, partition: &PartitionId, id: EntityId) -> Result<(), DataAccessError> {
        let mut tx = self.begin_in(partition, "delete_user").await?;
        let sql = format!("DELETE FROM {}.users WHERE id = $1", partition.quoted());
        let result = sqlx::query(&sql)
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(DataAccessError::NotFound);
        }
        tx.commit().await.map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(())
    }

    #[instrument(skip(self, patient), fields(partition = %partition, patient_id = %patient.id), err)]
    async fn insert_patient(
        &self,
        partition: &PartitionId,
        patient: PatientRecord,
    ) -> Result<(), DataAccessError> {
        let mut tx = self.begin_in(partition, "insert_patient").await?;
        let sql = format!(
            "INSERT INTO {}.patients (id, full_name, date_of_birth, created_at)
             VALUES ($1, $2, $3, $4)",
            partition.quoted()
        );
        sqlx::query(&sql)
            .bind(patient.id.as_uuid())
            .bind(&patient.full_name)
            .bind(patient.date_of_birth)
            .bind(patient.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_patient", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("insert_patient", e))?;
        Ok(())
    }

    #[instrument(
        skip(self),
        fields(partition = %partition, row_count = tracing::field::Empty),
        err
    )]
    async fn list_patients(
        &self,
        partition: &PartitionId,
    ) -> Result<Vec<PatientRecord>, DataAccessError> {
        let mut tx = self.begin_in(partition, "list_patients").await?;
        let sql = format!(
            "SELECT id, full_name, date_of_birth, created_at
             FROM {}.patients
             ORDER BY created_at ASC, id ASC",
            partition.quoted()
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("list_patients", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("list_patients", e))?;

        let patients = rows.iter().map(patient_from_row).collect::<Result<Vec<_>, _>>()?;
        Span::current().record("row_count", patients.len());
        Ok(patients)
    }

    #[instrument(skip(self), fields(partition = %partition, patient_id = %id), err)]
    async fn get_patient(
        &self,
        partition: &PartitionId,
        id: EntityId,
    ) -> Result<Option<PatientRecord>, DataAccessError> {
        let mut tx = self.begin_in(partition, "get_patient").await?;
        let sql = format!(
            "SELECT id, full_name, date_of_birth, created_at
             FROM {}.patients
             WHERE id = $1",
            partition.quoted()
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("get_patient", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("get_patient", e))?;

        row.as_ref().map(patient_from_row).transpose()
    }
}
