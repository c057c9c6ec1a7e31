//! Postgres-backed organization registry.
//!
//! Lives in the shared `public` schema. Table names are always written
//! schema-qualified so a session `search_path` left over from tenant work can
//! never redirect a registry read.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{instrument, Span};
use uuid::Uuid;

use carehub_auth::{DirectoryError, OrganizationDirectory};
use carehub_core::{Organization, OrganizationId, PartitionId};

use super::OrganizationRegistry;
use crate::error::map_sqlx_error;
use crate::DataAccessError;

const CREATE_REGISTRY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS public.organizations (
    id             UUID PRIMARY KEY,
    name           TEXT NOT NULL,
    partition_name TEXT NOT NULL UNIQUE,
    created_at     TIMESTAMPTZ NOT NULL,
    deleted_at     TIMESTAMPTZ NULL
)
"#;

#[derive(Debug, Clone)]
pub struct PgOrganizationRegistry {
    pool: Arc<PgPool>,
}

impl PgOrganizationRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the registry table if it does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), DataAccessError> {
        sqlx::query(CREATE_REGISTRY_TABLE)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_registry_schema", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(organization_id = %id), err)]
    async fn fetch(&self, id: OrganizationId) -> Result<Option<Organization>, DataAccessError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, partition_name, created_at, deleted_at
            FROM public.organizations
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_organization", e))?;

        row.as_ref().map(organization_from_row).transpose()
    }
}

fn organization_from_row(row: &PgRow) -> Result<Organization, DataAccessError> {
    let decode = |e: sqlx::Error| {
        DataAccessError::Storage(format!("failed to decode organization row: {}", e))
    };

    let id: Uuid = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let partition_name: String = row.try_get("partition_name").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;
    let deleted_at: Option<DateTime<Utc>> = row.try_get("deleted_at").map_err(decode)?;

    // A registry row with an unusable partition name is corrupt storage, not
    // a missing organization.
    let partition = PartitionId::parse(&partition_name)
        .map_err(|e| DataAccessError::Storage(format!("corrupt partition for {}: {}", id, e)))?;

    Ok(Organization {
        id: OrganizationId::from_uuid(id),
        name,
        partition,
        created_at,
        deleted_at,
    })
}

#[async_trait]
impl OrganizationDirectory for PgOrganizationRegistry {
    async fn find(&self, id: OrganizationId) -> Result<Option<Organization>, DirectoryError> {
        self.fetch(id).await.map_err(DirectoryError::from)
    }
}

#[async_trait]
impl OrganizationRegistry for PgOrganizationRegistry {
    #[instrument(
        skip(self, organization),
        fields(
            organization_id = %organization.id,
            partition = %organization.partition
        ),
        err
    )]
    async fn insert(&self, organization: Organization) -> Result<(), DataAccessError> {
        sqlx::query(
            r#"
            INSERT INTO public.organizations (id, name, partition_name, created_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(organization.id.as_uuid())
        .bind(&organization.name)
        .bind(organization.partition.as_str())
        .bind(organization.created_at)
        .bind(organization.deleted_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_organization", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(organization_count = tracing::field::Empty), err)]
    async fn list_active(&self) -> Result<Vec<Organization>, DataAccessError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, partition_name, created_at, deleted_at
            FROM public.organizations
            WHERE deleted_at IS NULL
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_organizations", e))?;

        let organizations = rows
            .iter()
            .map(organization_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Span::current().record("organization_count", organizations.len());
        Ok(organizations)
    }

    #[instrument(skip(self), fields(organization_id = %id), err)]
    async fn soft_delete(
        &self,
        id: OrganizationId,
        at: DateTime<Utc>,
    ) -> Result<Organization, DataAccessError> {
        let row = sqlx::query(
            r#"
            UPDATE public.organizations
            SET deleted_at = $2
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, name, partition_name, created_at, deleted_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("soft_delete_organization", e))?;

        match row {
            Some(row) => organization_from_row(&row),
            None => Err(DataAccessError::NotFound),
        }
    }
}
