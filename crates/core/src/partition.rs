//! Storage partition (schema) identifiers.
//!
//! A `PartitionId` names the isolated schema that holds one organization's
//! records. It is a validated SQL identifier: values are either derived from
//! an [`OrganizationId`] at provisioning time or read back from the trusted
//! organization registry. Nothing in the workspace builds one by splicing a
//! caller-supplied string into a name.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::OrganizationId;

/// Maximum identifier length accepted by PostgreSQL.
pub const MAX_PARTITION_LEN: usize = 63;

const PARTITION_PREFIX: &str = "org_";

/// Validated storage-partition identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PartitionId(String);

impl PartitionId {
    /// Partition name assigned to a newly provisioned organization.
    pub fn for_organization(id: OrganizationId) -> Self {
        Self(format!("{PARTITION_PREFIX}{}", id.as_uuid().simple()))
    }

    /// Parse and validate a partition name read from a trusted source
    /// (registry row, signed credential claim).
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        validate(raw)?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for use as a SQL identifier.
    ///
    /// Validation already excludes quotes, so no escaping is needed.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

fn validate(raw: &str) -> Result<(), DomainError> {
    if raw.is_empty() || raw.len() > MAX_PARTITION_LEN {
        return Err(DomainError::invalid_partition(format!(
            "length must be 1..={MAX_PARTITION_LEN}"
        )));
    }

    let mut chars = raw.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    let rest_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !first_ok || !rest_ok {
        return Err(DomainError::invalid_partition(format!(
            "'{raw}' is not a lowercase identifier"
        )));
    }

    // Reserved PostgreSQL schema prefixes.
    if raw.starts_with("pg_") || raw == "public" || raw == "information_schema" {
        return Err(DomainError::invalid_partition(format!("'{raw}' is reserved")));
    }

    Ok(())
}

impl core::fmt::Display for PartitionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PartitionId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for PartitionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
