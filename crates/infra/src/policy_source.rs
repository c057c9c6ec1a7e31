//! Loading the permission policy at startup.

use std::path::Path;

use thiserror::Error;

use carehub_auth::{PermissionPolicy, PolicyDocument};

#[derive(Debug, Error)]
pub enum PolicyLoadError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid policy document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("policy document contains no rules")]
    Empty,
}

/// Parse a JSON policy document into a ready-to-share policy table.
///
/// An empty document is rejected: it would deny everything, which is
/// almost certainly a deployment mistake rather than intent.
pub fn policy_from_json(json: &str) -> Result<PermissionPolicy, PolicyLoadError> {
    let document: PolicyDocument = serde_json::from_str(json)?;
    if document.rules.is_empty() {
        return Err(PolicyLoadError::Empty);
    }
    Ok(PermissionPolicy::from_document(&document))
}

/// Load the policy from `path`, or the built-in matrix when no path is given.
pub fn load_policy(path: Option<&Path>) -> Result<PermissionPolicy, PolicyLoadError> {
    let Some(path) = path else {
        tracing::info!("using built-in permission policy");
        return Ok(PermissionPolicy::builtin());
    };

    let json = std::fs::read_to_string(path).map_err(|source| PolicyLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let policy = policy_from_json(&json)?;
    tracing::info!(path = %path.display(), rules = policy.len(), "loaded permission policy");
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carehub_auth::{Action, ResourceType, Role};

    #[test]
    fn json_document_loads_with_wildcards() {
        let json = r#"{
            "rules": [
                { "role": "nurse", "action": "read", "resource": "*" },
                { "role": "nurse", "action": "read", "resource": "user", "effect": "deny" }
            ]
        }"#;
        let policy = policy_from_json(json).unwrap();

        assert!(policy.is_allowed(Role::Nurse, &Action::READ, &ResourceType::PATIENT));
        assert!(!policy.is_allowed(Role::Nurse, &Action::READ, &ResourceType::USER));
        assert!(!policy.is_allowed(Role::Doctor, &Action::READ, &ResourceType::PATIENT));
    }

    #[test]
    fn unknown_role_is_a_parse_error() {
        let json = r#"{ "rules": [ { "role": "janitor", "action": "read", "resource": "*" } ] }"#;
        assert!(matches!(policy_from_json(json), Err(PolicyLoadError::Parse(_))));
    }

    #[test]
    fn empty_document_is_rejected() {
        assert!(matches!(policy_from_json(r#"{ "rules": [] }"#), Err(PolicyLoadError::Empty)));
    }

    #[test]
    fn no_path_means_builtin() {
        let policy = load_policy(None).unwrap();
        assert_eq!(policy.len(), PermissionPolicy::builtin().len());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_policy(Some(Path::new("/nonexistent/carehub-policy.json"))).unwrap_err();
        assert!(matches!(err, PolicyLoadError::Io { .. }));
    }
}
