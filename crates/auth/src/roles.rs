use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role carried by a credential.
///
/// The set is closed: a credential naming any other role is malformed.
/// `SuperAdmin` is the platform operator role; every other role is scoped to
/// the caller's home organization.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    OrgAdmin,
    Doctor,
    Nurse,
    Caregiver,
    Receptionist,
    Patient,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 7] = [
        Role::SuperAdmin,
        Role::OrgAdmin,
        Role::Doctor,
        Role::Nurse,
        Role::Caregiver,
        Role::Receptionist,
        Role::Patient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::OrgAdmin => "org_admin",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Caregiver => "caregiver",
            Role::Receptionist => "receptionist",
            Role::Patient => "patient",
        }
    }

    /// Platform-wide role: not bound to a home organization.
    pub fn is_super(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_round_trips_through_its_name() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn role_names_are_case_sensitive() {
        assert_eq!("Super_Admin".parse::<Role>(), Err(UnknownRole("Super_Admin".into())));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn only_super_admin_is_super() {
        let supers: Vec<_> = Role::ALL.into_iter().filter(Role::is_super).collect();
        assert_eq!(supers, vec![Role::SuperAdmin]);
    }
}
