//! Declarative permission policy.
//!
//! A [`PermissionPolicy`] is built once from a [`PolicyDocument`] and then only
//! read. Lookups are flat hash probes in precedence order:
//!
//! 1. explicit exact `(role, action, resource)`
//! 2. explicit wildcard `(role, action, "*")`
//! 3. inherited exact (super role only)
//! 4. inherited wildcard (super role only)
//!
//! and fall back to deny. The super role's inherited entries are
//! materialised at build time as the union of every other role's `allow`
//! rules, in a table of their own, so no lookup ever walks a hierarchy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Action, ResourceType, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    fn allow() -> Self {
        Effect::Allow
    }
}

/// One declarative rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub role: Role,
    pub action: Action,
    pub resource: ResourceType,
    #[serde(default = "Effect::allow")]
    pub effect: Effect,
}

impl PermissionRule {
    pub fn allow(role: Role, action: Action, resource: ResourceType) -> Self {
        Self {
            role,
            action,
            resource,
            effect: Effect::Allow,
        }
    }

    pub fn deny(role: Role, action: Action, resource: ResourceType) -> Self {
        Self {
            role,
            action,
            resource,
            effect: Effect::Deny,
        }
    }
}

/// Serialized form of a policy (e.g. a JSON file on disk).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub rules: Vec<PermissionRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RuleKey {
    role: Role,
    action: Action,
    resource: ResourceType,
}

/// Where a table entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "from")]
pub enum RuleOrigin {
    Explicit,
    /// Materialised for the super role from another role's grant.
    Inherited(Role),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLevel {
    Exact,
    Wildcard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    effect: Effect,
    origin: RuleOrigin,
}

/// The rule that decided a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchedRule {
    pub level: MatchLevel,
    pub effect: Effect,
    pub origin: RuleOrigin,
}

/// Result of a policy lookup, with the deciding rule for audit logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    /// `None` when no rule matched and the default deny applied.
    pub matched: Option<MatchedRule>,
}

/// Immutable `(role, action, resource) → effect` table.
#[derive(Debug, Clone)]
pub struct PermissionPolicy {
    explicit: HashMap<RuleKey, Entry>,
    inherited: HashMap<RuleKey, Entry>,
}

impl PermissionPolicy {
    pub fn from_document(document: &PolicyDocument) -> Self {
        Self::from_rules(document.rules.iter().cloned())
    }

    pub fn from_rules(rules: impl IntoIterator<Item = PermissionRule>) -> Self {
        let mut table: HashMap<RuleKey, Entry> = HashMap::new();

        for rule in rules {
            let key = RuleKey {
                role: rule.role,
                action: rule.action,
                resource: rule.resource,
            };
            let entry = Entry {
                effect: rule.effect,
                origin: RuleOrigin::Explicit,
            };
            // Conflicting duplicates: deny wins.
            table
                .entry(key)
                .and_modify(|existing| {
                    if entry.effect == Effect::Deny {
                        *existing = entry;
                    }
                })
                .or_insert(entry);
        }

        let mut inherited: HashMap<RuleKey, Entry> = HashMap::new();
        for (key, entry) in &table {
            if key.role.is_super() || entry.effect != Effect::Allow {
                continue;
            }
            inherited
                .entry(RuleKey {
                    role: Role::SuperAdmin,
                    action: key.action.clone(),
                    resource: key.resource.clone(),
                })
                .or_insert(Entry {
                    effect: Effect::Allow,
                    origin: RuleOrigin::Inherited(key.role),
                });
        }

        Self {
            explicit: table,
            inherited,
        }
    }

    /// Policy built from [`default_policy_document`].
    pub fn builtin() -> Self {
        Self::from_document(&default_policy_document())
    }

    /// Total: unknown roles, verbs and resource types are simply denied.
    pub fn is_allowed(&self, role: Role, action: &Action, resource: &ResourceType) -> bool {
        self.explain(role, action, resource).allowed
    }

    pub fn explain(&self, role: Role, action: &Action, resource: &ResourceType) -> PolicyDecision {
        let exact = RuleKey {
            role,
            action: action.clone(),
            resource: resource.clone(),
        };
        let wildcard = RuleKey {
            resource: ResourceType::WILDCARD,
            ..exact.clone()
        };

        // Explicit rules at either level outrank anything inherited.
        let matched = [&self.explicit, &self.inherited]
            .into_iter()
            .find_map(|table| {
                table
                    .get(&exact)
                    .map(|e| (MatchLevel::Exact, e))
                    .or_else(|| table.get(&wildcard).map(|e| (MatchLevel::Wildcard, e)))
            })
            .map(|(level, e)| MatchedRule {
                level,
                effect: e.effect,
                origin: e.origin,
            });

        PolicyDecision {
            allowed: matches!(matched, Some(MatchedRule { effect: Effect::Allow, .. })),
            matched,
        }
    }

    /// Number of table entries, including materialised super-role entries.
    pub fn len(&self) -> usize {
        self.explicit.len() + self.inherited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.explicit.is_empty() && self.inherited.is_empty()
    }
}

/// Built-in role matrix.
pub fn default_policy_document() -> PolicyDocument {
    use Action as A;
    use ResourceType as R;
    use Role::*;

    let mut rules = Vec::new();
    let mut grant = |role: Role, actions: &[A], resource: R| {
        for action in actions {
            rules.push(PermissionRule::allow(role, action.clone(), resource.clone()));
        }
    };

    // Organization lifecycle is platform-only.
    grant(SuperAdmin, &[A::CREATE, A::DELETE], R::ORGANIZATION);

    grant(OrgAdmin, &[A::READ, A::LIST, A::UPDATE], R::ORGANIZATION);
    grant(OrgAdmin, &[A::CREATE, A::READ, A::UPDATE, A::DELETE, A::LIST], R::USER);
    grant(OrgAdmin, &[A::CREATE, A::READ, A::UPDATE, A::DELETE, A::LIST], R::PATIENT);

    for clinician in [Doctor, Nurse] {
        grant(clinician, &[A::READ, A::LIST], R::ORGANIZATION);
        grant(clinician, &[A::READ, A::LIST], R::USER);
        grant(clinician, &[A::CREATE, A::READ, A::UPDATE, A::LIST], R::PATIENT);
    }

    grant(Caregiver, &[A::READ, A::LIST], R::ORGANIZATION);
    grant(Caregiver, &[A::READ, A::LIST], R::USER);
    grant(Caregiver, &[A::READ, A::LIST, A::UPDATE], R::PATIENT);

    grant(Receptionist, &[A::READ], R::ORGANIZATION);
    grant(Receptionist, &[A::READ, A::LIST], R::USER);
    grant(Receptionist, &[A::CREATE, A::READ, A::UPDATE, A::LIST], R::PATIENT);

    grant(Patient, &[A::READ], R::ORGANIZATION);
    grant(Patient, &[A::READ], R::PATIENT);

    PolicyDocument { rules }
}
