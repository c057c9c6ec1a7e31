use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Action verb implied by a route and method (e.g. "read", "delete").
///
/// Actions are opaque strings so policy documents can name verbs this crate
/// does not know about; an unknown verb simply matches no rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(Cow<'static, str>);

impl Action {
    pub const CREATE: Action = Action(Cow::Borrowed("create"));
    pub const READ: Action = Action(Cow::Borrowed("read"));
    pub const UPDATE: Action = Action(Cow::Borrowed("update"));
    pub const DELETE: Action = Action(Cow::Borrowed("delete"));
    pub const LIST: Action = Action(Cow::Borrowed("list"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resource type a request acts on (e.g. "organization", "patient").
///
/// The special value `"*"` is only meaningful inside policy rules, where it
/// matches any resource type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceType(Cow<'static, str>);

impl ResourceType {
    pub const ORGANIZATION: ResourceType = ResourceType(Cow::Borrowed("organization"));
    pub const USER: ResourceType = ResourceType(Cow::Borrowed("user"));
    pub const PATIENT: ResourceType = ResourceType(Cow::Borrowed("patient"));
    pub const WILDCARD: ResourceType = ResourceType(Cow::Borrowed("*"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
