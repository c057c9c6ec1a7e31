//! Per-request inputs to the authorization gate.

/// Raw bearer credential, if the request carried a usable `Authorization`
/// header. Absence is not rejected here; the gate reports it as
/// unauthenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BearerToken(Option<String>);

impl BearerToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token)
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// Organization the request names, collected from every place a caller can
/// put one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedOrganization {
    pub path: Option<String>,
    pub header: Option<String>,
    pub body: Option<String>,
}

/// More than one source named an organization and they disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmbiguousOrganization;

impl RequestedOrganization {
    pub fn from_path(id: impl Into<String>) -> Self {
        Self {
            path: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, value: Option<String>) -> Self {
        self.header = value;
        self
    }

    pub fn with_body(mut self, value: Option<String>) -> Self {
        self.body = value;
        self
    }

    /// The single requested organization, if any.
    ///
    /// Values are compared after trimming; blank values name nothing, and
    /// identical values from several sources are fine.
    pub fn resolve(&self) -> Result<Option<&str>, AmbiguousOrganization> {
        let mut found: Option<&str> = None;
        for value in [&self.path, &self.header, &self.body].into_iter().flatten() {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match found {
                None => found = Some(value),
                Some(existing) if existing == value => {}
                Some(_) => return Err(AmbiguousOrganization),
            }
        }
        Ok(found)
    }
}
