use serde::{Deserialize, Serialize};

/// Tenant identifier scoping every entity and query in the system.
///
/// Engines are constructed for exactly one tenant; the id is stamped on
/// records for wire-form parity but never consulted as a runtime filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_id_display_roundtrip() {
        let id = TenantId::new("acme-isp");
        assert_eq!(id.to_string(), "acme-isp");
        assert_eq!(id.as_str(), "acme-isp");
    }
}
