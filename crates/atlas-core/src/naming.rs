//! Credential-store key resolution.

/// Namespace prepended to every credential-store key.
pub const DEFAULT_SECRET_NAMESPACE: &str = "product/mongodb/";

/// Derives canonical credential-store keys.
///
/// Resolution is a pure function of its inputs, so Observe, Update and Delete
/// find the record Create wrote as long as they pass the same identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretNamer {
    namespace: String,
}

impl SecretNamer {
    /// Creates a resolver for the given namespace.
    ///
    /// A non-empty namespace always ends with `/`.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        let mut namespace = namespace.into();
        if !namespace.is_empty() && !namespace.ends_with('/') {
            namespace.push('/');
        }
        Self { namespace }
    }

    /// Returns the namespace segment.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Resolves the key for an organization.
    ///
    /// An explicit, non-blank name wins. Otherwise the assigned organization
    /// id is used once known, falling back to the declared logical name.
    #[must_use]
    pub fn resolve(&self, explicit: Option<&str>, logical_name: &str, external_id: Option<&str>) -> String {
        let segment = explicit
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or_else(|| external_id.filter(|id| !id.is_empty()))
            .unwrap_or(logical_name);
        format!("{}{}", self.namespace, segment)
    }
}

impl Default for SecretNamer {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET_NAMESPACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_name_is_prefixed() {
        let namer = SecretNamer::default();
        assert_eq!(
            namer.resolve(Some("team-a"), "acme", Some("org-42")),
            "product/mongodb/team-a"
        );
    }

    #[test]
    fn test_blank_explicit_name_is_ignored() {
        let namer = SecretNamer::default();
        assert_eq!(
            namer.resolve(Some("  "), "acme", Some("org-42")),
            "product/mongodb/org-42"
        );
    }

    #[test]
    fn test_falls_back_to_logical_name_before_creation() {
        let namer = SecretNamer::default();
        assert_eq!(namer.resolve(None, "acme", None), "product/mongodb/acme");
        assert_eq!(namer.resolve(None, "acme", Some("")), "product/mongodb/acme");
    }

    #[test]
    fn test_namespace_gets_trailing_separator() {
        let namer = SecretNamer::new("ns");
        assert_eq!(namer.namespace(), "ns/");
        assert_eq!(namer.resolve(None, "acme", Some("org-42")), "ns/org-42");
        assert_eq!(SecretNamer::new("").resolve(None, "acme", None), "acme");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let namer = SecretNamer::new("ns/");
        let first = namer.resolve(None, "acme", Some("org-42"));
        let second = namer.resolve(None, "acme", Some("org-42"));
        assert_eq!(first, second);
    }
}
