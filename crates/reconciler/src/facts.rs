//! Desired-state derivation from a namespace key.
//!
//! A declared resource lives in the `-tools` namespace of a project. Every
//! name the reconciler needs (project namespaces, team names) follows from
//! that one string.

use serde::Serialize;
use teamsync_directory::Product;

/// Suffix marking the namespace a resource must live in.
pub const NAMESPACE_MARKER: &str = "-tools";

/// Environments every project owns a namespace for, in declaration order.
pub const ENVIRONMENTS: [&str; 4] = ["tools", "dev", "test", "prod"];

/// Names derived from a namespace key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedFacts {
    /// Lowercased project prefix.
    pub prefix: String,
    /// `{prefix}-tools`, `{prefix}-dev`, `{prefix}-test`, `{prefix}-prod`.
    pub namespaces: Vec<String>,
    /// The production namespace.
    pub prod_namespace: String,
    /// Name of the monitoring team.
    pub monitor_team: String,
    /// Name of the security team.
    pub secure_team: String,
    /// Name of the persistent storage host team.
    pub host_team: String,
}

impl DerivedFacts {
    /// Team name for a product.
    pub fn team_name(&self, product: Product) -> &str {
        match product {
            Product::Monitor => &self.monitor_team,
            Product::Secure => &self.secure_team,
        }
    }

    /// The namespace dashboards are scoped to.
    pub fn primary_namespace(&self) -> Option<&str> {
        self.namespaces.first().map(String::as_str)
    }
}

/// Derive project names from a namespace key.
///
/// The prefix is everything before the first `-tools`, lowercased. A key
/// without the marker is used whole.
pub fn derive(namespace_key: &str) -> DerivedFacts {
    let prefix = namespace_key
        .split_once(NAMESPACE_MARKER)
        .map_or(namespace_key, |(head, _)| head)
        .to_lowercase();

    let namespaces = ENVIRONMENTS
        .iter()
        .map(|env| format!("{prefix}-{env}"))
        .collect();

    DerivedFacts {
        prod_namespace: format!("{prefix}-prod"),
        monitor_team: format!("{prefix}-team"),
        secure_team: format!("{prefix}-team-secure"),
        host_team: format!("{prefix}-team-persistent-storage"),
        namespaces,
        prefix,
    }
}

/// Whether a namespace is an accepted home for a declared resource.
pub fn is_tools_namespace(namespace: &str) -> bool {
    namespace.to_lowercase().ends_with(NAMESPACE_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_from_tools_namespace() {
        let facts = derive("abc123-tools");

        assert_eq!(facts.prefix, "abc123");
        assert_eq!(
            facts.namespaces,
            vec!["abc123-tools", "abc123-dev", "abc123-test", "abc123-prod"]
        );
        assert_eq!(facts.prod_namespace, "abc123-prod");
        assert_eq!(facts.monitor_team, "abc123-team");
        assert_eq!(facts.secure_team, "abc123-team-secure");
        assert_eq!(facts.host_team, "abc123-team-persistent-storage");
    }

    #[test]
    fn test_prefix_is_lowercased() {
        let facts = derive("ABC-tools");
        assert_eq!(facts.prefix, "abc");
        assert_eq!(facts.team_name(Product::Monitor), "abc-team");
    }

    #[test]
    fn test_key_without_marker_is_used_whole() {
        let facts = derive("standalone");
        assert_eq!(facts.prefix, "standalone");
        assert_eq!(facts.primary_namespace(), Some("standalone-tools"));
    }

    #[test]
    fn test_only_first_marker_splits() {
        assert_eq!(derive("a-tools-tools").prefix, "a");
    }

    #[test]
    fn test_tools_namespace_check_ignores_case() {
        assert!(is_tools_namespace("proj-tools"));
        assert!(is_tools_namespace("PROJ-TOOLS"));
        assert!(!is_tools_namespace("abc-dev"));
        assert!(!is_tools_namespace("tools"));
    }
}
