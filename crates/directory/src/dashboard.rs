//! Dashboard provisioning payloads.
//!
//! A new monitor team gets one dashboard scoped to its first namespace. The
//! payload is an embedded JSON template with two placeholders.

use crate::error::Result;
use crate::models::TeamId;

const TEMPLATE: &str = include_str!("../templates/dashboard.json");

const TEAM_ID_PLACEHOLDER: &str = "__TEAM_ID__";
const NAMESPACE_PLACEHOLDER: &str = "__TARGET_NAMESPACE__";

/// Path of the dashboard endpoint, relative to the dashboard API base.
pub const DASHBOARDS_PATH: &str = "/api/v3/dashboards";

/// Render the dashboard payload for a team and namespace.
///
/// # Errors
///
/// Returns a JSON error if the substituted template is not valid JSON, which
/// happens when the namespace contains characters that need escaping.
pub fn render(team_id: TeamId, namespace: &str) -> Result<serde_json::Value> {
    let rendered = TEMPLATE
        .replace(TEAM_ID_PLACEHOLDER, &team_id.to_string())
        .replace(NAMESPACE_PLACEHOLDER, namespace);
    Ok(serde_json::from_str(&rendered)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_placeholders() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let payload = render(TeamId(77), "proj-tools")?;
        let text = payload.to_string();

        assert!(!text.contains(TEAM_ID_PLACEHOLDER));
        assert!(!text.contains(NAMESPACE_PLACEHOLDER));
        assert_eq!(
            payload["dashboard"]["sharingSettings"][0]["member"]["id"],
            serde_json::json!(77)
        );
        assert_eq!(
            payload["dashboard"]["scopeExpressionList"][0]["value"][0],
            "proj-tools"
        );
        Ok(())
    }

    #[test]
    fn test_render_rejects_namespace_breaking_json() {
        assert!(render(TeamId(1), "bad\"namespace").is_err());
    }
}
