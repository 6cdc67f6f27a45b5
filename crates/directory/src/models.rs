//! Wire and domain models for the remote directory.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a remote team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub i64);

/// Identifier of a remote user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A team as the directory reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTeam {
    pub id: TeamId,
    pub name: String,
}

/// A user as the directory reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: UserId,
    pub email: String,
}

/// One user's membership on a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "standardTeamRole", default)]
    pub role: MemberRole,
}

/// Role a member holds, as the directory reports it.
///
/// Members with a custom role report a null or non-standard
/// `standardTeamRole`; they are kept as [`MemberRole::Custom`] so a single
/// such member does not make the whole team unreadable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum MemberRole {
    Standard(TeamRole),
    #[default]
    Custom,
}

impl MemberRole {
    /// Whether this membership can never be revoked once granted.
    pub const fn is_monotonic(self) -> bool {
        matches!(self, Self::Standard(role) if role.is_monotonic())
    }

    /// Resolve a wire role name; anything outside the standard set is custom.
    pub fn from_wire(name: Option<&str>) -> Self {
        name.and_then(|name| TeamRole::ALL.into_iter().find(|r| r.as_str() == name))
            .map_or(Self::Custom, Self::Standard)
    }
}

impl From<TeamRole> for MemberRole {
    fn from(role: TeamRole) -> Self {
        Self::Standard(role)
    }
}

impl PartialEq<TeamRole> for MemberRole {
    fn eq(&self, other: &TeamRole) -> bool {
        matches!(self, Self::Standard(role) if role == other)
    }
}

impl<'de> Deserialize<'de> for MemberRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from_wire(name.as_deref()))
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard(role) => role.fmt(f),
            Self::Custom => f.write_str("custom role"),
        }
    }
}

/// Standard team roles.
///
/// `Manager` is monotonic: once granted, the directory offers no way to take
/// it away again, so reconciliation never revokes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TeamRole {
    #[serde(rename = "ROLE_TEAM_READ")]
    Read,
    #[serde(rename = "ROLE_TEAM_SERVICE_MANAGER")]
    ServiceManager,
    #[serde(rename = "ROLE_TEAM_STANDARD")]
    Standard,
    #[serde(rename = "ROLE_TEAM_EDIT")]
    Edit,
    #[serde(rename = "ROLE_TEAM_MANAGER")]
    Manager,
}

impl TeamRole {
    /// Every standard role.
    pub const ALL: [Self; 5] = [
        Self::Read,
        Self::ServiceManager,
        Self::Standard,
        Self::Edit,
        Self::Manager,
    ];

    /// Wire name of the role.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "ROLE_TEAM_READ",
            Self::ServiceManager => "ROLE_TEAM_SERVICE_MANAGER",
            Self::Standard => "ROLE_TEAM_STANDARD",
            Self::Edit => "ROLE_TEAM_EDIT",
            Self::Manager => "ROLE_TEAM_MANAGER",
        }
    }

    /// Whether this role can never be revoked once granted.
    pub const fn is_monotonic(self) -> bool {
        matches!(self, Self::Manager)
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role name is not one of the standard roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown team role '{0}'")]
pub struct ParseRoleError(pub String);

impl FromStr for TeamRole {
    type Err = ParseRoleError;

    /// Accepts `ROLE_TEAM_EDIT` as well as the short form `edit`, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let short = upper.strip_prefix("ROLE_TEAM_").unwrap_or(&upper);
        match short {
            "READ" => Ok(Self::Read),
            "SERVICE_MANAGER" => Ok(Self::ServiceManager),
            "STANDARD" => Ok(Self::Standard),
            "EDIT" => Ok(Self::Edit),
            "MANAGER" => Ok(Self::Manager),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

/// Product a team belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Monitor,
    Secure,
}

impl Product {
    /// Wire name of the product.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monitor => "monitor",
            Self::Secure => "secure",
        }
    }

    /// Additional permissions granted to a freshly created team.
    pub fn permissions(self) -> BTreeMap<&'static str, bool> {
        let monitor = matches!(self, Self::Monitor);
        BTreeMap::from([
            ("hasSysdigCaptures", !monitor),
            ("hasInfrastructureEvents", monitor),
            ("hasAwsData", false),
            ("hasRapidResponse", false),
            ("hasAgentCli", monitor),
            ("hasBeaconMetrics", monitor),
        ])
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to create a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTeam {
    pub name: String,
    pub description: String,
    pub product: Product,
    /// Namespaces the team is scoped to.
    pub namespaces: Vec<String>,
}

impl NewTeam {
    /// Create a team blueprint.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        product: Product,
        namespaces: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            product,
            namespaces,
        }
    }
}

/// Scope expression of a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "type")]
    pub kind: String,
    pub expression: String,
}

/// UI entry point of a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub module: String,
}

/// UI settings of a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<EntryPoint>,
    pub theme: String,
}

/// Body of `POST /platform/v1/teams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub product: Product,
    pub is_default_team: bool,
    pub can_use_aws_metrics: bool,
    pub can_use_custom_events: bool,
    pub can_use_sysdig_capture: bool,
    pub scopes: Vec<Scope>,
    pub ui_settings: UiSettings,
    pub additional_team_permissions: BTreeMap<&'static str, bool>,
}

const TEAM_THEME: &str = "#73A1F7";

impl From<&NewTeam> for CreateTeamRequest {
    fn from(team: &NewTeam) -> Self {
        let entry_point = match team.product {
            Product::Monitor => Some(EntryPoint {
                module: "Dashboards".to_string(),
            }),
            Product::Secure => None,
        };

        Self {
            name: team.name.clone(),
            description: team.description.clone(),
            product: team.product,
            is_default_team: false,
            can_use_aws_metrics: false,
            can_use_custom_events: true,
            can_use_sysdig_capture: false,
            scopes: vec![
                Scope {
                    kind: "HOST_CONTAINER".to_string(),
                    expression: "container".to_string(),
                },
                Scope {
                    kind: "AGENT".to_string(),
                    expression: namespace_filter_expression(&team.namespaces),
                },
            ],
            ui_settings: UiSettings {
                entry_point,
                theme: TEAM_THEME.to_string(),
            },
            additional_team_permissions: team.product.permissions(),
        }
    }
}

/// Body of `POST /platform/v1/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateUserRequest<'a> {
    pub email: &'a str,
    pub role: TeamRole,
}

/// Body of `PUT /platform/v1/teams/{team}/users/{user}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveMembershipRequest {
    #[serde(rename = "standardTeamRole")]
    pub role: TeamRole,
}

/// List responses wrap their items under `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Build the agent scope expression for a namespace list.
pub fn namespace_filter_expression(namespaces: &[String]) -> String {
    let quoted = namespaces
        .iter()
        .map(|ns| format!("\"{ns}\""))
        .collect::<Vec<_>>()
        .join(",");
    format!("kubernetes.namespace.name in ({quoted})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parses_short_and_long_forms() {
        assert_eq!("EDIT".parse::<TeamRole>(), Ok(TeamRole::Edit));
        assert_eq!("ROLE_TEAM_EDIT".parse::<TeamRole>(), Ok(TeamRole::Edit));
        assert_eq!("role_team_read".parse::<TeamRole>(), Ok(TeamRole::Read));
        assert_eq!(
            " service_manager ".parse::<TeamRole>(),
            Ok(TeamRole::ServiceManager)
        );
    }

    #[test]
    fn test_role_rejects_unknown() {
        assert_eq!(
            "OWNER".parse::<TeamRole>(),
            Err(ParseRoleError("OWNER".to_string()))
        );
    }

    #[test]
    fn test_only_manager_is_monotonic() {
        let monotonic: Vec<_> = TeamRole::ALL
            .into_iter()
            .filter(|r| r.is_monotonic())
            .collect();
        assert_eq!(monotonic, vec![TeamRole::Manager]);
    }

    #[test]
    fn test_membership_wire_format() -> Result<(), Box<dyn std::error::Error>> {
        let membership: Membership =
            serde_json::from_str(r#"{"userId": 42, "standardTeamRole": "ROLE_TEAM_MANAGER"}"#)?;
        assert_eq!(membership.user_id, UserId(42));
        assert_eq!(membership.role, TeamRole::Manager);
        Ok(())
    }

    #[test]
    fn test_membership_with_custom_role() -> Result<(), Box<dyn std::error::Error>> {
        let null_role: Membership = serde_json::from_str(
            r#"{"userId": 2, "standardTeamRole": null, "customTeamRoleId": 77}"#,
        )?;
        let missing: Membership = serde_json::from_str(r#"{"userId": 3, "customTeamRoleId": 77}"#)?;
        let unknown: Membership =
            serde_json::from_str(r#"{"userId": 4, "standardTeamRole": "ROLE_TEAM_OWNER"}"#)?;

        assert_eq!(null_role.role, MemberRole::Custom);
        assert_eq!(missing.role, MemberRole::Custom);
        assert_eq!(unknown.role, MemberRole::Custom);
        assert!(!MemberRole::Custom.is_monotonic());
        assert!(MemberRole::from(TeamRole::Manager).is_monotonic());
        Ok(())
    }

    #[test]
    fn test_namespace_filter_expression() {
        let namespaces = vec!["foo-tools".to_string(), "foo-dev".to_string()];
        assert_eq!(
            namespace_filter_expression(&namespaces),
            r#"kubernetes.namespace.name in ("foo-tools","foo-dev")"#
        );
    }

    #[test]
    fn test_monitor_team_request() -> Result<(), Box<dyn std::error::Error>> {
        let team = NewTeam::new(
            "foo-team",
            "Foo project",
            Product::Monitor,
            vec!["foo-tools".to_string()],
        );
        let body = serde_json::to_value(CreateTeamRequest::from(&team))?;

        assert_eq!(body["name"], "foo-team");
        assert_eq!(body["product"], "monitor");
        assert_eq!(body["uiSettings"]["entryPoint"]["module"], "Dashboards");
        assert_eq!(body["scopes"][1]["type"], "AGENT");
        assert_eq!(body["additionalTeamPermissions"]["hasAgentCli"], true);
        assert_eq!(body["additionalTeamPermissions"]["hasSysdigCaptures"], false);
        Ok(())
    }

    #[test]
    fn test_secure_team_request_has_no_entry_point() -> Result<(), Box<dyn std::error::Error>> {
        let team = NewTeam::new("foo-team-secure", "", Product::Secure, Vec::new());
        let body = serde_json::to_value(CreateTeamRequest::from(&team))?;

        assert!(body["uiSettings"].get("entryPoint").is_none());
        assert!(body.get("description").is_none());
        assert_eq!(body["additionalTeamPermissions"]["hasSysdigCaptures"], true);
        assert_eq!(body["additionalTeamPermissions"]["hasBeaconMetrics"], false);
        Ok(())
    }
}
