//! Declared team resources and their reported status.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teamsync_directory::{Product, TeamId};

/// Finalizer guarding remote cleanup of a resource.
pub const FINALIZER: &str = "monitoring.devops.gov.bc.ca/sysdigteam-finalizer";

/// Finalizer written by earlier releases; removed whenever seen.
pub const LEGACY_FINALIZER: &str = "monitoring.devops.gov.bc.ca/finalizer";

/// Condition reporting whether credentials are configured.
pub const CONDITION_CREDENTIALS: &str = "SysdigCredentials";
/// Condition reporting whether the resource lives in a tools namespace.
pub const CONDITION_NAMESPACE: &str = "NamespaceValidation";
/// Overall readiness.
pub const CONDITION_READY: &str = "Ready";

pub const REASON_MISSING_ENV_VARS: &str = "MissingEnvVars";
pub const REASON_INVALID_NAMESPACE: &str = "InvalidNamespace";
pub const REASON_USER_SYNC_FAILED: &str = "UserSyncFailed";
pub const REASON_TEAM_SYNC_FAILED: &str = "TeamSyncFailed";
pub const REASON_MEMBERSHIP_SYNC_FAILED: &str = "MembershipSyncFailed";
pub const REASON_RECONCILED: &str = "Reconciled";

/// Identity of a declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    /// Create a key.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A user named in a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSpec {
    /// Email address.
    pub name: String,
    /// Role name, either `ROLE_TEAM_EDIT` or the short `EDIT`.
    pub role: String,
}

impl UserSpec {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
        }
    }
}

/// The declared content of a team resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSpec {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub users: Vec<UserSpec>,
}

/// Tri-state condition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// A typed observation about a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
}

impl Condition {
    /// Create a condition.
    pub fn new(
        kind: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            status,
            reason: reason.into(),
            message: message.into(),
        }
    }

    pub fn missing_credentials() -> Self {
        Self::new(
            CONDITION_CREDENTIALS,
            ConditionStatus::False,
            REASON_MISSING_ENV_VARS,
            "Environment variables SYSDIG_API_ENDPOINT and/or SYSDIG_TOKEN are not set",
        )
    }

    pub fn invalid_namespace() -> Self {
        Self::new(
            CONDITION_NAMESPACE,
            ConditionStatus::False,
            REASON_INVALID_NAMESPACE,
            "Object must be deployed in a namespace ending with '-tools'",
        )
    }

    pub fn not_ready(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(CONDITION_READY, ConditionStatus::False, reason, message)
    }

    pub fn ready() -> Self {
        Self::new(
            CONDITION_READY,
            ConditionStatus::True,
            REASON_RECONCILED,
            "Teams and memberships are in sync",
        )
    }
}

/// Status reported back on a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_team_id: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_team_id: Option<TeamId>,
}

impl ReconcileStatus {
    /// Recorded team id for a product.
    pub const fn team_id(&self, product: Product) -> Option<TeamId> {
        match product {
            Product::Monitor => self.monitor_team_id,
            Product::Secure => self.secure_team_id,
        }
    }

    /// Record the team id for a product.
    pub fn set_team_id(&mut self, product: Product, team_id: TeamId) {
        match product {
            Product::Monitor => self.monitor_team_id = Some(team_id),
            Product::Secure => self.secure_team_id = Some(team_id),
        }
    }

    /// Replace every condition with `condition`.
    pub fn report(&mut self, condition: Condition) {
        self.conditions = vec![condition];
    }

    /// Look up a condition by type.
    pub fn condition(&self, kind: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.kind == kind)
    }

    /// Recorded team ids, monitor first.
    pub fn team_ids(&self) -> impl Iterator<Item = (Product, TeamId)> + '_ {
        [Product::Monitor, Product::Secure]
            .into_iter()
            .filter_map(|product| self.team_id(product).map(|id| (product, id)))
    }
}

/// A declared team resource as the store holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredTeamResource {
    pub key: ResourceKey,
    pub team: TeamSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finalizers: BTreeSet<String>,
    #[serde(default)]
    pub status: ReconcileStatus,
}

impl DeclaredTeamResource {
    /// Create a live resource with no finalizers and empty status.
    pub const fn new(key: ResourceKey, team: TeamSpec) -> Self {
        Self {
            key,
            team,
            deletion_timestamp: None,
            finalizers: BTreeSet::new(),
            status: ReconcileStatus {
                conditions: Vec::new(),
                monitor_team_id: None,
                secure_team_id: None,
            },
        }
    }

    /// Whether deletion has been requested.
    pub const fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    /// Whether the given finalizer is attached.
    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers.contains(finalizer)
    }
}
