//! Error types for the reconciler crate.

use std::fmt;

use teamsync_directory::{ParseRoleError, TeamId};
use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of remote entity being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Team,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Team => f.write_str("team"),
            Self::User => f.write_str("user"),
        }
    }
}

/// Reconciler error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Find-or-create of a team or user failed.
    #[error("resolve {entity} '{key}': {source}")]
    Resolve {
        entity: EntityKind,
        key: String,
        #[source]
        source: teamsync_directory::Error,
    },

    /// Current memberships of a team could not be read.
    #[error("fetch memberships of team {team_id}: {source}")]
    MembershipFetch {
        team_id: TeamId,
        #[source]
        source: teamsync_directory::Error,
    },

    /// Endpoint or token is not configured.
    #[error("directory credentials are not configured")]
    MissingCredentials,

    /// A declared user carries a role outside the standard set.
    #[error("user '{user}': {source}")]
    InvalidRole {
        user: String,
        #[source]
        source: ParseRoleError,
    },

    /// Reading or writing a declared resource failed.
    #[error("resource store error: {reason}")]
    Store { reason: String },

    /// Reconciliation failed.
    #[error("reconciliation failed: {reason}")]
    ReconcileFailed { reason: String },
}

impl Error {
    /// Create a team resolution error.
    pub fn resolve_team(key: impl Into<String>, source: teamsync_directory::Error) -> Self {
        Self::Resolve {
            entity: EntityKind::Team,
            key: key.into(),
            source,
        }
    }

    /// Create a user resolution error.
    pub fn resolve_user(key: impl Into<String>, source: teamsync_directory::Error) -> Self {
        Self::Resolve {
            entity: EntityKind::User,
            key: key.into(),
            source,
        }
    }

    /// Create a membership fetch error.
    pub const fn membership_fetch(team_id: TeamId, source: teamsync_directory::Error) -> Self {
        Self::MembershipFetch { team_id, source }
    }

    /// Create a store error.
    pub fn store(reason: impl Into<String>) -> Self {
        Self::Store {
            reason: reason.into(),
        }
    }

    /// Create a reconcile failed error.
    pub fn reconcile_failed(reason: impl Into<String>) -> Self {
        Self::ReconcileFailed {
            reason: reason.into(),
        }
    }

    /// Whether retrying the same cycle may succeed without any change.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Resolve { source, .. } | Self::MembershipFetch { source, .. } => {
                source.is_retryable()
            }
            Self::Store { .. } => true,
            Self::MissingCredentials | Self::InvalidRole { .. } | Self::ReconcileFailed { .. } => {
                false
            }
        }
    }
}
