//! Membership reconciliation for a single team.
//!
//! The desired set is a map from user to role; when a user is declared more
//! than once the last declaration wins. Reconciliation grants missing
//! memberships, replaces wrong roles (revoke, then grant), and revokes
//! undeclared memberships unless they hold a monotonic role. Members holding
//! a custom role count as holding a wrong role.
//!
//! Individual membership calls are not fatal. Failures are logged and
//! collected in the [`MembershipReport`]; only failing to read the current
//! memberships aborts.

use std::collections::BTreeMap;
use std::fmt;

use itertools::{Either, Itertools};
use teamsync_directory::{Directory, MemberRole, Membership, TeamId, TeamRole, UserId};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// A single change to a team's memberships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipAction {
    /// Add a user that has no membership yet.
    Grant { user_id: UserId, role: TeamRole },
    /// Replace the role of an existing member.
    ChangeRole {
        user_id: UserId,
        from: MemberRole,
        to: TeamRole,
    },
    /// Remove an undeclared member.
    Revoke { user_id: UserId, role: MemberRole },
}

impl MembershipAction {
    /// The user the action applies to.
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::Grant { user_id, .. }
            | Self::ChangeRole { user_id, .. }
            | Self::Revoke { user_id, .. } => *user_id,
        }
    }
}

impl fmt::Display for MembershipAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grant { user_id, role } => write!(f, "grant {role} to user {user_id}"),
            Self::ChangeRole { user_id, from, to } => {
                write!(f, "change user {user_id} from {from} to {to}")
            }
            Self::Revoke { user_id, role } => write!(f, "revoke {role} from user {user_id}"),
        }
    }
}

/// Changes needed to bring a team to its desired memberships.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipPlan {
    pub actions: Vec<MembershipAction>,
    /// Declared users already holding their role.
    pub unchanged: Vec<UserId>,
    /// Undeclared users kept because their role is monotonic.
    pub protected: Vec<UserId>,
}

impl MembershipPlan {
    /// Whether the team is already converged.
    pub fn is_converged(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Collapse a declared user list into the desired map; later entries win.
pub fn desired_map(desired: &[(UserId, TeamRole)]) -> BTreeMap<UserId, TeamRole> {
    desired.iter().copied().collect()
}

/// Compute the actions that take `existing` to `desired`.
pub fn plan(existing: &[Membership], desired: &[(UserId, TeamRole)]) -> MembershipPlan {
    let current: BTreeMap<UserId, MemberRole> =
        existing.iter().map(|m| (m.user_id, m.role)).collect();
    let wanted = desired_map(desired);

    let mut result = MembershipPlan::default();

    for (&user_id, &role) in &wanted {
        match current.get(&user_id) {
            None => result.actions.push(MembershipAction::Grant { user_id, role }),
            Some(&held) if held == MemberRole::Standard(role) => result.unchanged.push(user_id),
            Some(&held) => result.actions.push(MembershipAction::ChangeRole {
                user_id,
                from: held,
                to: role,
            }),
        }
    }

    let (protected, revokes): (Vec<UserId>, Vec<MembershipAction>) = current
        .iter()
        .filter(|(id, _)| !wanted.contains_key(id))
        .partition_map(|(&user_id, &role)| {
            if role.is_monotonic() {
                Either::Left(user_id)
            } else {
                Either::Right(MembershipAction::Revoke { user_id, role })
            }
        });

    result.actions.extend(revokes);
    result.protected = protected;
    result
}

/// Result of reconciling one team's memberships.
#[derive(Debug, Clone)]
pub struct MembershipReport {
    pub team_id: TeamId,
    /// Actions that succeeded.
    pub applied: Vec<MembershipAction>,
    /// Actions that failed, with the reason.
    pub failed: Vec<(MembershipAction, String)>,
    pub unchanged: usize,
    pub protected: Vec<UserId>,
}

impl MembershipReport {
    /// Check if all actions succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Bring the memberships of `team_id` in line with `desired`.
///
/// # Errors
///
/// Returns [`Error::MembershipFetch`] when the current memberships cannot be
/// read. Failures of individual grants and revokes are reported, not
/// returned.
pub async fn reconcile_memberships(
    directory: &dyn Directory,
    team_id: TeamId,
    desired: &[(UserId, TeamRole)],
) -> Result<MembershipReport> {
    let existing = directory
        .fetch_memberships(team_id)
        .await
        .map_err(|e| Error::membership_fetch(team_id, e))?;

    let planned = plan(&existing, desired);
    for user_id in &planned.protected {
        debug!(team_id = %team_id, user_id = %user_id, "Keeping monotonic membership");
    }

    let mut applied = Vec::new();
    let mut failed = Vec::new();

    for action in planned.actions {
        match apply(directory, team_id, action).await {
            Ok(()) => applied.push(action),
            Err(reason) => failed.push((action, reason)),
        }
    }

    info!(
        team_id = %team_id,
        applied = applied.len(),
        failed = failed.len(),
        unchanged = planned.unchanged.len(),
        protected = planned.protected.len(),
        "Memberships reconciled"
    );

    Ok(MembershipReport {
        team_id,
        applied,
        failed,
        unchanged: planned.unchanged.len(),
        protected: planned.protected,
    })
}

async fn apply(
    directory: &dyn Directory,
    team_id: TeamId,
    action: MembershipAction,
) -> std::result::Result<(), String> {
    match action {
        MembershipAction::Grant { user_id, role } => directory
            .grant_membership(team_id, user_id, role)
            .await
            .map_err(|e| {
                warn!(team_id = %team_id, user_id = %user_id, role = %role, error = %e, "Grant failed");
                e.to_string()
            }),
        MembershipAction::ChangeRole { user_id, from, to } => {
            // The grant is attempted even when the revoke fails.
            let revoked = directory.revoke_membership(team_id, user_id).await;
            if let Err(e) = &revoked {
                warn!(
                    team_id = %team_id,
                    user_id = %user_id,
                    old_role = %from,
                    new_role = %to,
                    error = %e,
                    "Revoke before role change failed"
                );
            }
            let granted = directory.grant_membership(team_id, user_id, to).await;
            if let Err(e) = &granted {
                warn!(
                    team_id = %team_id,
                    user_id = %user_id,
                    old_role = %from,
                    new_role = %to,
                    error = %e,
                    "Grant during role change failed"
                );
            }
            match (revoked, granted) {
                (Ok(()), Ok(())) => Ok(()),
                (Err(e), Ok(())) => Err(format!("revoke: {e}")),
                (Ok(()), Err(e)) => Err(format!("grant: {e}")),
                (Err(r), Err(g)) => Err(format!("revoke: {r}; grant: {g}")),
            }
        }
        MembershipAction::Revoke { user_id, role } => directory
            .revoke_membership(team_id, user_id)
            .await
            .map_err(|e| {
                warn!(team_id = %team_id, user_id = %user_id, role = %role, error = %e, "Revoke failed");
                e.to_string()
            }),
    }
}
