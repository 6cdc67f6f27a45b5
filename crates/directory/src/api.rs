//! The directory capability consumed by the reconciler.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Membership, NewTeam, RemoteTeam, RemoteUser, TeamId, TeamRole, UserId};

/// Operations against the remote teams/users/memberships service.
///
/// Name and email filters are best-effort on the remote side; callers must
/// re-check the candidates they get back.
#[async_trait]
pub trait Directory: Send + Sync {
    /// List teams matching a name filter hint.
    async fn find_teams_by_name(&self, name: &str) -> Result<Vec<RemoteTeam>>;

    /// Create a team.
    async fn create_team(&self, team: &NewTeam) -> Result<RemoteTeam>;

    /// Delete a team.
    async fn delete_team(&self, team_id: TeamId) -> Result<()>;

    /// List users matching an email filter.
    async fn find_users_by_email(&self, email: &str) -> Result<Vec<RemoteUser>>;

    /// Create a user.
    async fn create_user(&self, email: &str, role: TeamRole) -> Result<RemoteUser>;

    /// List the memberships of a team.
    async fn fetch_memberships(&self, team_id: TeamId) -> Result<Vec<Membership>>;

    /// Grant `role` to a user on a team (upsert).
    async fn grant_membership(&self, team_id: TeamId, user_id: UserId, role: TeamRole)
    -> Result<()>;

    /// Remove a user from a team.
    async fn revoke_membership(&self, team_id: TeamId, user_id: UserId) -> Result<()>;

    /// Create the default dashboard for a team, scoped to `namespace`.
    async fn provision_dashboard(&self, team_id: TeamId, namespace: &str) -> Result<()>;
}
