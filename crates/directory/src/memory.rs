//! In-memory directory for tests and dry runs.
//!
//! Behaves like the remote service closely enough for reconciliation: name
//! and email filters are case-insensitive substring matches, memberships are
//! unique per (team, user), and deleting a team drops its memberships. Every
//! call is recorded, and individual operations can be made to fail.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::api::Directory;
use crate::error::{Error, Result};
use crate::models::{
    MemberRole, Membership, NewTeam, Product, RemoteTeam, RemoteUser, TeamId, TeamRole, UserId,
};

/// A recorded call against the in-memory directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    FindTeams { name: String },
    CreateTeam { name: String, product: Product },
    DeleteTeam { team_id: TeamId },
    FindUsers { email: String },
    CreateUser { email: String, role: TeamRole },
    FetchMemberships { team_id: TeamId },
    Grant { team_id: TeamId, user_id: UserId, role: TeamRole },
    Revoke { team_id: TeamId, user_id: UserId },
    ProvisionDashboard { team_id: TeamId, namespace: String },
}

impl DirectoryCall {
    /// Operation name, matching the client's error tags.
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::FindTeams { .. } => "find_teams_by_name",
            Self::CreateTeam { .. } => "create_team",
            Self::DeleteTeam { .. } => "delete_team",
            Self::FindUsers { .. } => "find_users_by_email",
            Self::CreateUser { .. } => "create_user",
            Self::FetchMemberships { .. } => "fetch_memberships",
            Self::Grant { .. } => "grant_membership",
            Self::Revoke { .. } => "revoke_membership",
            Self::ProvisionDashboard { .. } => "provision_dashboard",
        }
    }

    /// Whether the call changes remote state.
    pub const fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::FindTeams { .. } | Self::FindUsers { .. } | Self::FetchMemberships { .. }
        )
    }
}

/// Where an injected failure applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// Every call of the named operation fails.
    Operation(&'static str),
    /// Grants for this user fail.
    GrantFor(UserId),
    /// Revokes for this user fail.
    RevokeFor(UserId),
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    teams: BTreeMap<TeamId, RemoteTeam>,
    users: BTreeMap<UserId, RemoteUser>,
    memberships: BTreeMap<(TeamId, UserId), TeamRole>,
    calls: Vec<DirectoryCall>,
    failures: HashSet<FailPoint>,
}

impl State {
    fn allocate_id(&mut self) -> i64 {
        self.next_id = self.next_id.saturating_add(1);
        self.next_id
    }

    /// Record the call, then fail it if a matching fail point is armed.
    fn record(&mut self, call: DirectoryCall) -> Result<()> {
        let operation = call.operation();
        let targeted = match &call {
            DirectoryCall::Grant { user_id, .. } => {
                self.failures.contains(&FailPoint::GrantFor(*user_id))
            }
            DirectoryCall::Revoke { user_id, .. } => {
                self.failures.contains(&FailPoint::RevokeFor(*user_id))
            }
            _ => false,
        };
        self.calls.push(call);

        if targeted || self.failures.contains(&FailPoint::Operation(operation)) {
            return Err(Error::status(operation, 503, "injected failure"));
        }
        Ok(())
    }
}

/// Directory kept entirely in memory.
#[derive(Debug)]
pub struct InMemoryDirectory {
    state: RwLock<State>,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    /// Create an empty directory. Ids start at 1001.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                next_id: 1000,
                ..State::default()
            }),
        }
    }

    /// Insert a team without recording a call.
    pub async fn seed_team(&self, name: impl Into<String>) -> TeamId {
        let mut state = self.state.write().await;
        let id = TeamId(state.allocate_id());
        state.teams.insert(
            id,
            RemoteTeam {
                id,
                name: name.into(),
            },
        );
        id
    }

    /// Insert a user without recording a call.
    pub async fn seed_user(&self, email: impl Into<String>) -> UserId {
        let mut state = self.state.write().await;
        let id = UserId(state.allocate_id());
        state.users.insert(
            id,
            RemoteUser {
                id,
                email: email.into(),
            },
        );
        id
    }

    /// Insert a membership without recording a call.
    pub async fn seed_membership(&self, team_id: TeamId, user_id: UserId, role: TeamRole) {
        self.state
            .write()
            .await
            .memberships
            .insert((team_id, user_id), role);
    }

    /// Arm a failure.
    pub async fn fail(&self, point: FailPoint) {
        self.state.write().await.failures.insert(point);
    }

    /// Disarm every failure.
    pub async fn heal(&self) {
        self.state.write().await.failures.clear();
    }

    /// All calls so far, oldest first.
    pub async fn calls(&self) -> Vec<DirectoryCall> {
        self.state.read().await.calls.clone()
    }

    /// Forget recorded calls.
    pub async fn clear_calls(&self) {
        self.state.write().await.calls.clear();
    }

    /// Number of recorded calls of one operation.
    pub async fn count(&self, operation: &str) -> usize {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Current teams.
    pub async fn teams(&self) -> Vec<RemoteTeam> {
        self.state.read().await.teams.values().cloned().collect()
    }

    /// Current users.
    pub async fn users(&self) -> Vec<RemoteUser> {
        self.state.read().await.users.values().cloned().collect()
    }

    /// Current memberships of a team.
    pub async fn memberships_of(&self, team_id: TeamId) -> BTreeMap<UserId, TeamRole> {
        self.state
            .read()
            .await
            .memberships
            .iter()
            .filter(|((team, _), _)| *team == team_id)
            .map(|((_, user), role)| (*user, *role))
            .collect()
    }
}

fn loosely_matches(candidate: &str, filter: &str) -> bool {
    candidate
        .to_lowercase()
        .contains(&filter.to_lowercase())
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn find_teams_by_name(&self, name: &str) -> Result<Vec<RemoteTeam>> {
        let mut state = self.state.write().await;
        state.record(DirectoryCall::FindTeams {
            name: name.to_string(),
        })?;
        Ok(state
            .teams
            .values()
            .filter(|t| loosely_matches(&t.name, name))
            .cloned()
            .collect())
    }

    async fn create_team(&self, team: &NewTeam) -> Result<RemoteTeam> {
        let mut state = self.state.write().await;
        state.record(DirectoryCall::CreateTeam {
            name: team.name.clone(),
            product: team.product,
        })?;
        let id = TeamId(state.allocate_id());
        let created = RemoteTeam {
            id,
            name: team.name.clone(),
        };
        state.teams.insert(id, created.clone());
        Ok(created)
    }

    async fn delete_team(&self, team_id: TeamId) -> Result<()> {
        let mut state = self.state.write().await;
        state.record(DirectoryCall::DeleteTeam { team_id })?;
        if state.teams.remove(&team_id).is_none() {
            return Err(Error::status("delete_team", 404, "team not found"));
        }
        state.memberships.retain(|(team, _), _| *team != team_id);
        Ok(())
    }

    async fn find_users_by_email(&self, email: &str) -> Result<Vec<RemoteUser>> {
        let mut state = self.state.write().await;
        state.record(DirectoryCall::FindUsers {
            email: email.to_string(),
        })?;
        Ok(state
            .users
            .values()
            .filter(|u| loosely_matches(&u.email, email))
            .cloned()
            .collect())
    }

    async fn create_user(&self, email: &str, role: TeamRole) -> Result<RemoteUser> {
        let mut state = self.state.write().await;
        state.record(DirectoryCall::CreateUser {
            email: email.to_string(),
            role,
        })?;
        let id = UserId(state.allocate_id());
        let created = RemoteUser {
            id,
            email: email.to_string(),
        };
        state.users.insert(id, created.clone());
        Ok(created)
    }

    async fn fetch_memberships(&self, team_id: TeamId) -> Result<Vec<Membership>> {
        let mut state = self.state.write().await;
        state.record(DirectoryCall::FetchMemberships { team_id })?;
        if !state.teams.contains_key(&team_id) {
            return Err(Error::status("fetch_memberships", 404, "team not found"));
        }
        Ok(state
            .memberships
            .iter()
            .filter(|((team, _), _)| *team == team_id)
            .map(|((_, user_id), role)| Membership {
                user_id: *user_id,
                role: MemberRole::Standard(*role),
            })
            .collect())
    }

    async fn grant_membership(
        &self,
        team_id: TeamId,
        user_id: UserId,
        role: TeamRole,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.record(DirectoryCall::Grant {
            team_id,
            user_id,
            role,
        })?;
        state.memberships.insert((team_id, user_id), role);
        Ok(())
    }

    async fn revoke_membership(&self, team_id: TeamId, user_id: UserId) -> Result<()> {
        let mut state = self.state.write().await;
        state.record(DirectoryCall::Revoke { team_id, user_id })?;
        state.memberships.remove(&(team_id, user_id));
        Ok(())
    }

    async fn provision_dashboard(&self, team_id: TeamId, namespace: &str) -> Result<()> {
        self.state
            .write()
            .await
            .record(DirectoryCall::ProvisionDashboard {
                team_id,
                namespace: namespace.to_string(),
            })
    }
}
