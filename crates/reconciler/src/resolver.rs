//! Find-or-create resolution of remote teams and users.
//!
//! The directory's search filters are loose (substring, case-insensitive),
//! so every candidate is re-checked for a case-insensitive exact match on
//! its natural key before it is reused. When several candidates match, the
//! first one returned by the directory wins.

use teamsync_directory::{
    Directory, NewTeam, Product, RemoteTeam, RemoteUser, TeamId, TeamRole, UserId,
};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Outcome of a find-or-create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<Id> {
    pub id: Id,
    /// Whether the entity was created by this call.
    pub created: bool,
}

impl<Id> Resolution<Id> {
    const fn found(id: Id) -> Self {
        Self { id, created: false }
    }

    const fn created(id: Id) -> Self {
        Self { id, created: true }
    }
}

/// An entity with a natural key the directory searches by.
pub trait NaturalKey {
    fn natural_key(&self) -> &str;
}

impl NaturalKey for RemoteTeam {
    fn natural_key(&self) -> &str {
        &self.name
    }
}

impl NaturalKey for RemoteUser {
    fn natural_key(&self) -> &str {
        &self.email
    }
}

/// First candidate whose natural key equals `key`, ignoring case.
pub fn first_exact_match<'a, T: NaturalKey>(candidates: &'a [T], key: &str) -> Option<&'a T> {
    let wanted = key.to_lowercase();
    candidates
        .iter()
        .find(|candidate| candidate.natural_key().to_lowercase() == wanted)
}

/// Resolves declared names to remote identifiers.
pub struct EntityResolver<'a> {
    directory: &'a dyn Directory,
}

impl<'a> EntityResolver<'a> {
    /// Create a resolver over a directory.
    pub const fn new(directory: &'a dyn Directory) -> Self {
        Self { directory }
    }

    /// Find a team by name or create it from `blueprint`.
    ///
    /// A newly created monitoring team also gets a dashboard scoped to the
    /// first namespace of the blueprint. Dashboard failures are logged and
    /// never fail the resolution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolve`] when the search or the create call fails.
    pub async fn resolve_team(&self, blueprint: &NewTeam) -> Result<Resolution<TeamId>> {
        let name = blueprint.name.as_str();
        let candidates = self
            .directory
            .find_teams_by_name(name)
            .await
            .map_err(|e| Error::resolve_team(name, e))?;

        if let Some(existing) = first_exact_match(&candidates, name) {
            info!(team = name, team_id = %existing.id, "Team exists, skipping create");
            return Ok(Resolution::found(existing.id));
        }

        let team = self
            .directory
            .create_team(blueprint)
            .await
            .map_err(|e| Error::resolve_team(name, e))?;
        info!(team = name, team_id = %team.id, product = %blueprint.product, "Team created");

        if blueprint.product == Product::Monitor {
            self.provision_dashboard(team.id, blueprint.namespaces.first().map(String::as_str))
                .await;
        }

        Ok(Resolution::created(team.id))
    }

    /// Find a user by email or create it with `role`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolve`] when the search or the create call fails.
    pub async fn resolve_user(&self, email: &str, role: TeamRole) -> Result<Resolution<UserId>> {
        let candidates = self
            .directory
            .find_users_by_email(email)
            .await
            .map_err(|e| Error::resolve_user(email, e))?;

        if let Some(existing) = first_exact_match(&candidates, email) {
            debug!(user = email, user_id = %existing.id, "User exists");
            return Ok(Resolution::found(existing.id));
        }

        let user = self
            .directory
            .create_user(email, role)
            .await
            .map_err(|e| Error::resolve_user(email, e))?;
        info!(user = email, user_id = %user.id, "User created");

        Ok(Resolution::created(user.id))
    }

    async fn provision_dashboard(&self, team_id: TeamId, namespace: Option<&str>) {
        let Some(namespace) = namespace else {
            debug!(team_id = %team_id, "No namespace to scope a dashboard to");
            return;
        };

        match self.directory.provision_dashboard(team_id, namespace).await {
            Ok(()) => info!(team_id = %team_id, namespace, "Dashboard provisioned"),
            Err(e) => {
                warn!(team_id = %team_id, namespace, error = %e, "Dashboard provisioning failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamsync_directory::{DirectoryCall, FailPoint, InMemoryDirectory};

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn monitor_team(name: &str) -> NewTeam {
        NewTeam::new(name, "", Product::Monitor, vec!["proj-tools".to_string()])
    }

    #[tokio::test]
    async fn test_existing_team_is_reused() -> TestResult {
        let directory = InMemoryDirectory::new();
        directory.seed_team("proj-team-secure").await;
        let existing = directory.seed_team("PROJ-TEAM").await;

        let resolution = EntityResolver::new(&directory)
            .resolve_team(&monitor_team("proj-team"))
            .await?;

        assert_eq!(resolution, Resolution::found(existing));
        assert_eq!(directory.count("create_team").await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_substring_match_is_not_reused() -> TestResult {
        let directory = InMemoryDirectory::new();
        directory.seed_team("proj-team-secure").await;

        let resolution = EntityResolver::new(&directory)
            .resolve_team(&monitor_team("proj-team"))
            .await?;

        assert!(resolution.created);
        assert_eq!(directory.teams().await.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_new_monitor_team_gets_dashboard() -> TestResult {
        let directory = InMemoryDirectory::new();

        let resolution = EntityResolver::new(&directory)
            .resolve_team(&monitor_team("proj-team"))
            .await?;

        let calls = directory.calls().await;
        assert!(calls.contains(&DirectoryCall::ProvisionDashboard {
            team_id: resolution.id,
            namespace: "proj-tools".to_string(),
        }));
        Ok(())
    }

    #[tokio::test]
    async fn test_secure_team_gets_no_dashboard() -> TestResult {
        let directory = InMemoryDirectory::new();
        let team = NewTeam::new(
            "proj-team-secure",
            "",
            Product::Secure,
            vec!["proj-tools".to_string()],
        );

        EntityResolver::new(&directory).resolve_team(&team).await?;

        assert_eq!(directory.count("provision_dashboard").await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_failure_does_not_fail_resolution() -> TestResult {
        let directory = InMemoryDirectory::new();
        directory.fail(FailPoint::Operation("provision_dashboard")).await;

        let resolution = EntityResolver::new(&directory)
            .resolve_team(&monitor_team("proj-team"))
            .await?;

        assert!(resolution.created);
        Ok(())
    }

    #[tokio::test]
    async fn test_user_lookup_ignores_case() -> TestResult {
        let directory = InMemoryDirectory::new();
        let existing = directory.seed_user("A@X.com").await;

        let resolution = EntityResolver::new(&directory)
            .resolve_user("a@x.com", TeamRole::Edit)
            .await?;

        assert_eq!(resolution, Resolution::found(existing));
        assert_eq!(directory.count("create_user").await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_failure_is_tagged() -> TestResult {
        let directory = InMemoryDirectory::new();
        directory.fail(FailPoint::Operation("create_user")).await;

        let result = EntityResolver::new(&directory)
            .resolve_user("a@x.com", TeamRole::Edit)
            .await;

        let Err(Error::Resolve { key, source, .. }) = result else {
            return Err("expected a resolve error".into());
        };
        assert_eq!(key, "a@x.com");
        assert_eq!(source.status_code(), Some(503));
        Ok(())
    }

    #[test]
    fn test_first_exact_match_takes_first() {
        let user = |id, email: &str| RemoteUser {
            id: UserId(id),
            email: email.to_string(),
        };
        let candidates = vec![user(1, "a@x.com.au"), user(2, "A@x.com"), user(3, "a@X.COM")];

        let matched = first_exact_match(&candidates, "a@x.com").map(|u| u.id);
        assert_eq!(matched, Some(UserId(2)));
    }
}
