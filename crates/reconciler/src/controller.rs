//! Per-resource reconciliation.
//!
//! [`Controller::reconcile`] is the single entry point. Each call walks one
//! resource through the cycle below, performing every remote call in order:
//!
//! 1. Fetch the resource; a missing resource is done.
//! 2. Deleting: drop finalizers, then delete the recorded remote teams.
//! 3. Attach the finalizer and ask for an immediate re-run.
//! 4. Check credentials and the namespace.
//! 5. Resolve declared users, then both teams, then both membership sets.
//! 6. Report `Ready`.
//!
//! Status writes are full overwrites. Two concurrent cycles for the same
//! resource race on status and the last write wins.

use std::sync::Arc;
use std::time::Duration;

use teamsync_core::GenericResultExt;
use teamsync_directory::{Credentials, Directory, NewTeam, Product, TeamId, TeamRole, UserId};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::facts::{self, DerivedFacts};
use crate::membership::reconcile_memberships;
use crate::resolver::EntityResolver;
use crate::resource::{
    Condition, DeclaredTeamResource, FINALIZER, LEGACY_FINALIZER, REASON_MEMBERSHIP_SYNC_FAILED,
    REASON_TEAM_SYNC_FAILED, REASON_USER_SYNC_FAILED, ReconcileStatus, ResourceKey, UserSpec,
};
use crate::store::ResourceStore;

/// Products synced for every resource, in order.
pub const PRODUCTS: [Product; 2] = [Product::Monitor, Product::Secure];

/// Where a reconcile cycle stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The resource no longer exists.
    Gone,
    /// Finalizers were released and remote cleanup attempted.
    Finalized,
    /// The finalizer was attached; the rest happens on the next cycle.
    FinalizerAttached,
    /// The resource lives outside a tools namespace.
    InvalidNamespace,
    /// Teams and memberships were brought in sync.
    Reconciled,
}

/// Result of a successful reconcile cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub completion: Completion,
    /// Run again after this delay; zero means immediately.
    pub requeue_after: Option<Duration>,
}

impl ReconcileOutcome {
    const fn done(completion: Completion) -> Self {
        Self {
            completion,
            requeue_after: None,
        }
    }

    const fn requeue_now(completion: Completion) -> Self {
        Self {
            completion,
            requeue_after: Some(Duration::ZERO),
        }
    }

    /// Whether the caller should run the cycle again.
    pub const fn should_requeue(&self) -> bool {
        self.requeue_after.is_some()
    }
}

/// Drives declared resources towards their remote state.
pub struct Controller {
    store: Arc<dyn ResourceStore>,
    directory: Arc<dyn Directory>,
    credentials: Credentials,
}

impl Controller {
    /// Create a controller.
    pub fn new(
        store: Arc<dyn ResourceStore>,
        directory: Arc<dyn Directory>,
        credentials: Credentials,
    ) -> Self {
        Self {
            store,
            directory,
            credentials,
        }
    }

    /// The store this controller reads resources from.
    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// Run one reconcile cycle for `key`.
    ///
    /// Safe to call redundantly: a converged resource produces no remote
    /// mutations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredentials`] when endpoint or token are
    /// unset, and resolution, membership fetch and store errors as they
    /// occur. Failures are also written to the resource status.
    pub async fn reconcile(&self, key: &ResourceKey) -> Result<ReconcileOutcome> {
        let Some(resource) = self.store.get(key).await? else {
            debug!(resource = %key, "Resource gone, nothing to do");
            return Ok(ReconcileOutcome::done(Completion::Gone));
        };

        if resource.is_deleting() {
            return self.finalize(&resource).await;
        }

        if !resource.has_finalizer(FINALIZER) {
            let mut finalizers = resource.finalizers.clone();
            finalizers.insert(FINALIZER.to_string());
            self.store.update_finalizers(key, finalizers).await?;
            info!(resource = %key, "Finalizer attached");
            return Ok(ReconcileOutcome::requeue_now(Completion::FinalizerAttached));
        }

        let mut status = resource.status.clone();

        if !self.credentials.is_complete() {
            status.report(Condition::missing_credentials());
            self.write_status_best_effort(key, &status).await;
            warn!(resource = %key, "Directory credentials missing");
            return Err(Error::MissingCredentials);
        }

        if !facts::is_tools_namespace(&key.namespace) {
            status.report(Condition::invalid_namespace());
            self.store.update_status(key, status).await?;
            warn!(resource = %key, "Resource outside a tools namespace");
            return Ok(ReconcileOutcome::done(Completion::InvalidNamespace));
        }

        let derived = facts::derive(&key.namespace);
        self.sync(&resource, &derived, status).await
    }

    async fn sync(
        &self,
        resource: &DeclaredTeamResource,
        derived: &DerivedFacts,
        mut status: ReconcileStatus,
    ) -> Result<ReconcileOutcome> {
        let key = &resource.key;
        let resolver = EntityResolver::new(self.directory.as_ref());

        let desired = match self.resolve_users(&resolver, &resource.team.users).await {
            Ok(desired) => desired,
            Err(e) => {
                status.report(Condition::not_ready(REASON_USER_SYNC_FAILED, e.to_string()));
                self.write_status_best_effort(key, &status).await;
                return Err(e);
            }
        };

        let mut team_ids: Vec<(Product, TeamId)> = Vec::with_capacity(PRODUCTS.len());
        for product in PRODUCTS {
            let blueprint = NewTeam::new(
                derived.team_name(product),
                resource.team.description.clone(),
                product,
                derived.namespaces.clone(),
            );

            match resolver.resolve_team(&blueprint).await {
                Ok(resolution) => {
                    status.set_team_id(product, resolution.id);
                    self.store.update_status(key, status.clone()).await?;
                    team_ids.push((product, resolution.id));
                }
                Err(e) => {
                    status.report(Condition::not_ready(REASON_TEAM_SYNC_FAILED, e.to_string()));
                    self.write_status_best_effort(key, &status).await;
                    return Err(e);
                }
            }
        }

        for (product, team_id) in team_ids {
            match reconcile_memberships(self.directory.as_ref(), team_id, &desired).await {
                Ok(report) if !report.all_succeeded() => {
                    warn!(
                        resource = %key,
                        product = %product,
                        team_id = %team_id,
                        failed = report.failed.len(),
                        "Some memberships could not be changed, retrying next cycle"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    status.report(Condition::not_ready(
                        REASON_MEMBERSHIP_SYNC_FAILED,
                        e.to_string(),
                    ));
                    self.write_status_best_effort(key, &status).await;
                    return Err(e);
                }
            }
        }

        status.report(Condition::ready());
        self.store.update_status(key, status).await?;
        info!(resource = %key, users = desired.len(), "Resource reconciled");

        Ok(ReconcileOutcome::done(Completion::Reconciled))
    }

    async fn resolve_users(
        &self,
        resolver: &EntityResolver<'_>,
        users: &[UserSpec],
    ) -> Result<Vec<(UserId, TeamRole)>> {
        let mut desired = Vec::with_capacity(users.len());
        for user in users {
            let role: TeamRole = user.role.parse().map_err(|source| Error::InvalidRole {
                user: user.name.clone(),
                source,
            })?;
            let resolution = resolver.resolve_user(&user.name, role).await?;
            desired.push((resolution.id, role));
        }
        Ok(desired)
    }

    async fn finalize(&self, resource: &DeclaredTeamResource) -> Result<ReconcileOutcome> {
        let key = &resource.key;
        let mut finalizers = resource.finalizers.clone();
        let had_legacy = finalizers.remove(LEGACY_FINALIZER);
        let had_current = finalizers.remove(FINALIZER);

        if had_legacy || had_current {
            self.store.update_finalizers(key, finalizers).await?;
        }

        if !had_current {
            debug!(resource = %key, "No finalizer of ours, skipping remote cleanup");
            return Ok(ReconcileOutcome::done(Completion::Finalized));
        }

        for (product, team_id) in resource.status.team_ids() {
            let _ = self
                .directory
                .delete_team(team_id)
                .await
                .tap_ok(|()| info!(product = %product, team_id = %team_id, "Team deleted"))
                .tap_err(|e| {
                    warn!(product = %product, team_id = %team_id, error = %e, "Team delete failed");
                });
        }

        Ok(ReconcileOutcome::done(Completion::Finalized))
    }

    async fn write_status_best_effort(&self, key: &ResourceKey, status: &ReconcileStatus) {
        if let Err(e) = self.store.update_status(key, status.clone()).await {
            warn!(resource = %key, error = %e, "Status update failed");
        }
    }
}
