//! Reconciliation of declared teams against the remote directory.
//!
//! A declared team resource lives in a project's `-tools` namespace and
//! names the users that should belong to the project's teams. The
//! reconciler makes the directory match:
//!
//! - **Facts**: project namespaces and team names derived from the namespace
//! - **Resolver**: find-or-create for teams and users
//! - **Membership**: grant, change and revoke until each team matches
//! - **Controller**: the per-resource cycle, with finalizers and status
//! - **Loop**: periodic sweeps over every stored resource
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use teamsync_directory::{Credentials, InMemoryDirectory};
//! use teamsync_reconciler::{Controller, InMemoryResourceStore, LoopConfig, ReconciliationLoop};
//!
//! let store = InMemoryResourceStore::new_arc();
//! let directory = Arc::new(InMemoryDirectory::new());
//! let controller = Arc::new(Controller::new(store, directory, credentials));
//!
//! let mut loop_runner = ReconciliationLoop::new(controller, LoopConfig::default());
//! loop_runner.run().await?;
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod controller;
pub mod error;
pub mod facts;
pub mod r#loop;
pub mod membership;
pub mod resolver;
pub mod resource;
pub mod store;

// Re-export main types
pub use controller::{Completion, Controller, PRODUCTS, ReconcileOutcome};
pub use error::{EntityKind, Error, Result};
pub use facts::{DerivedFacts, derive, is_tools_namespace};
pub use r#loop::{LoopConfig, LoopStopper, ReconciliationLoop, SweepSummary};
pub use membership::{MembershipAction, MembershipPlan, MembershipReport, reconcile_memberships};
pub use resolver::{EntityResolver, Resolution};
pub use resource::{
    Condition, ConditionStatus, DeclaredTeamResource, FINALIZER, LEGACY_FINALIZER,
    ReconcileStatus, ResourceKey, TeamSpec, UserSpec,
};
pub use store::{InMemoryResourceStore, ResourceStore};
