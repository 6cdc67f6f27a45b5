#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # teamsync-directory
//!
//! Access to the remote identity directory that owns teams, users and team
//! memberships.
//!
//! The [`Directory`] trait is the capability the reconciler consumes. Two
//! implementations ship with the crate:
//!
//! - [`DirectoryClient`]: talks to the platform REST API over HTTPS with a
//!   bearer token.
//! - [`InMemoryDirectory`]: keeps everything in memory and records every call,
//!   for tests and dry runs.
//!
//! ## Example
//!
//! ```ignore
//! use teamsync_directory::{Credentials, Directory, DirectoryClient, DirectoryConfig};
//!
//! let config = DirectoryConfig::new(Credentials::new("https://api.example.com", token));
//! let client = DirectoryClient::new(config)?;
//!
//! let teams = client.find_teams_by_name("proj-team").await?;
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod memory;
pub mod models;

pub use api::Directory;
pub use client::DirectoryClient;
pub use config::{Credentials, DirectoryConfig};
pub use error::{Error, Result};
pub use memory::{DirectoryCall, FailPoint, InMemoryDirectory};
pub use models::{
    MemberRole, Membership, NewTeam, ParseRoleError, Product, RemoteTeam, RemoteUser, TeamId, TeamRole,
    UserId,
};
