#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # teamsync
//!
//! Keeps monitoring teams and their memberships in sync with declared team
//! resources.
//!
//! The binary wires the workspace crates together:
//!
//! - `teamsync-core`: errors and YAML loading
//! - `teamsync-directory`: the remote directory client
//! - `teamsync-reconciler`: derivation, resolution, membership sync and the
//!   per-resource controller

pub mod cli;
pub mod commands;
pub mod config;
pub mod manifest;
