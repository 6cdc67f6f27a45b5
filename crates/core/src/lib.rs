#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! Shared building blocks for the teamsync crates.
//!
//! Holds the error type used when loading configuration and manifests from
//! disk, the crate-wide `Result` alias, and tap combinators used by best-effort
//! code paths.

pub mod error;
pub mod result;
pub mod yaml;

pub use error::Error;
pub use result::{GenericResultExt, Result};
pub use yaml::{parse_yaml, read_yaml};
