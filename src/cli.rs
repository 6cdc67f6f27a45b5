//! CLI command definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// teamsync - keeps monitoring teams in sync with declared team resources
#[derive(Parser, Debug)]
#[command(name = "teamsync")]
#[command(version)]
#[command(about = "Keeps monitoring teams and memberships in sync with declared team resources")]
#[command(
    long_about = "teamsync derives project team names from a tools namespace, finds or creates the monitor and secure teams, and reconciles their memberships against the declared users."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the names derived from a namespace
    Derive {
        /// Namespace key, e.g. abc123-tools
        namespace: String,
    },

    /// Reconcile the team declared in a local config file once
    Sync {
        /// YAML config with credentials and a team block
        #[arg(short, long)]
        config: PathBuf,

        /// Namespace the team is declared in
        #[arg(short, long)]
        namespace: String,

        /// Resource name
        #[arg(long, default_value = "local")]
        name: String,
    },

    /// Reconcile every manifest in a directory until interrupted
    Run {
        /// Directory of YAML manifests
        #[arg(short, long)]
        manifests: PathBuf,

        /// Seconds between sweeps
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from([
            "teamsync",
            "sync",
            "--config",
            "local.yaml",
            "--namespace",
            "proj-tools",
        ])?;

        let Commands::Sync { name, namespace, .. } = cli.command else {
            return Err(clap::Error::new(clap::error::ErrorKind::InvalidSubcommand));
        };
        assert_eq!(name, "local");
        assert_eq!(namespace, "proj-tools");
        Ok(())
    }
}
