//! Local configuration file for one-shot syncs.
//!
//! ```yaml
//! sysdig_api_endpoint: https://api.example.com
//! sysdig_token: ...
//! team:
//!   description: Project team
//!   users:
//!     - name: a@x.com
//!       role: EDIT
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use teamsync_directory::DirectoryConfig;
use teamsync_reconciler::TeamSpec;

/// Directory settings plus an optional declared team.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(flatten)]
    pub directory: DirectoryConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamSpec>,
}

impl LocalConfig {
    /// Load from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> teamsync_core::Result<Self> {
        teamsync_core::read_yaml(path)
    }

    /// Directory settings, with empty fields filled from the environment.
    pub fn directory_with_env(&self) -> DirectoryConfig {
        self.directory.clone().or(DirectoryConfig::from_env())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parses_local_layout() -> Result<(), Box<dyn std::error::Error>> {
        let config: LocalConfig = teamsync_core::parse_yaml(
            r"
sysdig_api_endpoint: https://api.example.com
sysdig_token: secret
team:
  description: Project team
  users:
    - name: a@x.com
      role: EDIT
",
        )?;

        assert!(config.directory.credentials.is_complete());
        assert_eq!(config.directory.timeout, Duration::from_secs(10));
        let team = config.team.ok_or("team block missing")?;
        assert_eq!(team.description, "Project team");
        assert_eq!(team.users.len(), 1);
        Ok(())
    }

    #[test]
    fn test_team_block_is_optional() -> Result<(), Box<dyn std::error::Error>> {
        let config: LocalConfig = teamsync_core::parse_yaml("sysdig_token: secret\n")?;
        assert!(config.team.is_none());
        assert!(!config.directory.credentials.is_complete());
        Ok(())
    }
}
