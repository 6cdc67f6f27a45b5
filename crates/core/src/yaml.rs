//! YAML document loading.

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::Error;
use crate::result::Result;

/// Parse a YAML document into `T`.
pub fn parse_yaml<T: DeserializeOwned>(content: &str) -> Result<T> {
    serde_yaml::from_str(content).map_err(|e| Error::yaml_parse_failed(e.to_string()))
}

/// Read and parse a YAML file into `T`.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!(path = %path.display(), "Reading YAML document");
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::file_read_failed(path, e.to_string()))?;
    parse_yaml(&content).map_err(|e| match e {
        Error::YamlParseFailed { reason } => {
            Error::yaml_parse_failed(format!("{}: {reason}", path.display()))
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        #[serde(default)]
        roles: Vec<String>,
    }

    #[test]
    fn test_parse_yaml() {
        let parsed: Result<Sample> = parse_yaml("name: alpha\nroles: [a, b]\n");
        assert_eq!(
            parsed.ok(),
            Some(Sample {
                name: "alpha".to_string(),
                roles: vec!["a".to_string(), "b".to_string()],
            })
        );
    }

    #[test]
    fn test_parse_yaml_rejects_malformed() {
        let parsed: Result<Sample> = parse_yaml("name: [unterminated");
        assert!(matches!(parsed, Err(Error::YamlParseFailed { .. })));
    }

    #[test]
    fn test_read_yaml_missing_file() {
        let parsed: Result<Sample> = read_yaml(Path::new("/nonexistent/teamsync.yaml"));
        assert!(matches!(parsed, Err(Error::FileReadFailed { .. })));
    }

    #[test]
    fn test_read_yaml_reports_path_on_parse_error()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "name: [broken")?;

        let parsed: Result<Sample> = read_yaml(file.path());
        let message = parsed.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains(&file.path().display().to_string()));
        Ok(())
    }
}
