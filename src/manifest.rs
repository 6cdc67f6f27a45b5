//! Declared resources loaded from YAML manifests.
//!
//! ```yaml
//! metadata:
//!   name: team
//!   namespace: proj-tools
//! spec:
//!   team:
//!     description: Project team
//!     users:
//!       - name: a@x.com
//!         role: EDIT
//! ```

use std::path::Path;

use serde::Deserialize;
use teamsync_core::Error;
use teamsync_reconciler::{DeclaredTeamResource, ResourceKey, TeamSpec};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Metadata {
    name: String,
    namespace: String,
}

#[derive(Debug, Deserialize)]
struct ManifestSpec {
    #[serde(default)]
    team: TeamSpec,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    metadata: Metadata,
    spec: ManifestSpec,
}

impl Manifest {
    fn into_resource(self) -> teamsync_core::Result<DeclaredTeamResource> {
        if self.metadata.name.trim().is_empty() || self.metadata.namespace.trim().is_empty() {
            return Err(Error::invalid_document(
                "metadata.name and metadata.namespace are required",
            ));
        }
        Ok(DeclaredTeamResource::new(
            ResourceKey::new(self.metadata.namespace, self.metadata.name),
            self.spec.team,
        ))
    }
}

/// Parse a single manifest.
///
/// # Errors
///
/// Returns an error if the document is not a valid manifest.
pub fn parse_manifest(content: &str) -> teamsync_core::Result<DeclaredTeamResource> {
    teamsync_core::parse_yaml::<Manifest>(content)?.into_resource()
}

/// Load every `*.yaml` and `*.yml` manifest in `dir`, sorted by file name.
///
/// # Errors
///
/// Returns an error if the directory is missing, an entry cannot be read, or
/// any manifest is invalid.
pub fn load_manifests(dir: &Path) -> teamsync_core::Result<Vec<DeclaredTeamResource>> {
    if !dir.is_dir() {
        return Err(Error::directory_not_found(dir));
    }

    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut paths = Vec::new();
    for extension in ["yaml", "yml"] {
        let matches = glob::glob(&format!("{base}/*.{extension}"))
            .map_err(|e| Error::invalid_document(e.to_string()))?;
        for entry in matches {
            let path = entry.map_err(|e| Error::file_read_failed(e.path(), e.error().to_string()))?;
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .iter()
        .map(|path| {
            debug!(path = %path.display(), "Loading manifest");
            teamsync_core::read_yaml::<Manifest>(path)?
                .into_resource()
                .map_err(|e| Error::invalid_document(format!("{}: {e}", path.display())))
        })
        .collect()
}
