//! Artifact transport abstraction and the local, directory-backed repository.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use galley_core::feature_pack_spec::{FeaturePackSpec, FEATURE_PACK_FILE};
use galley_util::errors::{GalleyError, GalleyResult};

/// Coordinates of one artifact build: `group:artifact:version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactCoords {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

impl ArtifactCoords {
    pub fn new(group: &str, artifact: &str, version: &str) -> Self {
        Self {
            group: group.to_string(),
            artifact: artifact.to_string(),
            version: version.to_string(),
        }
    }

    /// Parse `group:artifact[:version]`; the version may be left open.
    pub fn parse(s: &str) -> GalleyResult<(String, String, Option<String>)> {
        let parts: Vec<&str> = s.split(':').collect();
        let invalid = || GalleyError::LocationFormat {
            input: s.to_string(),
            reason: "expected group:artifact[:version]".to_string(),
        };
        match parts.as_slice() {
            [g, a] if !g.is_empty() && !a.is_empty() => Ok((g.to_string(), a.to_string(), None)),
            [g, a, v] if !g.is_empty() && !a.is_empty() && !v.is_empty() => {
                Ok((g.to_string(), a.to_string(), Some(v.to_string())))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for ArtifactCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

/// Fetches artifacts to a local path and lists the builds available.
///
/// Calls are blocking. Retrying and timeouts are the implementation's concern.
pub trait ArtifactTransport: Send + Sync {
    /// Local directory holding the contents of the artifact.
    fn resolve(&self, coords: &ArtifactCoords) -> GalleyResult<PathBuf>;

    /// Every version of `group:artifact` the transport knows about, in no particular order.
    fn versions(&self, group: &str, artifact: &str) -> GalleyResult<Vec<String>>;
}

/// A repository on the local filesystem using the Maven directory layout.
#[derive(Debug, Clone)]
pub struct ArtifactRepository {
    pub name: String,
    root: PathBuf,
}

impl ArtifactRepository {
    pub fn new(name: &str, root: &Path) -> Self {
        Self {
            name: name.to_string(),
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Standard layout path for a given coordinate.
    ///
    /// `org.example:fp1:1.0.0.Final` becomes `org/example/fp1/1.0.0.Final`
    pub fn coordinate_path(group: &str, artifact: &str, version: &str) -> String {
        format!("{}/{}/{}", group.replace('.', "/"), artifact, version)
    }

    pub fn artifact_dir(&self, coords: &ArtifactCoords) -> PathBuf {
        self.root.join(Self::coordinate_path(
            &coords.group,
            &coords.artifact,
            &coords.version,
        ))
    }

    /// Store a file in the artifact directory, creating directories as needed.
    pub fn put(&self, coords: &ArtifactCoords, filename: &str, data: &[u8]) -> GalleyResult<PathBuf> {
        let dir = self.artifact_dir(coords);
        fs::create_dir_all(&dir)?;
        let path = dir.join(filename);
        fs::write(&path, data)?;
        Ok(path)
    }

    /// Install feature-pack metadata as the artifact `coords`.
    pub fn put_feature_pack(
        &self,
        coords: &ArtifactCoords,
        spec: &FeaturePackSpec,
    ) -> GalleyResult<PathBuf> {
        let text = spec.to_toml()?;
        self.put(coords, FEATURE_PACK_FILE, text.as_bytes())?;
        Ok(self.artifact_dir(coords))
    }
}

impl ArtifactTransport for ArtifactRepository {
    fn resolve(&self, coords: &ArtifactCoords) -> GalleyResult<PathBuf> {
        let dir = self.artifact_dir(coords);
        if dir.is_dir() {
            tracing::debug!("Resolved {coords} to {}", dir.display());
            Ok(dir)
        } else {
            Err(GalleyError::UnresolvableArtifact {
                artifact: coords.to_string(),
                reason: format!(
                    "not found in repository '{}' ({})",
                    self.name,
                    self.root.display()
                ),
            })
        }
    }

    fn versions(&self, group: &str, artifact: &str) -> GalleyResult<Vec<String>> {
        let dir = self.root.join(group.replace('.', "/")).join(artifact);
        galley_util::fs::list_subdirs(&dir)
    }
}
