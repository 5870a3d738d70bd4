//! Artifact store capability.
//!
//! The cleaner only ever talks to an [`ArtifactStore`]: it resolves and
//! downloads one input, then creates, fills and registers one output.
//! [`LocalArtifactStore`] keeps versioned artifacts on the filesystem.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod local;

pub use local::{LocalArtifactStore, Manifest, ManifestFile};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("artifact '{reference}' not found: {reason}")]
    NotFound { reference: String, reason: String },

    #[error("invalid artifact reference '{0}'")]
    InvalidReference(String),

    #[error("store rejected artifact '{name}': {reason}")]
    Rejected { name: String, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Latest,
    Number(u32),
}

/// `name[:version]`, where version is `latest`, `vN` or `N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub name: String,
    pub version: Version,
}

/// Artifact names become directory names, so path syntax is refused.
pub fn validate_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with('.')
        && !name.contains(['/', '\\', ':'])
}

impl FromStr for ArtifactRef {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StoreError::InvalidReference(s.to_string());
        let (name, version) = match s.rsplit_once(':') {
            None => (s, Version::Latest),
            Some((name, "latest")) => (name, Version::Latest),
            Some((name, tag)) => {
                let digits = tag.strip_prefix('v').unwrap_or(tag);
                let n = digits.parse::<u32>().map_err(|_| invalid())?;
                (name, Version::Number(n))
            }
        };
        if !validate_name(name) {
            return Err(invalid());
        }
        Ok(ArtifactRef {
            name: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Version::Latest => write!(f, "{}:latest", self.name),
            Version::Number(n) => write!(f, "{}:v{n}", self.name),
        }
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// A file attached to a pending artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    /// Name the file will have inside the artifact.
    pub name: String,
    pub source: PathBuf,
    /// Hex sha256 of the content at attach time.
    pub digest: String,
    pub size: u64,
}

/// An artifact being assembled; nothing is visible in the store until
/// [`ArtifactStore::register`] succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingArtifact {
    pub name: String,
    pub kind: String,
    pub description: String,
    pub files: Vec<AttachedFile>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// References of the artifacts this one was derived from.
    pub derived_from: Vec<String>,
}

impl PendingArtifact {
    pub fn new(name: &str, kind: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            description: description.to_string(),
            files: Vec::new(),
            metadata: BTreeMap::new(),
            derived_from: Vec::new(),
        }
    }

    pub fn set_metadata(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }
}

/// A registered, immutable artifact version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedArtifact {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: u32,
    pub digest: String,
}

impl fmt::Display for LoggedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:v{}", self.name, self.version)
    }
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// What a pipeline step needs from an artifact store.
pub trait ArtifactStore {
    /// Resolve `reference` to exactly one file and make it available locally.
    fn resolve_and_download(&mut self, reference: &str) -> Result<PathBuf, StoreError>;

    /// Start a new, empty artifact.
    fn create_artifact(
        &self,
        name: &str,
        kind: &str,
        description: &str,
    ) -> Result<PendingArtifact, StoreError>;

    /// Add a local file to a pending artifact.
    fn attach_file(&self, artifact: &mut PendingArtifact, path: &Path) -> Result<(), StoreError>;

    /// Publish the artifact as a new immutable version.
    fn register(&mut self, artifact: PendingArtifact) -> Result<LoggedArtifact, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reference_versions() {
        let r: ArtifactRef = "sample.csv:latest".parse().unwrap();
        assert_eq!(r.name, "sample.csv");
        assert_eq!(r.version, Version::Latest);

        let r: ArtifactRef = "sample.csv".parse().unwrap();
        assert_eq!(r.version, Version::Latest);

        let r: ArtifactRef = "sample.csv:v3".parse().unwrap();
        assert_eq!(r.version, Version::Number(3));
        assert_eq!(r.to_string(), "sample.csv:v3");

        let r: ArtifactRef = "sample.csv:7".parse().unwrap();
        assert_eq!(r.version, Version::Number(7));
    }

    #[test]
    fn reject_bad_references() {
        for bad in ["", ":v1", "a:beta", "../etc:v0", ".hidden", "a/b"] {
            assert!(
                matches!(bad.parse::<ArtifactRef>(), Err(StoreError::InvalidReference(_))),
                "{bad} should be rejected"
            );
        }
    }
}
