use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{
    validate_name, ArtifactRef, ArtifactStore, AttachedFile, LoggedArtifact, PendingArtifact,
    StoreError, Version,
};

const MANIFEST_FILE: &str = "manifest.json";

/// Environment variable naming the store root.
pub const STORE_DIR_ENV: &str = "ARTIFACT_STORE_DIR";
/// Environment variable naming where downloaded artifacts land.
pub const DOWNLOAD_DIR_ENV: &str = "ARTIFACT_DOWNLOAD_DIR";

// ---------------------------------------------------------------------------
// Manifest – metadata stored next to each version's files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub name: String,
    pub digest: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: u32,
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Digest over all file digests; equal content gives an equal digest.
    pub digest: String,
    pub files: Vec<ManifestFile>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub derived_from: Vec<String>,
}

impl Manifest {
    fn logged(&self) -> LoggedArtifact {
        LoggedArtifact {
            name: self.name.clone(),
            kind: self.kind.clone(),
            version: self.version,
            digest: self.digest.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// LocalArtifactStore
// ---------------------------------------------------------------------------

/// Versioned artifacts under a root directory:
///
/// ```text
/// <root>/<name>/v0/manifest.json
/// <root>/<name>/v0/<file>
/// <root>/<name>/v1/...
/// ```
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
    download_dir: PathBuf,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn sha256_file(path: &Path) -> Result<(String, u64), std::io::Error> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok((hex::encode(hasher.finalize()), size))
}

fn aggregate_digest<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut entries: Vec<_> = files.into_iter().collect();
    entries.sort();
    let mut hasher = Sha256::new();
    for (name, digest) in entries {
        hasher.update(name.as_bytes());
        hasher.update(b":");
        hasher.update(digest.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            download_dir: download_dir.into(),
        }
    }

    /// Build from `ARTIFACT_STORE_DIR` / `ARTIFACT_DOWNLOAD_DIR`, defaulting to
    /// `./artifact_store` and `./artifacts`.
    pub fn from_env() -> Self {
        let root = std::env::var_os(STORE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("artifact_store"));
        let download_dir = std::env::var_os(DOWNLOAD_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("artifacts"));
        Self::new(root, download_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Version numbers present for `name`, ascending.
    pub fn versions(&self, name: &str) -> Result<Vec<u32>, StoreError> {
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut versions: Vec<u32> = fs::read_dir(&dir)
            .map_err(io_err(&dir))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let file_name = entry.file_name();
                file_name.to_str()?.strip_prefix('v')?.parse::<u32>().ok()
            })
            .collect();
        versions.sort_unstable();
        Ok(versions)
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.root.join(name).join(format!("v{version}"))
    }

    /// Read the manifest of one version.
    pub fn manifest(&self, name: &str, version: u32) -> Result<Manifest, StoreError> {
        let path = self.version_dir(name, version).join(MANIFEST_FILE);
        let text = fs::read_to_string(&path).map_err(|e| StoreError::NotFound {
            reference: format!("{name}:v{version}"),
            reason: format!("reading {}: {e}", path.display()),
        })?;
        serde_json::from_str(&text).map_err(|e| StoreError::NotFound {
            reference: format!("{name}:v{version}"),
            reason: format!("corrupt manifest {}: {e}", path.display()),
        })
    }

    fn resolve(&self, reference: &ArtifactRef) -> Result<Manifest, StoreError> {
        let not_found = |reason: String| StoreError::NotFound {
            reference: reference.to_string(),
            reason,
        };
        let versions = self.versions(&reference.name)?;
        let version = match reference.version {
            Version::Latest => *versions
                .last()
                .ok_or_else(|| not_found("no versions logged".to_string()))?,
            Version::Number(n) if versions.contains(&n) => n,
            Version::Number(n) => return Err(not_found(format!("version v{n} does not exist"))),
        };
        self.manifest(&reference.name, version)
    }

    fn write_version(&self, dir: &Path, artifact: &PendingArtifact, manifest: &Manifest) -> Result<(), StoreError> {
        fs::create_dir_all(dir).map_err(io_err(dir))?;
        for file in &artifact.files {
            let target = dir.join(&file.name);
            fs::copy(&file.source, &target).map_err(io_err(&file.source))?;
            let (digest, _) = sha256_file(&target).map_err(io_err(&target))?;
            if digest != file.digest {
                return Err(StoreError::Rejected {
                    name: artifact.name.clone(),
                    reason: format!("{} changed after it was attached", file.source.display()),
                });
            }
        }
        let manifest_path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(manifest).map_err(|e| StoreError::Rejected {
            name: artifact.name.clone(),
            reason: format!("serialising manifest: {e}"),
        })?;
        fs::write(&manifest_path, json).map_err(io_err(&manifest_path))
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn resolve_and_download(&mut self, reference: &str) -> Result<PathBuf, StoreError> {
        let reference: ArtifactRef = reference.parse()?;
        let manifest = self.resolve(&reference)?;

        let [file] = manifest.files.as_slice() else {
            return Err(StoreError::NotFound {
                reference: reference.to_string(),
                reason: format!("expected exactly one file, found {}", manifest.files.len()),
            });
        };

        let source = self.version_dir(&manifest.name, manifest.version).join(&file.name);
        let target_dir = self
            .download_dir
            .join(format!("{}-v{}", manifest.name, manifest.version));
        fs::create_dir_all(&target_dir).map_err(io_err(&target_dir))?;
        let target = target_dir.join(&file.name);
        fs::copy(&source, &target).map_err(|e| StoreError::NotFound {
            reference: reference.to_string(),
            reason: format!("reading {}: {e}", source.display()),
        })?;

        let (digest, _) = sha256_file(&target).map_err(io_err(&target))?;
        if digest != file.digest {
            return Err(StoreError::NotFound {
                reference: reference.to_string(),
                reason: format!("digest mismatch for {}", file.name),
            });
        }

        debug!("Downloaded {}:v{} to {}", manifest.name, manifest.version, target.display());
        Ok(target)
    }

    fn create_artifact(
        &self,
        name: &str,
        kind: &str,
        description: &str,
    ) -> Result<PendingArtifact, StoreError> {
        if !validate_name(name) {
            return Err(StoreError::Rejected {
                name: name.to_string(),
                reason: "artifact name must not contain path separators or ':'".to_string(),
            });
        }
        if kind.is_empty() {
            return Err(StoreError::Rejected {
                name: name.to_string(),
                reason: "artifact type must not be empty".to_string(),
            });
        }
        Ok(PendingArtifact::new(name, kind, description))
    }

    fn attach_file(&self, artifact: &mut PendingArtifact, path: &Path) -> Result<(), StoreError> {
        let rejected = |reason: String| StoreError::Rejected {
            name: artifact.name.clone(),
            reason,
        };
        if !path.is_file() {
            return Err(rejected(format!("{} is not a regular file", path.display())));
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| rejected(format!("{} has no usable file name", path.display())))?;
        if file_name == MANIFEST_FILE || artifact.files.iter().any(|f| f.name == file_name) {
            return Err(rejected(format!("a file named {file_name} is already attached")));
        }
        let (digest, size) =
            sha256_file(path).map_err(|e| rejected(format!("reading {}: {e}", path.display())))?;
        artifact.files.push(AttachedFile {
            name: file_name,
            source: path.to_path_buf(),
            digest,
            size,
        });
        Ok(())
    }

    fn register(&mut self, artifact: PendingArtifact) -> Result<LoggedArtifact, StoreError> {
        let rejected = |reason: String| StoreError::Rejected {
            name: artifact.name.clone(),
            reason,
        };
        if artifact.files.is_empty() {
            return Err(rejected("no files attached".to_string()));
        }

        let digest = aggregate_digest(
            artifact
                .files
                .iter()
                .map(|f| (f.name.as_str(), f.digest.as_str())),
        );

        let versions = self.versions(&artifact.name).map_err(|e| rejected(e.to_string()))?;
        if let Some(&latest) = versions.last() {
            let previous = self
                .manifest(&artifact.name, latest)
                .map_err(|e| rejected(e.to_string()))?;
            if previous.kind != artifact.kind {
                return Err(rejected(format!(
                    "type '{}' does not match existing type '{}'",
                    artifact.kind, previous.kind
                )));
            }
            if previous.digest == digest {
                info!("Content unchanged, reusing {}", previous.logged());
                return Ok(previous.logged());
            }
        }
        let version = versions.last().map_or(0, |v| v + 1);

        let manifest = Manifest {
            name: artifact.name.clone(),
            kind: artifact.kind.clone(),
            version,
            description: artifact.description.clone(),
            created_at: Utc::now(),
            digest,
            files: artifact
                .files
                .iter()
                .map(|f| ManifestFile {
                    name: f.name.clone(),
                    digest: f.digest.clone(),
                    size: f.size,
                })
                .collect(),
            metadata: artifact.metadata.clone(),
            derived_from: artifact.derived_from.clone(),
        };

        // Stage then rename, so a failure never leaves a half-written version.
        let staging = self
            .root
            .join(&artifact.name)
            .join(format!(".staging-v{version}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&staging);
        if let Err(e) = self.write_version(&staging, &artifact, &manifest) {
            let _ = fs::remove_dir_all(&staging);
            return Err(rejected(e.to_string()));
        }
        let final_dir = self.version_dir(&artifact.name, version);
        if let Err(e) = fs::rename(&staging, &final_dir) {
            let _ = fs::remove_dir_all(&staging);
            return Err(rejected(format!("publishing {}: {e}", final_dir.display())));
        }

        Ok(manifest.logged())
    }
}
