//! The lock mapping (`app -> pinned reference`) and its `Braid.lock` file.

use std::collections::BTreeMap;
use std::path::Path;

use braid_util::errors::BraidError;
use serde::{Deserialize, Serialize};

use crate::dependency::{GitRef, Source};

/// A pinned reference for one app. Opaque to the convergence engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    /// Source mechanism and location, e.g. `git+https://...` or `registry+default`.
    pub source: String,
    /// Commit, tag or version the source is pinned to.
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl LockEntry {
    /// Pin `source` at `reference`. Path sources are never locked.
    pub fn for_source(source: &Source, reference: Option<&str>, version: Option<&str>) -> Option<Self> {
        let (source, default_ref) = match source {
            Source::Git { url, reference } => {
                let r = match reference {
                    GitRef::Default => None,
                    GitRef::Branch(b) => Some(b.clone()),
                    GitRef::Tag(t) => Some(t.clone()),
                    GitRef::Rev(r) => Some(r.clone()),
                };
                (format!("git+{url}"), r)
            }
            Source::Registry { repo } => (format!("registry+{repo}"), None),
            Source::Path { .. } => return None,
        };
        let reference = reference
            .map(str::to_string)
            .or(default_ref)
            .or_else(|| version.map(str::to_string))?;
        Some(Self {
            source,
            reference,
            version: version.map(str::to_string),
            checksum: None,
        })
    }

    /// Whether this entry still pins `source`. A git entry also has to match
    /// an explicit ref.
    pub fn pins(&self, source: &Source) -> bool {
        match source {
            Source::Git { url, reference } => {
                let explicit = match reference {
                    GitRef::Default => None,
                    GitRef::Branch(r) | GitRef::Tag(r) | GitRef::Rev(r) => Some(r),
                };
                self.source == format!("git+{url}")
                    && explicit.map_or(true, |r| *r == self.reference)
            }
            Source::Registry { repo } => self.source == format!("registry+{repo}"),
            Source::Path { .. } => false,
        }
    }
}

/// Mapping from app name to its pinned reference.
///
/// Read once before convergence, threaded through it by value, and returned
/// (possibly rewritten) at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lock {
    entries: BTreeMap<String, LockEntry>,
}

impl Lock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, app: &str) -> Option<&LockEntry> {
        self.entries.get(app)
    }

    pub fn insert(&mut self, app: impl Into<String>, entry: LockEntry) -> Option<LockEntry> {
        self.entries.insert(app.into(), entry)
    }

    pub fn remove(&mut self, app: &str) -> Option<LockEntry> {
        self.entries.remove(app)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LockEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read the lock at `path`. A missing file is an empty lock.
    pub fn read(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::new());
        }
        Ok(Lockfile::from_path(path)?.into())
    }

    /// Write the lock to `path` as a `Braid.lock` file.
    pub fn write(&self, path: &Path) -> miette::Result<()> {
        let content = Lockfile::from(self)
            .to_string_pretty()
            .map_err(|e| BraidError::Lockfile {
                message: format!("Failed to serialize lockfile: {e}"),
            })?;
        braid_util::fs::write_atomic(path, &content).map_err(|e| {
            BraidError::Lockfile {
                message: format!("Failed to write {}: {e}", path.display()),
            }
            .into()
        })
    }
}

impl FromIterator<(String, LockEntry)> for Lock {
    fn from_iter<I: IntoIterator<Item = (String, LockEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// On-disk form of the lock mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(default)]
    pub package: Vec<LockedPackage>,
}

/// A single locked app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockedPackage {
    pub name: String,
    pub source: String,
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl Lockfile {
    /// Load and parse a `Braid.lock` file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BraidError::Lockfile {
            message: format!("Failed to read lockfile: {e}"),
        })?;
        toml::from_str(&content).map_err(|e| {
            BraidError::Lockfile {
                message: format!("Failed to parse lockfile: {e}"),
            }
            .into()
        })
    }

    /// Serialize the lockfile to a pretty-printed TOML string.
    pub fn to_string_pretty(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl From<Lockfile> for Lock {
    fn from(file: Lockfile) -> Self {
        file.package
            .into_iter()
            .map(|p| {
                (
                    p.name,
                    LockEntry {
                        source: p.source,
                        reference: p.reference,
                        version: p.version,
                        checksum: p.checksum,
                    },
                )
            })
            .collect()
    }
}

impl From<&Lock> for Lockfile {
    fn from(lock: &Lock) -> Self {
        Self {
            package: lock
                .iter()
                .map(|(name, entry)| LockedPackage {
                    name: name.clone(),
                    source: entry.source.clone(),
                    reference: entry.reference.clone(),
                    version: entry.version.clone(),
                    checksum: entry.checksum.clone(),
                })
                .collect(),
        }
    }
}
