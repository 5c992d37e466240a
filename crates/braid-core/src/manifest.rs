//! `Braid.toml` parsing and conversion of declarations into [`Dependency`] nodes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use braid_util::errors::BraidError;
use serde::{Deserialize, Serialize};

use crate::dependency::{Dependency, GitRef, Manager, Source};

/// Registry used when a declaration names a version and nothing else.
pub const DEFAULT_REGISTRY: &str = "default";

/// A parsed `Braid.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub package: Package,
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencySpec>,
}

/// The `[package]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub manager: Option<Manager>,
}

/// A dependency declaration: either a bare requirement (`"^1.2"`) resolved
/// from the default registry, or a detailed table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    Short(String),
    Detailed(DetailedDependency),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailedDependency {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub git: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub rev: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default)]
    pub only: Option<OneOrMany>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, rename = "override")]
    pub overrides: bool,
    #[serde(default)]
    pub manager: Option<Manager>,
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub compile: Option<String>,
}

/// `only = "dev"` or `only = ["dev", "test"]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

impl Manifest {
    /// Load and parse a `Braid.toml` from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BraidError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            BraidError::Manifest {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Convert every declaration into a [`Dependency`].
    ///
    /// `from` names the declaring app (`None` for the root project). Relative
    /// `path` sources are resolved against `base`.
    pub fn declared_dependencies(
        &self,
        from: Option<&str>,
        base: &Path,
    ) -> miette::Result<Vec<Dependency>> {
        self.dependencies
            .iter()
            .map(|(name, spec)| spec.to_dependency(name, from, base))
            .collect()
    }
}

impl DependencySpec {
    pub fn to_dependency(
        &self,
        name: &str,
        from: Option<&str>,
        base: &Path,
    ) -> miette::Result<Dependency> {
        let detailed = match self {
            DependencySpec::Short(req) => {
                let mut dep = Dependency::new(
                    name,
                    Source::Registry {
                        repo: DEFAULT_REGISTRY.to_string(),
                    },
                )
                .with_requirement(req.clone());
                dep.from = from.map(str::to_string);
                return Ok(dep);
            }
            DependencySpec::Detailed(d) => d,
        };

        let source = detailed.source(name, base)?;
        let mut dep = Dependency::new(name, source);
        dep.requirement = detailed.version.clone();
        dep.manager = detailed.manager;
        dep.from = from.map(str::to_string);
        dep.opts.only = detailed.only.clone().map(OneOrMany::into_vec);
        dep.opts.optional = detailed.optional;
        dep.opts.overrides = detailed.overrides;
        dep.opts.app = detailed.app.clone();
        dep.opts.env = detailed.env.clone();
        dep.opts.compile = detailed.compile.clone();
        Ok(dep)
    }
}

impl DetailedDependency {
    fn source(&self, name: &str, base: &Path) -> miette::Result<Source> {
        let declared = [self.git.is_some(), self.path.is_some(), self.registry.is_some()]
            .iter()
            .filter(|&&b| b)
            .count();
        if declared > 1 {
            return Err(BraidError::Manifest {
                message: format!(
                    "dependency `{name}` declares more than one of `git`, `path` and `registry`"
                ),
            }
            .into());
        }

        let refs = [&self.branch, &self.tag, &self.rev]
            .iter()
            .filter(|r| r.is_some())
            .count();
        if refs > 0 && self.git.is_none() {
            return Err(BraidError::Manifest {
                message: format!("dependency `{name}` sets a git ref without `git`"),
            }
            .into());
        }
        if refs > 1 {
            return Err(BraidError::Manifest {
                message: format!(
                    "dependency `{name}` may set only one of `branch`, `tag` and `rev`"
                ),
            }
            .into());
        }

        if let Some(url) = &self.git {
            let reference = if let Some(b) = &self.branch {
                GitRef::Branch(b.clone())
            } else if let Some(t) = &self.tag {
                GitRef::Tag(t.clone())
            } else if let Some(r) = &self.rev {
                GitRef::Rev(r.clone())
            } else {
                GitRef::Default
            };
            return Ok(Source::Git {
                url: url.clone(),
                reference,
            });
        }
        if let Some(path) = &self.path {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                base.join(path)
            };
            return Ok(Source::Path { path });
        }
        Ok(Source::Registry {
            repo: self
                .registry
                .clone()
                .unwrap_or_else(|| DEFAULT_REGISTRY.to_string()),
        })
    }
}
