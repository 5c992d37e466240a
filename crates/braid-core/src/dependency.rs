//! The dependency node and the values hanging off it.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::lockfile::LockEntry;

/// One occurrence of a dependency in the project tree.
///
/// Two nodes with the same `app` are the same dependency no matter where they
/// were declared; convergence merges them into a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub app: String,
    /// Opaque version predicate, checked through the loader.
    pub requirement: Option<String>,
    pub source: Source,
    pub opts: DepOpts,
    /// Build-system hint. Unset until declared or inferred.
    pub manager: Option<Manager>,
    pub status: Status,
    /// Declared directly by the root project.
    pub top_level: bool,
    /// App that declared this occurrence; `None` for the root project.
    pub from: Option<String>,
    /// Children as declared, before convergence dedupes them.
    pub deps: Vec<Dependency>,
}

impl Dependency {
    pub fn new(app: impl Into<String>, source: Source) -> Self {
        Self {
            app: app.into(),
            requirement: None,
            source,
            opts: DepOpts::default(),
            manager: None,
            status: Status::Clean,
            top_level: false,
            from: None,
            deps: Vec::new(),
        }
    }

    pub fn with_requirement(mut self, requirement: impl Into<String>) -> Self {
        self.requirement = Some(requirement.into());
        self
    }

    pub fn with_only<S: AsRef<str>>(mut self, envs: &[S]) -> Self {
        self.opts.only = Some(envs.iter().map(|e| e.as_ref().to_string()).collect());
        self
    }

    pub fn with_manager(mut self, manager: Manager) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn with_deps(mut self, deps: Vec<Dependency>) -> Self {
        self.deps = deps;
        self
    }

    pub fn optional(mut self) -> Self {
        self.opts.optional = true;
        self
    }

    pub fn overriding(mut self) -> Self {
        self.opts.overrides = true;
        self
    }

    /// Whether this node carries one of the four conflict statuses.
    pub fn is_conflicted(&self) -> bool {
        self.status.is_conflict()
    }

    /// Whether the `only` filter admits `env`. No env means every env.
    pub fn available_in(&self, env: Option<&str>) -> bool {
        match (&self.opts.only, env) {
            (Some(only), Some(env)) => only.iter().any(|e| e == env),
            _ => true,
        }
    }

    /// The resolved version, if loading or the lock produced one.
    pub fn version(&self) -> Option<&str> {
        match &self.status {
            Status::Ok(v) => Some(v),
            _ => None,
        }
    }

    /// Where this occurrence was declared, for messages.
    pub fn declared_in(&self) -> &str {
        self.from.as_deref().unwrap_or("the root project")
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.app)?;
        if let Some(v) = self.version() {
            write!(f, " {v}")?;
        } else if let Some(req) = &self.requirement {
            write!(f, " ({req})")?;
        }
        write!(f, " [{}]", self.source)
    }
}

/// Per-declaration options.
///
/// `app`, `env` and `compile` are the build-affecting subset: two occurrences
/// only converge when they agree on all three.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepOpts {
    /// Environments this dependency is restricted to. `None` means all.
    pub only: Option<Vec<String>>,
    pub optional: bool,
    /// Declared with `override = true`.
    pub overrides: bool,
    /// Lock entry applied before the node was handed to the fetch callback.
    pub lock: Option<LockEntry>,
    pub app: Option<String>,
    pub env: Option<String>,
    pub compile: Option<String>,
}

impl DepOpts {
    pub fn same_build_opts(&self, other: &DepOpts) -> bool {
        self.app == other.app && self.env == other.env && self.compile == other.compile
    }
}

/// Where a dependency's code comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Git { url: String, reference: GitRef },
    Path { path: PathBuf },
    Registry { repo: String },
}

/// The source mechanism, without its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Git,
    Path,
    Registry,
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self {
            Source::Git { .. } => SourceKind::Git,
            Source::Path { .. } => SourceKind::Path,
            Source::Registry { .. } => SourceKind::Registry,
        }
    }

    /// Whether two declarations of the same mechanism point at the same code.
    pub fn same_source(&self, other: &Source) -> bool {
        match (self, other) {
            (
                Source::Git { url: a, reference: ra },
                Source::Git { url: b, reference: rb },
            ) => normalize_git_url(a) == normalize_git_url(b) && ra == rb,
            (Source::Path { path: a }, Source::Path { path: b }) => {
                normalize_path(a) == normalize_path(b)
            }
            (Source::Registry { repo: a }, Source::Registry { repo: b }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Git { url, reference } => match reference {
                GitRef::Default => write!(f, "git {url}"),
                other => write!(f, "git {url} ({other})"),
            },
            Source::Path { path } => write!(f, "path {}", path.display()),
            Source::Registry { repo } => write!(f, "registry {repo}"),
        }
    }
}

/// The ref a git dependency is checked out at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitRef {
    #[default]
    Default,
    Branch(String),
    Tag(String),
    Rev(String),
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitRef::Default => f.write_str("default branch"),
            GitRef::Branch(b) => write!(f, "branch: {b}"),
            GitRef::Tag(t) => write!(f, "tag: {t}"),
            GitRef::Rev(r) => write!(f, "rev: {r}"),
        }
    }
}

fn normalize_git_url(url: &str) -> &str {
    let url = url.trim_end_matches('/');
    url.strip_suffix(".git").unwrap_or(url)
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
/// Does not touch the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` above the root is the root.
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Build-system hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Manager {
    Braid,
    Cargo,
    Make,
}

impl Manager {
    /// Preference order when two sibling occurrences disagree.
    pub const PRIORITY: [Manager; 3] = [Manager::Braid, Manager::Cargo, Manager::Make];

    /// Manager detected from the marker files in a checkout.
    pub fn infer(dir: &Path) -> Option<Manager> {
        if dir.join(crate::MANIFEST_FILE).is_file() {
            Some(Manager::Braid)
        } else if dir.join("Cargo.toml").is_file() {
            Some(Manager::Cargo)
        } else if dir.join("Makefile").is_file() {
            Some(Manager::Make)
        } else {
            None
        }
    }
}

impl fmt::Display for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Manager::Braid => f.write_str("braid"),
            Manager::Cargo => f.write_str("cargo"),
            Manager::Make => f.write_str("make"),
        }
    }
}

/// Convergence status of a node.
///
/// The four conflict variants hold the occurrence that could not be merged
/// into the node carrying the status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    /// Nothing known beyond the declaration.
    #[default]
    Clean,
    /// Loaded, with the version that was found.
    Ok(String),
    /// A shallower declaration replaced a different one below it.
    Overridden(Box<Dependency>),
    /// Two declarations point at different code.
    Diverged(Box<Dependency>),
    /// A deeper `only` filter is not covered by the authoritative one.
    DivergedOnly(Box<Dependency>),
    /// The accepted version does not satisfy a later requirement.
    DivergedReq {
        version: String,
        other: Box<Dependency>,
    },
}

impl Status {
    pub fn is_conflict(&self) -> bool {
        !matches!(self, Status::Clean | Status::Ok(_))
    }

    /// The conflicting occurrence, for conflict statuses.
    pub fn other(&self) -> Option<&Dependency> {
        match self {
            Status::Clean | Status::Ok(_) => None,
            Status::Overridden(d) | Status::Diverged(d) | Status::DivergedOnly(d) => Some(d),
            Status::DivergedReq { other, .. } => Some(other),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Clean => "clean",
            Status::Ok(_) => "ok",
            Status::Overridden(_) => "overridden",
            Status::Diverged(_) => "diverged",
            Status::DivergedOnly(_) => "diverged only",
            Status::DivergedReq { .. } => "diverged requirement",
        }
    }
}
