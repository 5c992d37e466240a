#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use braid_core::dependency::{Dependency, GitRef, Source};
use braid_core::lockfile::{Lock, LockEntry};
use braid_resolver::loader::Loader;
use braid_util::errors::BraidError;

/// An in-memory project: root declarations plus the manifest of every app.
#[derive(Default)]
pub struct TreeLoader {
    roots: Vec<Dependency>,
    packages: HashMap<String, Package>,
    lock: Lock,
    failing: Option<String>,
    pub loads: RefCell<Vec<String>>,
}

struct Package {
    version: Option<String>,
    deps: Vec<Dependency>,
}

impl TreeLoader {
    pub fn new(roots: Vec<Dependency>) -> Self {
        Self {
            roots,
            ..Self::default()
        }
    }

    /// Declare `app`'s children. They are recorded as declared by `app`.
    pub fn package(mut self, app: &str, version: Option<&str>, deps: Vec<Dependency>) -> Self {
        let deps = deps
            .into_iter()
            .map(|mut d| {
                d.from = Some(app.to_string());
                d
            })
            .collect();
        self.packages.insert(
            app.to_string(),
            Package {
                version: version.map(str::to_string),
                deps,
            },
        );
        self
    }

    pub fn with_lock(mut self, lock: Lock) -> Self {
        self.lock = lock;
        self
    }

    pub fn failing_on(mut self, app: &str) -> Self {
        self.failing = Some(app.to_string());
        self
    }

    pub fn load_count(&self, app: &str) -> usize {
        self.loads.borrow().iter().filter(|a| *a == app).count()
    }
}

impl Loader for TreeLoader {
    fn children(&self) -> miette::Result<Vec<Dependency>> {
        Ok(self.roots.clone())
    }

    fn load(
        &self,
        mut dep: Dependency,
        children: Option<Vec<Dependency>>,
    ) -> miette::Result<Dependency> {
        if self.failing.as_deref() == Some(dep.app.as_str()) {
            return Err(BraidError::Generic {
                message: format!("checkout of {} failed", dep.app),
            }
            .into());
        }
        self.loads.borrow_mut().push(dep.app.clone());

        let package = self.packages.get(&dep.app);
        dep.deps = match children {
            Some(children) => children,
            None => package.map(|p| p.deps.clone()).unwrap_or_default(),
        };
        let version = package
            .and_then(|p| p.version.clone())
            .or_else(|| dep.opts.lock.as_ref().and_then(|l| l.version.clone()));
        if let Some(version) = version {
            dep.status = braid_core::dependency::Status::Ok(version);
        }
        Ok(dep)
    }

    fn read_lock(&self) -> miette::Result<Lock> {
        Ok(self.lock.clone())
    }

    fn vsn_match(&self, requirement: &str, version: &str, app: &str) -> miette::Result<bool> {
        let req = semver::VersionReq::parse(requirement).map_err(|e| BraidError::Resolution {
            message: format!("invalid requirement {requirement} for {app}: {e}"),
        })?;
        let version = semver::Version::parse(version).map_err(|e| BraidError::Resolution {
            message: format!("invalid version {version} for {app}: {e}"),
        })?;
        Ok(req.matches(&version))
    }
}

pub fn git(app: &str, tag: &str) -> Dependency {
    Dependency::new(
        app,
        Source::Git {
            url: format!("https://example.com/{app}.git"),
            reference: GitRef::Tag(tag.to_string()),
        },
    )
}

pub fn path(app: &str, dir: &str) -> Dependency {
    Dependency::new(app, Source::Path { path: dir.into() })
}

pub fn registry(app: &str, requirement: &str) -> Dependency {
    Dependency::new(
        app,
        Source::Registry {
            repo: "default".to_string(),
        },
    )
    .with_requirement(requirement)
}

pub fn lock_entry(reference: &str, version: &str) -> LockEntry {
    LockEntry {
        source: "registry+default".to_string(),
        reference: reference.to_string(),
        version: Some(version.to_string()),
        checksum: None,
    }
}

/// Callback recording every app it is invoked for.
pub fn record(
    dep: Dependency,
    mut seen: Vec<String>,
    lock: Lock,
) -> miette::Result<(Dependency, Vec<String>, Lock)> {
    seen.push(dep.app.clone());
    Ok((dep, seen, lock))
}

pub fn apps(deps: &[Dependency]) -> Vec<&str> {
    deps.iter().map(|d| d.app.as_str()).collect()
}

pub fn find<'a>(deps: &'a [Dependency], app: &str) -> &'a Dependency {
    deps.iter()
        .find(|d| d.app == app)
        .unwrap_or_else(|| panic!("{app} missing from {:?}", apps(deps)))
}
