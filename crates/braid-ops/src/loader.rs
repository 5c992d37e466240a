//! Loading dependency nodes from `Braid.toml` files on disk.

use std::path::{Path, PathBuf};

use braid_core::config::Config;
use braid_core::dependency::{Dependency, Manager, Source, Status};
use braid_core::lockfile::Lock;
use braid_core::manifest::Manifest;
use braid_core::MANIFEST_FILE;
use braid_resolver::loader::Loader;
use braid_util::errors::BraidError;

/// Reads the root manifest and the manifests of checked-out dependencies.
///
/// Path dependencies are read where they point. Git and registry dependencies
/// are expected under `<root>/<deps-path>/<app>`; one that has not been
/// fetched yet has no children.
pub struct ManifestLoader {
    root: PathBuf,
    manifest: Manifest,
    deps_dir: PathBuf,
    lockfile: PathBuf,
}

impl ManifestLoader {
    pub fn new(root: &Path, config: &Config) -> miette::Result<Self> {
        let manifest = Manifest::from_path(&root.join(MANIFEST_FILE))?;
        Ok(Self {
            root: root.to_path_buf(),
            manifest,
            deps_dir: root.join(&config.resolve.deps_path),
            lockfile: root.join(&config.resolve.lockfile),
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn lockfile_path(&self) -> &Path {
        &self.lockfile
    }

    /// Directory holding `dep`'s code.
    pub fn checkout_dir(&self, dep: &Dependency) -> PathBuf {
        match &dep.source {
            Source::Path { path } => path.clone(),
            Source::Git { .. } | Source::Registry { .. } => self.deps_dir.join(&dep.app),
        }
    }
}

impl Loader for ManifestLoader {
    fn children(&self) -> miette::Result<Vec<Dependency>> {
        self.manifest.declared_dependencies(None, &self.root)
    }

    fn load(
        &self,
        mut dep: Dependency,
        children: Option<Vec<Dependency>>,
    ) -> miette::Result<Dependency> {
        let dir = self.checkout_dir(&dep);
        if !dir.is_dir() {
            if let Source::Path { path } = &dep.source {
                return Err(BraidError::Resolution {
                    message: format!(
                        "{} declared in {} points at {}, which does not exist",
                        dep.app,
                        dep.declared_in(),
                        path.display()
                    ),
                }
                .into());
            }
            tracing::debug!("{} has not been fetched to {}", dep.app, dir.display());
        }

        dep.manager = dep.manager.or_else(|| Manager::infer(&dir));

        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = if manifest_path.is_file() {
            Some(Manifest::from_path(&manifest_path)?)
        } else {
            None
        };
        if let Some(m) = &manifest {
            if m.package.name != dep.app {
                tracing::warn!(
                    "{} is declared as {} but its manifest names it {}",
                    dir.display(),
                    dep.app,
                    m.package.name
                );
            }
        }

        dep.deps = match (children, &manifest) {
            (Some(children), _) => children,
            (None, Some(m)) => m.declared_dependencies(Some(&dep.app), &dir)?,
            (None, None) => Vec::new(),
        };

        let version = manifest
            .and_then(|m| m.package.version)
            .or_else(|| dep.opts.lock.as_ref().and_then(|l| l.version.clone()));
        if let Some(version) = version {
            dep.status = Status::Ok(version);
        }
        Ok(dep)
    }

    fn read_lock(&self) -> miette::Result<Lock> {
        Lock::read(&self.lockfile)
    }

    fn vsn_match(&self, requirement: &str, version: &str, app: &str) -> miette::Result<bool> {
        let req = semver::VersionReq::parse(requirement).map_err(|e| BraidError::Resolution {
            message: format!("Invalid version requirement '{requirement}' for {app}: {e}"),
        })?;
        let version = semver::Version::parse(version).map_err(|e| BraidError::Resolution {
            message: format!("Invalid version '{version}' for {app}: {e}"),
        })?;
        Ok(req.matches(&version))
    }
}
