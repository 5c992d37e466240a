use std::path::Path;

use braid_core::dependency::{GitRef, Manager, Source};
use braid_core::manifest::{Manifest, DEFAULT_REGISTRY};

const MANIFEST: &str = r#"
[package]
name = "app"
version = "0.1.0"

[dependencies]
short = "^1.2"
tagged = { git = "https://example.com/tagged.git", tag = "v2.0.0" }
local = { path = "../local", only = "dev" }
tools = { version = "~0.3", registry = "internal", only = ["dev", "test"], optional = true }
pinned = { git = "https://example.com/pinned", override = true, manager = "cargo", compile = "make all" }
"#;

#[test]
fn parses_package() {
    let manifest = Manifest::parse_toml(MANIFEST).unwrap();
    assert_eq!(manifest.package.name, "app");
    assert_eq!(manifest.package.version.as_deref(), Some("0.1.0"));
    assert_eq!(manifest.dependencies.len(), 5);
}

#[test]
fn converts_declarations() {
    let manifest = Manifest::parse_toml(MANIFEST).unwrap();
    let deps = manifest
        .declared_dependencies(None, Path::new("/work/app"))
        .unwrap();
    let find = |app: &str| deps.iter().find(|d| d.app == app).unwrap();

    let short = find("short");
    assert_eq!(short.requirement.as_deref(), Some("^1.2"));
    assert_eq!(
        short.source,
        Source::Registry {
            repo: DEFAULT_REGISTRY.to_string()
        }
    );

    let tagged = find("tagged");
    assert_eq!(
        tagged.source,
        Source::Git {
            url: "https://example.com/tagged.git".to_string(),
            reference: GitRef::Tag("v2.0.0".to_string()),
        }
    );

    let local = find("local");
    assert_eq!(
        local.source,
        Source::Path {
            path: Path::new("/work/app").join("../local")
        }
    );
    assert_eq!(local.opts.only, Some(vec!["dev".to_string()]));

    let tools = find("tools");
    assert!(tools.opts.optional);
    assert_eq!(
        tools.opts.only,
        Some(vec!["dev".to_string(), "test".to_string()])
    );

    let pinned = find("pinned");
    assert!(pinned.opts.overrides);
    assert_eq!(pinned.manager, Some(Manager::Cargo));
    assert_eq!(pinned.opts.compile.as_deref(), Some("make all"));
    assert!(deps.iter().all(|d| d.from.is_none() && !d.top_level));
}

#[test]
fn declaring_app_is_recorded() {
    let manifest = Manifest::parse_toml(MANIFEST).unwrap();
    let deps = manifest
        .declared_dependencies(Some("parent"), Path::new("."))
        .unwrap();
    assert!(deps.iter().all(|d| d.from.as_deref() == Some("parent")));
}

#[test]
fn rejects_two_sources() {
    let manifest = Manifest::parse_toml(
        r#"
[package]
name = "app"

[dependencies]
bad = { git = "https://example.com/bad", path = "../bad" }
"#,
    )
    .unwrap();
    let err = manifest
        .declared_dependencies(None, Path::new("."))
        .unwrap_err();
    assert!(err.to_string().contains("more than one"), "got: {err}");
}

#[test]
fn rejects_ref_without_git() {
    let manifest = Manifest::parse_toml(
        r#"
[package]
name = "app"

[dependencies]
bad = { tag = "v1" }
"#,
    )
    .unwrap();
    assert!(manifest
        .declared_dependencies(None, Path::new("."))
        .is_err());
}

#[test]
fn missing_package_table_is_an_error() {
    let err = Manifest::parse_toml("[dependencies]\n").unwrap_err();
    assert!(err.to_string().contains("Manifest error"), "got: {err}");
}
