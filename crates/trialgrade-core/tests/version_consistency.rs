//! Workspace manifest consistency: every member inherits the workspace
//! version, and the CLI links the in-tree core crate.

use std::path::{Path, PathBuf};

const MEMBERS: [&str; 2] = ["crates/trialgrade-core", "crates/trialgrade-cli"];

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("workspace root above crates/<name>")
        .to_path_buf()
}

fn manifest(path: &Path) -> toml::Value {
    let text = std::fs::read_to_string(path.join("Cargo.toml"))
        .unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
    text.parse()
        .unwrap_or_else(|e| panic!("parse {}: {e}", path.display()))
}

fn workspace_version() -> String {
    manifest(&workspace_root())["workspace"]["package"]["version"]
        .as_str()
        .expect("workspace.package.version")
        .to_string()
}

fn inherits_workspace(doc: &toml::Value, key: &str) -> bool {
    doc.get("package")
        .and_then(|p| p.get(key))
        .and_then(|v| v.get("workspace"))
        .and_then(toml::Value::as_bool)
        == Some(true)
}

#[test]
fn members_inherit_workspace_version_and_edition() {
    for member in MEMBERS {
        let doc = manifest(&workspace_root().join(member));
        assert!(
            inherits_workspace(&doc, "version"),
            "{member} should use version.workspace = true"
        );
        assert!(
            inherits_workspace(&doc, "edition"),
            "{member} should use edition.workspace = true"
        );
    }
}

#[test]
fn workspace_lists_every_member() {
    let doc = manifest(&workspace_root());
    let members: Vec<&str> = doc["workspace"]["members"]
        .as_array()
        .expect("workspace.members")
        .iter()
        .filter_map(toml::Value::as_str)
        .collect();
    for member in MEMBERS {
        assert!(members.contains(&member), "{member} missing from workspace");
    }
}

#[test]
fn cli_links_in_tree_core() {
    let root = manifest(&workspace_root());
    let core = &root["workspace"]["dependencies"]["trialgrade-core"];
    assert_eq!(core["path"].as_str(), Some("crates/trialgrade-core"));
    assert_eq!(core["version"].as_str(), Some(workspace_version().as_str()));

    let cli = manifest(&workspace_root().join("crates/trialgrade-cli"));
    assert_eq!(
        cli["dependencies"]["trialgrade-core"]["workspace"].as_bool(),
        Some(true)
    );
}

#[test]
fn version_constant_matches_workspace() {
    assert_eq!(trialgrade_core::VERSION, workspace_version());
    assert_eq!(env!("CARGO_PKG_VERSION"), workspace_version());
}
