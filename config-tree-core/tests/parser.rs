use std::path::PathBuf;

use config_tree_core::{parse_file, ConfigTree, TreePath};
use pretty_assertions::assert_eq;

const LIST_TAGS: &[&str] = &["rule", "group", "user", "priv", "cert", "package", "config"];

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn at<'a>(tree: &'a ConfigTree, path: &str) -> &'a ConfigTree {
    tree.at(&path.parse::<TreePath>().expect("path"))
}

#[test]
fn parses_pfsense_backup_into_tree() {
    let tree = parse_file(&fixture("fixtures/pfsense-base.xml"), LIST_TAGS).expect("parse");

    assert_eq!(at(&tree, "system.hostname").as_scalar(), Some("fw1"));
    assert_eq!(at(&tree, "system.group[1].name").as_scalar(), Some("admins"));
    assert_eq!(
        at(&tree, "system.group[1].description").as_scalar(),
        Some("System Administrators")
    );
    assert_eq!(at(&tree, "filter.rule[1].destination.port").as_scalar(), Some("443"));
}

#[test]
fn empty_elements_are_empty_scalars() {
    let tree = parse_file(&fixture("fixtures/pfsense-base.xml"), LIST_TAGS).expect("parse");

    assert_eq!(at(&tree, "aliases"), &ConfigTree::scalar(""));
    assert!(at(&tree, "aliases").is_vacant());
    assert_eq!(at(&tree, "interfaces.wan.enable").as_scalar(), Some(""));
    assert!(at(&tree, "interfaces.opt1").is_absent());
}

#[test]
fn listed_tags_are_sequences_even_when_single() {
    let tree = parse_file(&fixture("fixtures/pfsense-base.xml"), LIST_TAGS).expect("parse");

    let certs = at(&tree, "cert").as_sequence().expect("cert list");
    assert_eq!(certs.len(), 1);
    let privs = at(&tree, "system.user[0].priv").as_sequence().expect("priv list");
    assert_eq!(privs, &[ConfigTree::scalar("user-shell-access")]);
    assert!(at(&tree, "installedpackages.package").as_sequence().is_some());
}

#[test]
fn json_snapshots_load_by_extension() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"system":{"nextgid":2000,"dnsallowoverride":true,"x":null}}"#)
        .expect("write");

    let tree = parse_file(&path, LIST_TAGS).expect("parse");
    assert_eq!(at(&tree, "system.nextgid").as_scalar(), Some("2000"));
    assert_eq!(at(&tree, "system.dnsallowoverride").as_scalar(), Some("true"));
    assert!(at(&tree, "system.x").is_absent());
}
