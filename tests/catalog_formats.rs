//! ---
//! warden_section: "15-testing-qa-runbook"
//! warden_subsection: "integration-tests"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Integration and validation tests for the Warden access stack."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;
use warden_access::{CatalogDocument, CatalogError};
use warden_common::{LogFormat, WardenConfig};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name)
}

#[test]
fn json_and_yaml_catalogs_share_a_fingerprint() {
    let json = CatalogDocument::from_path(fixture("catalog.json"))
        .unwrap()
        .snapshot();
    let yaml = CatalogDocument::from_path(fixture("catalog.yaml"))
        .unwrap()
        .snapshot();
    assert_eq!(json.fingerprint(), yaml.fingerprint());
    assert_eq!(json.matrix(), yaml.matrix());
    assert_eq!(json.users().len(), 3);
    assert!(yaml.users().is_empty());
}

#[test]
fn toml_catalog_is_accepted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("catalog.toml");
    fs::write(
        &path,
        r#"
        [[permissionGroups]]
        id = "g1"
        key = "reports"

        [[permissions]]
        id = 7
        name = "export"

        [[roles]]
        id = "analyst"
        permissions = { g1 = [7] }
        "#,
    )
    .unwrap();

    let snapshot = CatalogDocument::from_path(&path).unwrap().snapshot();
    assert_eq!(snapshot.groups()["g1"].key, "REPORTS");
    assert_eq!(snapshot.permissions()["7"].key, "export");
    let matrix = snapshot.matrix();
    let grants = matrix.role("analyst").unwrap().group("REPORTS").unwrap();
    assert!(grants.has_key("export"));
    assert!(grants.ids.contains("7"));
}

#[test]
fn unreadable_catalogs_report_their_path() {
    let dir = tempdir().unwrap();

    let missing = dir.path().join("missing.json");
    let err = CatalogDocument::from_path(&missing).unwrap_err();
    assert!(matches!(err, CatalogError::Io { .. }));
    assert!(err.to_string().contains("missing.json"));

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{ roles: ").unwrap();
    assert!(matches!(
        CatalogDocument::from_path(&broken),
        Err(CatalogError::Parse { .. })
    ));

    let unknown = dir.path().join("catalog.ini");
    fs::write(&unknown, "[roles]").unwrap();
    assert!(matches!(
        CatalogDocument::from_path(&unknown),
        Err(CatalogError::UnsupportedFormat(_))
    ));
}

#[test]
fn config_file_points_at_catalog() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("warden.toml");
    fs::write(
        &path,
        format!(
            "[catalog]\npath = {:?}\n\n[logging]\nformat = \"structured-json\"\n\n[metrics]\nnamespace = \"dashboard\"\n",
            fixture("catalog.json").display().to_string()
        ),
    )
    .unwrap();

    let config = WardenConfig::from_path(&path).unwrap();
    assert_eq!(config.logging.format, LogFormat::StructuredJson);
    assert_eq!(config.metrics.namespace, "dashboard");
    let catalog = config.catalog.path.unwrap();
    let snapshot = CatalogDocument::from_path(catalog).unwrap().snapshot();
    assert!(snapshot.role("role-admin").unwrap().is_system());
}
