use std::fs;

use form_export::{AnchorRole, ConfigError, ExportConfig, FailurePolicy};
use form_model::{FormDefinition, FormSpec};
use tempfile::tempdir;

fn sites_form() -> FormDefinition {
    let spec: FormSpec =
        serde_json::from_str(include_str!("../tests/fixtures/sites_form.json")).expect("form");
    FormDefinition::from_spec(&spec).expect("catalog")
}

#[test]
fn loads_and_resolves_fixture_config() {
    let form = sites_form();
    let config = ExportConfig::from_toml_str(include_str!("../tests/fixtures/export.toml"))
        .expect("config");

    assert_eq!(config.on_error, FailurePolicy::SkipRecord);
    assert!(config.columns.is_empty());

    let resolved = config.resolve(&form).expect("resolve");
    assert_eq!(resolved.base_url, "https://aggregate.example.org/odk");
    assert_eq!(resolved.anchors.location, form.find("sites/location").expect("location"));
    assert_eq!(resolved.anchors.title, form.find("sites/label").expect("title"));
    assert_eq!(resolved.anchors.image, form.find("sites/photo"));
    assert!(resolved.columns.is_all());
    assert_eq!(resolved.on_error, FailurePolicy::SkipRecord);
}

#[test]
fn column_paths_select_fields() {
    let form = sites_form();
    let config = ExportConfig::from_toml_str(
        r#"
base_url = "http://localhost"
columns = ["survey", "sites/detail"]

[kml]
location = "sites/location"
title = "survey"
"#,
    )
    .expect("config");

    let resolved = config.resolve(&form).expect("resolve");
    assert_eq!(resolved.on_error, FailurePolicy::Abort);
    assert_eq!(resolved.anchors.image, None);
    assert!(!resolved.columns.is_all());
    assert!(resolved.columns.includes_field(form.find("sites/detail").expect("detail")));
    assert!(!resolved.columns.includes_field(form.find("sites/label").expect("label")));
}

#[test]
fn unresolvable_settings_are_reported() {
    let form = sites_form();

    let config = ExportConfig::from_toml_str(concat!(
        "base_url = \"http://localhost\"\n",
        "[kml]\nlocation = \"sites/missing\"\ntitle = \"survey\"\n",
    ))
    .expect("config");
    assert!(matches!(
        config.resolve(&form),
        Err(ConfigError::UnknownField { path }) if path == "sites/missing"
    ));

    let config = ExportConfig::from_toml_str("[kml]\nlocation = \"home\"\ntitle = \"survey\"\n")
        .expect("config");
    assert!(matches!(config.resolve(&form), Err(ConfigError::MissingBaseUrl)));

    let config =
        ExportConfig::from_toml_str("base_url = \"http://localhost\"\n[kml]\nlocation = \"home\"\n")
            .expect("config");
    assert!(matches!(
        config.resolve(&form),
        Err(ConfigError::MissingAnchor {
            anchor: AnchorRole::Title
        })
    ));
}

#[test]
fn rejects_unknown_keys_and_bad_policies() {
    assert!(matches!(
        ExportConfig::from_toml_str("base_uri = \"http://localhost\"\n"),
        Err(ConfigError::Toml(_))
    ));
    assert!(matches!(
        ExportConfig::from_toml_str("on_error = \"retry\"\n"),
        Err(ConfigError::Toml(_))
    ));
}

#[test]
fn load_reads_from_disk() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("export.toml");
    fs::write(&path, include_str!("../tests/fixtures/export.toml")).expect("write");

    let config = ExportConfig::load(&path).expect("load");
    assert_eq!(config.kml.title.as_deref(), Some("sites/label"));

    let missing = dir.path().join("missing.toml");
    assert!(matches!(
        ExportConfig::load(&missing),
        Err(ConfigError::Io { .. })
    ));
}
