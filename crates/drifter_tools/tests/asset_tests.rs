//! Integration tests for the asset commands

use drifter_tools::*;
use std::fs;
use std::path::Path;

fn config_for(root: &Path) -> ToolConfig {
    ToolConfig {
        input: root.join("assets"),
        output: root.join("assets/processed"),
        manifest: root.join("assets/manifest.json"),
        ..ToolConfig::default()
    }
}

fn seed_assets(root: &Path) {
    let assets = root.join("assets");
    fs::create_dir_all(assets.join("levels")).unwrap();
    fs::write(assets.join("levels/Transform.json"), r#"{"position":[1.0,2.0],"rotation":90.0}"#).unwrap();
    fs::write(assets.join("levels/settings.json"), r#"{"volume":0.8}"#).unwrap();
    fs::write(assets.join("goblin.png"), [0x89u8, b'P', b'N', b'G']).unwrap();
}

#[test]
fn test_process_writes_index_and_copies() {
    let dir = tempfile::tempdir().unwrap();
    seed_assets(dir.path());
    let config = config_for(dir.path());
    let registry = demo_registry().unwrap();

    let report = process(&registry, &config).unwrap();
    assert_eq!(report.type_count, 3);
    assert_eq!(report.copied.len(), 3);

    let index: TypeIndex =
        serde_json::from_str(&fs::read_to_string(config.output.join(TYPE_INDEX_FILE)).unwrap()).unwrap();
    let names: Vec<_> = index.types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Transform", "GameObject", "Entity"]);

    assert_eq!(
        fs::read(config.output.join("goblin.png")).unwrap(),
        fs::read(config.input.join("goblin.png")).unwrap()
    );

    // a second run does not copy its own output
    let again = process(&registry, &config).unwrap();
    assert_eq!(again.copied, report.copied);
}

#[test]
fn test_validate_reports_problems() {
    let dir = tempfile::tempdir().unwrap();
    seed_assets(dir.path());
    let config = config_for(dir.path());
    let registry = demo_registry().unwrap();

    let report = validate(&registry, &config.input).unwrap();
    assert!(report.is_ok(), "{:?}", report.problems);
    assert_eq!(report.checked, 2);
    assert_eq!(report.records, 1);

    fs::write(config.input.join("GameObject.json"), r#"{"name":"crate","id":3}"#).unwrap();
    fs::write(config.input.join("list.json"), "[1,2]").unwrap();
    fs::write(config.input.join("broken.json"), "{").unwrap();

    let report = validate(&registry, &config.input).unwrap();
    assert!(!report.is_ok());
    let mut flagged: Vec<_> = report
        .problems
        .iter()
        .map(|p| p.path.to_string_lossy().into_owned())
        .collect();
    flagged.sort();
    assert_eq!(flagged, vec!["GameObject.json", "broken.json", "list.json"]);
}

#[test]
fn test_validate_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let registry = demo_registry().unwrap();
    assert!(matches!(
        validate(&registry, &dir.path().join("assets")),
        Err(ToolError::NotFound(_))
    ));
}

#[test]
fn test_manifest_written_sorted() {
    let dir = tempfile::tempdir().unwrap();
    seed_assets(dir.path());
    let config = config_for(dir.path());

    let first = manifest(&config).unwrap();
    assert_eq!(first.asset_count, 3);
    let paths: Vec<_> = first.assets.iter().map(|a| a.path.as_str()).collect();
    assert_eq!(paths, vec!["goblin.png", "levels/Transform.json", "levels/settings.json"]);
    assert_eq!(first.by_extension.get("json"), Some(&2));

    let on_disk: Manifest =
        serde_json::from_str(&fs::read_to_string(&config.manifest).unwrap()).unwrap();
    assert_eq!(on_disk, first);

    // the manifest does not list itself on the next run
    let second = manifest(&config).unwrap();
    assert_eq!(second, first);
}
