//! Declarative definition loading
//!
//! Loads the fixture definitions from disk and validates records against them.

use std::fs;
use std::path::{Path, PathBuf};

use record_schemas::{EngineConfig, SchemaLoader, SchemaRegistry, Value};
use serde_json::json;

fn fixtures_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/definitions")
}

fn loaded() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    SchemaLoader::new().load_path(&mut registry, &fixtures_path()).unwrap();
    registry
}

#[test]
fn test_walks_directory_and_skips_other_files() {
    let mut registry = SchemaRegistry::new();
    let mut names = SchemaLoader::new().load_path(&mut registry, &fixtures_path()).unwrap();
    names.sort();
    assert_eq!(names, vec!["Item", "Player"]);
    assert!(registry.dangling_refs().is_empty());
}

#[test]
fn test_cross_file_references() {
    let registry = loaded();
    let player = registry
        .construct_json(
            "Player",
            json!({
                "nick": "ann_1",
                "level": "12",
                "items": [{"name": "Rose", "stats": {"power": 3, "speed": 0.5}}],
                "joined": "2024-05-01T10:00:00Z"
            }),
        )
        .unwrap();

    assert_eq!(player.get("level"), Some(&Value::Int(12)));
    assert!(matches!(player.get("joined"), Some(Value::DateTime(_))));
    assert_eq!(
        player.to_json(),
        json!({
            "nick": "ann_1",
            "level": 12,
            "inventory": [{"title": "Rose", "rarity": "common", "stats": {"power": 3, "speed": 0.5}}],
            "joined": "2024-05-01T10:00:00Z"
        })
    );
}

#[test]
fn test_defaults_from_definitions() {
    let registry = loaded();
    let player = registry.construct_json("Player", json!({"nick": "bo"})).unwrap();
    assert_eq!(player.to_json(), json!({"nick": "bo", "level": 1, "inventory": []}));
}

#[test]
fn test_builtin_validators_from_definitions() {
    let registry = loaded();

    let err = registry.construct_json("Player", json!({"nick": "Bad Nick"})).unwrap_err();
    assert!(err.user_error().is_some());

    let err = registry
        .construct_json("Player", json!({"nick": "ann", "items": [{"title": ""}]}))
        .unwrap_err();
    assert!(err.user_error().is_some());

    let err = registry.construct_json("Player", json!({"nick": "ann", "level": 100})).unwrap_err();
    assert_eq!(err.validation().unwrap().path, "Player#level");
}

#[test]
fn test_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(
        &path,
        r#"
[[schemas]]
name = "Broken"

[[schemas.fields]]
name = "a"
type = "list[int"
"#,
    )
    .unwrap();

    let err = SchemaLoader::new()
        .load_path(&mut SchemaRegistry::new(), dir.path())
        .unwrap_err();
    assert!(err.is_definition());
    let message = err.to_string();
    assert!(message.contains("broken.toml"));
    assert!(message.contains("Broken#a"));
}

#[test]
fn test_malformed_file_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, "{ not json").unwrap();

    let err = SchemaLoader::new().load_file(&mut SchemaRegistry::new(), &path).unwrap_err();
    assert!(err.to_string().contains("bad.json"));
}

#[test]
fn test_duplicate_schema_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let doc = r#"{"schemas": [{"name": "Dup", "fields": [{"name": "a", "type": "int"}]}]}"#;
    fs::write(dir.path().join("a.json"), doc).unwrap();
    fs::write(dir.path().join("b.json"), doc).unwrap();

    let mut registry = SchemaRegistry::new();
    assert!(SchemaLoader::new().load_path(&mut registry, dir.path()).is_err());
    assert!(registry.contains("Dup"));
}

#[test]
fn test_loader_follows_config() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("loose.json"),
        r#"{"schemas": [{"name": "Loose", "fields": [{"name": "a", "type": "int"}]}]}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("ignored.toml"),
        "[[schemas]]\nname = \"Ignored\"\n",
    )
    .unwrap();

    let mut config = EngineConfig::default();
    config.definitions.extensions = vec!["json".to_string()];
    config.validation.strip_unknown = true;

    let mut registry = SchemaRegistry::new();
    SchemaLoader::from_config(&config).load_path(&mut registry, dir.path()).unwrap();

    assert!(!registry.contains("Ignored"));
    let record = registry.construct_json("Loose", json!({"a": 1, "b": 2})).unwrap();
    assert_eq!(record.to_json(), json!({"a": 1}));
}
