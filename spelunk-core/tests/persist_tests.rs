// Tests for saving results to disk

use spelunk_core::persist::save_json;
use tempfile::TempDir;

#[test]
fn test_save_json_writes_labelled_list() {
    let dir = TempDir::new().unwrap();
    let emails = vec!["a@x.onion".to_string(), "b@y.onion".to_string()];

    let path = save_json(dir.path(), "emails", &emails).unwrap();

    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("emails_"));
    assert!(name.ends_with(".json"));

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["emails"][0], "a@x.onion");
    assert_eq!(value["emails"][1], "b@y.onion");
}

#[test]
fn test_save_json_creates_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("results").join("today");

    let path = save_json(&nested, "links", &[]).unwrap();

    assert!(path.starts_with(&nested));
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(value["links"].as_array().unwrap().is_empty());
}
