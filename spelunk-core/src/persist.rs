use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write `{ "<label>": [...] }` to `<dir>/<label>_<unix seconds>.json`.
/// The directory is created if needed.
pub fn save_json(dir: &Path, label: &str, values: &[String]) -> Result<PathBuf, PersistError> {
    fs::create_dir_all(dir)?;

    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let path = dir.join(format!("{}_{}.json", label, stamp));

    let mut document = Map::new();
    document.insert(label.to_string(), Value::from(values.to_vec()));
    fs::write(&path, serde_json::to_string_pretty(&Value::Object(document))?)?;

    info!("Saved {} {} to {}", values.len(), label, path.display());
    Ok(path)
}
