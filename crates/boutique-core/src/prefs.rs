//! User preference persistence: one JSON document, rewritten wholesale.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::models::{EngineError, EngineErrorKind, EngineResult};

pub struct Preferences {
    path: PathBuf,
    data: Map<String, Value>,
}

impl Preferences {
    /// Loads the backing file, starting over with an empty document when the
    /// file is absent or unreadable. Loading never fails; persistence
    /// problems surface on `write`.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    tracing::warn!(path = %path.display(), "unparseable preferences, recreating");
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        };
        Self { path, data }
    }

    /// Reads a key, falling back to `default` when absent. A miss persists
    /// the default so later reads agree; if that persist fails the default is
    /// still returned.
    pub fn read(&mut self, key: &str, default: Value) -> Value {
        if let Some(value) = self.data.get(key) {
            return value.clone();
        }

        tracing::debug!(key, "no preference value, writing default");
        if let Err(error) = self.write(key, default.clone()) {
            tracing::warn!(key, %error, "failed to persist default preference");
        }
        default
    }

    /// Writes a key and rewrites the whole document. On failure the previous
    /// on-disk contents and the in-memory view both stay as they were.
    pub fn write(&mut self, key: &str, value: Value) -> EngineResult<()> {
        let previous = self.data.insert(key.to_string(), value);
        if let Err(error) = self.persist() {
            match previous {
                Some(old) => {
                    self.data.insert(key.to_string(), old);
                }
                None => {
                    self.data.remove(key);
                }
            }
            return Err(error);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes to a sibling temp file and renames over the target, so a
    /// failed write can never leave a half-written document behind.
    fn persist(&self) -> EngineResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|error| persist_error(parent, error))?;
        }

        let document =
            serde_json::to_string_pretty(&Value::Object(self.data.clone())).map_err(|error| {
                EngineError::new(
                    EngineErrorKind::PersistFailure,
                    format!("failed to serialize preferences: {error}"),
                )
            })?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, document).map_err(|error| persist_error(&temp_path, error))?;
        fs::rename(&temp_path, &self.path).map_err(|error| {
            let _ = fs::remove_file(&temp_path);
            persist_error(&self.path, error)
        })
    }
}

fn persist_error(path: &Path, error: std::io::Error) -> EngineError {
    EngineError::new(
        EngineErrorKind::PersistFailure,
        format!("{}: {error}", path.display()),
    )
}
