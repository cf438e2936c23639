// JSON-file backend for filter preferences.
//
// One file holds a flat `{ key: value }` object. Writes go to a sibling
// temp file first and are renamed into place, so a crash never leaves a
// half-written file behind.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use mycomize_core::{CoreError, PreferenceBackend};

#[derive(Debug, Clone)]
pub struct JsonFilePreferences {
    path: PathBuf,
}

impl JsonFilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, CoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(io_error(&self.path, &e)),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => Err(CoreError::Preferences {
                message: format!("{} is not a JSON object", self.path.display()),
            }),
        }
    }
}

impl PreferenceBackend for JsonFilePreferences {
    fn load(&self, key: &str) -> Result<Option<Value>, CoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn store(&self, key: &str, value: &Value) -> Result<(), CoreError> {
        // An unreadable file is replaced rather than blocking every save.
        let mut all = self.read_all().unwrap_or_default();
        all.insert(key.to_owned(), value.clone());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, &e))?;
        }
        let body = serde_json::to_string_pretty(&Value::Object(all)).map_err(|e| {
            CoreError::Preferences {
                message: e.to_string(),
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(|e| io_error(&tmp, &e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| io_error(&self.path, &e))?;
        debug!(path = %self.path.display(), %key, "preferences saved");
        Ok(())
    }
}

fn io_error(path: &Path, err: &std::io::Error) -> CoreError {
    CoreError::Preferences {
        message: format!("{}: {err}", path.display()),
    }
}
