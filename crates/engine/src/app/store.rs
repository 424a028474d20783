use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode store file: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write store file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// String-keyed, string-valued persistent store with last-write-wins
/// semantics. Values are written through to a single JSON file on every set;
/// a malformed file on load degrades to an empty store instead of failing.
/// Typed encoding/decoding of the values is the caller's concern.
#[derive(Debug)]
pub struct KeyValueStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl KeyValueStore {
    /// Opens the store at `path`, tolerating a missing or malformed file.
    pub fn open(path: PathBuf) -> Self {
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "store_file_malformed_starting_empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(error) if error.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => {
                warn!(
                    path = %path.display(),
                    error = %error,
                    "store_file_unreadable_starting_empty"
                );
                BTreeMap::new()
            }
        };
        Self {
            path: Some(path),
            entries,
        }
    }

    /// Store without a backing file; used by tests and headless tools.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
        }
    }

    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set_raw(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
        self.flush();
    }

    pub fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.flush();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.flush();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Synchronous write-through so a save is visible to any read that
    /// follows it in the same tick. Failures are logged, not propagated;
    /// gameplay never aborts on a failed save.
    fn flush(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(error) = self.try_flush(path) {
            warn!(path = %path.display(), error = %error, "store_write_failed");
        }
    }

    fn try_flush(&self, path: &Path) -> Result<(), StoreError> {
        let encoded =
            serde_json::to_string_pretty(&self.entries).map_err(StoreError::Encode)?;
        write_text_atomic(path, &encoded).map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Writes via a sibling temp file and rename so a crash mid-write never
/// leaves a truncated store behind.
fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, text)?;
    replace_file(&tmp_path, path)
}

fn replace_file(tmp_path: &Path, final_path: &Path) -> io::Result<()> {
    match fs::remove_file(final_path) {
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(tmp_path);
            return Err(error);
        }
    }

    if let Err(error) = fs::rename(tmp_path, final_path) {
        let _ = fs::remove_file(tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("store.tmp");
    let tmp_name = format!("{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}
