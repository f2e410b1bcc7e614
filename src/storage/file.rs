use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{SelectionStore, StorageError};

const SELECTION_FILE: &str = "selection.json";

/// Store persisted as a pretty-printed JSON object in `<dir>/selection.json`.
/// A missing file reads as empty.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Store inside a state directory, creating the directory if needed
    pub fn in_dir(dir: &Path) -> Result<Self, StorageError> {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
        Ok(Self::new(dir.join(SELECTION_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl SelectionStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _lock = self.guard.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _lock = self.guard.lock().map_err(|_| StorageError::Poisoned)?;
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _lock = self.guard.lock().map_err(|_| StorageError::Poisoned)?;
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("company-context-{}-{}", name, std::process::id()))
    }

    #[test]
    fn persists_across_instances() {
        let dir = temp_dir("persist");
        let store = FileStore::in_dir(&dir).unwrap();
        assert_eq!(store.get("currentCompanyId").unwrap(), None);

        store.set("currentCompanyId", "B").unwrap();
        store.set("other", "x").unwrap();

        let reopened = FileStore::in_dir(&dir).unwrap();
        assert_eq!(reopened.get("currentCompanyId").unwrap().as_deref(), Some("B"));

        reopened.remove("currentCompanyId").unwrap();
        assert_eq!(store.get("currentCompanyId").unwrap(), None);
        assert_eq!(store.get("other").unwrap().as_deref(), Some("x"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = temp_dir("corrupt");
        let store = FileStore::in_dir(&dir).unwrap();
        fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.get("k"), Err(StorageError::Corrupt(_))));

        fs::remove_dir_all(&dir).unwrap();
    }
}
