// Durable storage for the active company selection

pub mod file;
pub mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Identity;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Key used when selections are not scoped by identity
pub const DEFAULT_SELECTION_KEY: &str = "currentCompanyId";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// A string key/value slot that outlives the process
pub trait SelectionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Whether the persisted selection is shared by every identity on this
/// client or kept per identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScope {
    #[default]
    Global,
    PerIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionKey {
    pub name: String,
    pub scope: KeyScope,
}

impl Default for SelectionKey {
    fn default() -> Self {
        Self {
            name: DEFAULT_SELECTION_KEY.to_string(),
            scope: KeyScope::Global,
        }
    }
}

impl SelectionKey {
    pub fn new(name: impl Into<String>, scope: KeyScope) -> Self {
        Self {
            name: name.into(),
            scope,
        }
    }

    /// Storage key for the given identity
    pub fn resolve(&self, identity: &Identity) -> String {
        match self.scope {
            KeyScope::Global => self.name.clone(),
            KeyScope::PerIdentity => format!("{}:{}", self.name, identity.id),
        }
    }
}
