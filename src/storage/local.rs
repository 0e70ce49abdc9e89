use web_sys::Storage;

use super::KeyValueStore;
use crate::error::{Result, VisitorError};

/// `window.localStorage`
#[derive(Debug, Clone)]
pub struct LocalStorageStore {
    storage: Storage,
}

impl LocalStorageStore {
    pub fn new() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| VisitorError::Storage("No window".into()))?;
        let storage = window
            .local_storage()
            .map_err(|_| VisitorError::Storage("localStorage not available".into()))?
            .ok_or_else(|| VisitorError::Storage("localStorage is null".into()))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| VisitorError::Storage(format!("Failed to read {}: {:?}", key, e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.storage
            .set_item(key, value)
            .map_err(|_| VisitorError::StorageWrite(key.to_string()))
    }
}
