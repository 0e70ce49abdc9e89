use std::cell::RefCell;
use std::collections::HashMap;

use super::KeyValueStore;
use crate::error::{Result, VisitorError};

/// Process-local store. Can be told to fail writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes fail, like a quota-exhausted localStorage
    pub fn read_only() -> Self {
        Self {
            entries: RefCell::default(),
            read_only: true,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.read_only {
            return Err(VisitorError::StorageWrite(key.to_string()));
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
