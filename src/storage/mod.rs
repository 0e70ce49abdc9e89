//! Key-value persistence for the visit counter.
//!
//! The counter is a plain read-then-write with no lock. Two tabs finishing
//! a cycle at the same moment can both read N and both write N+1.

mod local;
mod memory;

pub use local::LocalStorageStore;
pub use memory::MemoryStore;

use crate::error::Result;

/// Minimal string key-value store.
///
/// `get` distinguishes "absent" (`Ok(None)`) from "store unusable" (`Err`).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Visit counter persisted under a single key
pub struct VisitCounter<'a> {
    store: &'a dyn KeyValueStore,
    key: &'a str,
}

impl<'a> VisitCounter<'a> {
    pub const DEFAULT: u64 = 1;

    pub fn new(store: &'a dyn KeyValueStore, key: &'a str) -> Self {
        Self { store, key }
    }

    /// Current count. Absent or non-numeric values read as 1.
    pub fn read(&self) -> Result<u64> {
        let raw = self.store.get(self.key)?;
        Ok(parse_count(raw.as_deref()))
    }

    /// Store `shown + 1`, where `shown` is the value the snapshot reports.
    pub fn advance(&self, shown: u64) -> Result<u64> {
        let next = shown.saturating_add(1);
        self.store.set(self.key, &next.to_string())?;
        log::debug!("Visit counter {} -> {}", shown, next);
        Ok(next)
    }
}

/// Leading-integer parse: `"7"` and `"7abc"` give 7. Anything without
/// leading digits, and zero, gives the default.
fn parse_count(raw: Option<&str>) -> u64 {
    let Some(raw) = raw else {
        return VisitCounter::DEFAULT;
    };
    let trimmed = raw.trim_start();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    match trimmed[..digits_end].parse::<u64>() {
        Ok(n) if n >= VisitCounter::DEFAULT => n,
        _ => {
            log::warn!("Ignoring unusable visit counter {:?}", raw);
            VisitCounter::DEFAULT
        }
    }
}
