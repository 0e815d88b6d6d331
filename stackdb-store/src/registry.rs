use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use stackdb_base::{protocol, Result};
use tracing::debug;

use crate::table::Table;

/// Process-wide identifier -> Table mapping (§3, §4.4). Insert-only: once a
/// name is registered its `Arc<Table>` is stable for the life of the
/// process, so sessions may hold a clone of it across registry operations
/// without any lifetime coupling back to the registry.
#[derive(Default)]
pub struct TableRegistry {
    tables: Mutex<BTreeMap<String, Arc<Table>>>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh table named `name`. Concurrent creates of the same
    /// name race to at most one winner; the rest see a fatal `TableExists`
    /// (§4.5/§6: CREATE collision is an `ERROR`, not a recoverable `FAILED`,
    /// so the loser's connection closes).
    pub fn create(&self, name: &str) -> Result<Arc<Table>> {
        let mut tables = self.tables.lock().expect("table registry poisoned");
        if tables.contains_key(name) {
            return Err(protocol(format!("table already exists: {name}")));
        }
        let table = Arc::new(Table::new(name));
        tables.insert(name.to_string(), table.clone());
        debug!(target: "stackdb", table = name, "created table");
        Ok(table)
    }

    pub fn find(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.lock().expect("table registry poisoned").get(name).cloned()
    }
}
