use std::path::Path;

use mux_domain::error::Result;
use mux_domain::model::RouteRule;

use crate::json_file::JsonFileTable;

/// Persisted route-rule table (`routes.json`). Seeded from `Config.routes`
/// on first startup; an operator may hand-edit the file afterward.
pub struct RouteStore {
    table: JsonFileTable<RouteRule>,
}

impl RouteStore {
    pub fn open(state_dir: &Path) -> Result<Self> {
        let table = JsonFileTable::open(state_dir, "routes.json")?;
        Ok(Self { table })
    }

    /// Seed from configured rules if the store is empty (first run).
    pub fn seed_if_empty(&self, rules: &[RouteRule]) -> Result<()> {
        if !self.table.list().is_empty() {
            return Ok(());
        }
        for rule in rules {
            self.table.put(rule.id.clone(), rule.clone())?;
        }
        Ok(())
    }

    pub fn list(&self) -> Vec<RouteRule> {
        self.table.list()
    }

    pub fn get(&self, id: &str) -> Option<RouteRule> {
        self.table.get(id)
    }

    pub fn put(&self, rule: RouteRule) -> Result<()> {
        self.table.put(rule.id.clone(), rule)
    }

    pub fn remove(&self, id: &str) -> Result<Option<RouteRule>> {
        self.table.remove(id)
    }
}
