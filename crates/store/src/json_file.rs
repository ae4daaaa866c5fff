//! A small generic JSON-file-backed record table: an in-memory `HashMap`
//! guarded by a `parking_lot::RwLock`, loaded once at startup and flushed
//! back to disk on every mutation. One file per record kind (`routes.json`,
//! `workspaces.json`, `approvals.json`), the JSON-file substitute for the
//! SQL store an operator would otherwise stand up.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mux_domain::error::{Error, Result};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};

pub struct JsonFileTable<V> {
    path: PathBuf,
    records: RwLock<HashMap<String, V>>,
}

impl<V> JsonFileTable<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Load or create the table at `dir/<file_name>`.
    pub fn open(dir: &Path, file_name: &str) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(Error::Io)?;
        let path = dir.join(file_name);
        let records = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            HashMap::new()
        };

        tracing::debug!(records = records.len(), path = %path.display(), "json table loaded");

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.records.read().get(key).cloned()
    }

    pub fn list(&self) -> Vec<V> {
        self.records.read().values().cloned().collect()
    }

    /// Insert or replace a record, then flush to disk.
    pub fn put(&self, key: String, value: V) -> Result<()> {
        self.records.write().insert(key, value);
        self.flush()
    }

    pub fn remove(&self, key: &str) -> Result<Option<V>> {
        let removed = self.records.write().remove(key);
        self.flush()?;
        Ok(removed)
    }

    /// Mutate a record in place if present, then flush. No-op (and returns
    /// `false`) if the key is absent.
    pub fn update(&self, key: &str, f: impl FnOnce(&mut V)) -> Result<bool> {
        let found = {
            let mut records = self.records.write();
            match records.get_mut(key) {
                Some(v) => {
                    f(v);
                    true
                }
                None => false,
            }
        };
        if found {
            self.flush()?;
        }
        Ok(found)
    }

    pub fn flush(&self) -> Result<()> {
        let records = self.records.read();
        let json = serde_json::to_string_pretty(&*records)
            .map_err(|e| Error::Other(format!("serializing {}: {e}", self.path.display())))?;
        std::fs::write(&self.path, json).map_err(Error::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Widget {
        name: String,
        count: u32,
    }

    #[test]
    fn put_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let table = JsonFileTable::<Widget>::open(dir.path(), "widgets.json").unwrap();
        table
            .put("w1".into(), Widget { name: "gizmo".into(), count: 3 })
            .unwrap();
        assert_eq!(table.get("w1").unwrap().count, 3);
    }

    #[test]
    fn reopening_loads_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        {
            let table = JsonFileTable::<Widget>::open(dir.path(), "widgets.json").unwrap();
            table
                .put("w1".into(), Widget { name: "gizmo".into(), count: 3 })
                .unwrap();
        }
        let reopened = JsonFileTable::<Widget>::open(dir.path(), "widgets.json").unwrap();
        assert_eq!(reopened.get("w1").unwrap().name, "gizmo");
    }

    #[test]
    fn update_mutates_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let table = JsonFileTable::<Widget>::open(dir.path(), "widgets.json").unwrap();
        table
            .put("w1".into(), Widget { name: "gizmo".into(), count: 3 })
            .unwrap();
        let found = table.update("w1", |w| w.count += 1).unwrap();
        assert!(found);
        assert_eq!(table.get("w1").unwrap().count, 4);
    }

    #[test]
    fn update_missing_key_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let table = JsonFileTable::<Widget>::open(dir.path(), "widgets.json").unwrap();
        let found = table.update("ghost", |w| w.count += 1).unwrap();
        assert!(!found);
    }

    #[test]
    fn remove_deletes_record() {
        let dir = tempfile::tempdir().unwrap();
        let table = JsonFileTable::<Widget>::open(dir.path(), "widgets.json").unwrap();
        table
            .put("w1".into(), Widget { name: "gizmo".into(), count: 3 })
            .unwrap();
        let removed = table.remove("w1").unwrap();
        assert!(removed.is_some());
        assert!(table.get("w1").is_none());
    }
}
