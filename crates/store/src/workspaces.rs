use std::path::Path;

use mux_domain::error::Result;
use mux_domain::model::Workspace;

use crate::json_file::JsonFileTable;

/// Persisted workspace table (`workspaces.json`). Seeded from
/// `Config.workspaces` on first startup.
pub struct WorkspaceStore {
    table: JsonFileTable<Workspace>,
}

impl WorkspaceStore {
    pub fn open(state_dir: &Path) -> Result<Self> {
        let table = JsonFileTable::open(state_dir, "workspaces.json")?;
        Ok(Self { table })
    }

    pub fn seed_if_empty(&self, workspaces: &[Workspace]) -> Result<()> {
        if !self.table.list().is_empty() {
            return Ok(());
        }
        for ws in workspaces {
            self.table.put(ws.id.clone(), ws.clone())?;
        }
        Ok(())
    }

    pub fn list(&self) -> Vec<Workspace> {
        self.table.list()
    }

    pub fn get(&self, id: &str) -> Option<Workspace> {
        self.table.get(id)
    }

    pub fn put(&self, workspace: Workspace) -> Result<()> {
        self.table.put(workspace.id.clone(), workspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_and_list_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkspaceStore::open(dir.path()).unwrap();
        store
            .seed_if_empty(&[Workspace { id: "w1".into(), name: "root".into(), root_path: "/".into() }])
            .unwrap();
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.get("w1").unwrap().name, "root");
    }
}
