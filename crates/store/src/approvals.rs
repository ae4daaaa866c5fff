use std::path::Path;

use chrono::Utc;
use mux_domain::error::Result;
use mux_domain::model::{ApprovalRecord, ApprovalStatus};

use crate::json_file::JsonFileTable;

/// Persisted approval table (`approvals.json`). The in-memory rendezvous
/// (oneshot channels waiting on a decision) lives in `mux_core::approval`;
/// this store only holds the durable record so a restart can recover
/// pending approvals and sweep stale ones.
pub struct ApprovalStore {
    table: JsonFileTable<ApprovalRecord>,
}

impl ApprovalStore {
    pub fn open(state_dir: &Path) -> Result<Self> {
        let table = JsonFileTable::open(state_dir, "approvals.json")?;
        Ok(Self { table })
    }

    pub fn insert(&self, record: ApprovalRecord) -> Result<()> {
        self.table.put(record.id.clone(), record)
    }

    pub fn get(&self, id: &str) -> Option<ApprovalRecord> {
        self.table.get(id)
    }

    pub fn list_pending(&self) -> Vec<ApprovalRecord> {
        self.table
            .list()
            .into_iter()
            .filter(|a| a.status == ApprovalStatus::Pending)
            .collect()
    }

    pub fn resolve(
        &self,
        id: &str,
        status: ApprovalStatus,
        approver_session_id: Option<String>,
        approver_type: Option<mux_domain::model::ApproverType>,
        resolution: Option<String>,
    ) -> Result<bool> {
        self.table.update(id, |record| {
            record.status = status;
            record.approver_session_id = approver_session_id;
            record.approver_type = approver_type;
            record.resolution = resolution;
            record.resolved_at = Some(Utc::now());
        })
    }

    /// Startup staleness sweep: any record still `Pending` whose age exceeds
    /// `stale_after_sec` is moved to `Timeout`. Returns how many were swept.
    pub fn sweep_stale(&self, stale_after_sec: u64) -> Result<usize> {
        let now = Utc::now();
        let mut swept = 0;
        for record in self.list_pending() {
            let age = (now - record.created_at).num_seconds().max(0) as u64;
            if age >= stale_after_sec {
                self.resolve(&record.id, ApprovalStatus::Timeout, None, None, Some("stale on startup".into()))?;
                swept += 1;
            }
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending_record(id: &str, created_at: chrono::DateTime<Utc>) -> ApprovalRecord {
        ApprovalRecord {
            id: id.into(),
            request_session_id: "sess-1".into(),
            request_client_type: "mcp_agent".into(),
            request_model: None,
            workspace_id: "w1".into(),
            tool_name: "fs__write_file".into(),
            arguments: serde_json::json!({}),
            justification: "edit config".into(),
            route_rule_id: "r1".into(),
            downstream_server_id: "fs".into(),
            auth_scope_id: "default".into(),
            status: ApprovalStatus::Pending,
            approver_session_id: None,
            approver_type: None,
            resolution: None,
            created_at,
            resolved_at: None,
            timeout_sec: 300,
        }
    }

    #[test]
    fn list_pending_excludes_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let store = ApprovalStore::open(dir.path()).unwrap();
        store.insert(pending_record("a1", Utc::now())).unwrap();
        store
            .resolve("a1", ApprovalStatus::Approved, Some("dash".into()), Some(mux_domain::model::ApproverType::Dashboard), None)
            .unwrap();
        assert!(store.list_pending().is_empty());
    }

    #[test]
    fn sweep_stale_times_out_old_pending_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = ApprovalStore::open(dir.path()).unwrap();
        store
            .insert(pending_record("old", Utc::now() - Duration::seconds(7200)))
            .unwrap();
        store.insert(pending_record("fresh", Utc::now())).unwrap();

        let swept = store.sweep_stale(3600).unwrap();
        assert_eq!(swept, 1);
        assert_eq!(store.get("old").unwrap().status, ApprovalStatus::Timeout);
        assert_eq!(store.get("fresh").unwrap().status, ApprovalStatus::Pending);
    }
}
