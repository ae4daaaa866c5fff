//! Append-only audit trail: one JSON object per line in `audit.jsonl`.
//! Writes are serialized by an internal mutex; the file is never read back
//! into memory (an operator tails or greps it).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mux_domain::error::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub workspace_id: Option<String>,
    pub tool_name: String,
    pub route_rule_id: Option<String>,
    pub downstream_server_id: Option<String>,
    pub outcome: String,
    pub cached: bool,
    /// Redacted call arguments; see the dispatcher's parameter redaction pass.
    pub arguments: Value,
    pub latency_ms: u64,
    #[serde(default)]
    pub response_size: usize,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

pub struct AuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditLog {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(Error::Io)?;
        Ok(Self {
            path: dir.join("audit.jsonl"),
            lock: Mutex::new(()),
        })
    }

    pub fn append(&self, record: &AuditRecord) -> Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| Error::Other(format!("serializing audit record: {e}")))?;
        let _guard = self.lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(Error::Io)?;
        writeln!(file, "{line}").map_err(Error::Io)?;
        Ok(())
    }
}
