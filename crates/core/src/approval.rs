//! Approval Manager: suspends a caller until a dashboard or another agent
//! resolves a pending tool call, bounded by a per-route timeout. See
//! SPEC_FULL.md §4.4.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mux_domain::model::{ApprovalRecord, ApprovalStatus, ApproverType};
use mux_store::ApprovalStore;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::bus::EventBus;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApprovalError {
    #[error("approval {0} not found")]
    NotFound(String),
    #[error("approval {0} is already resolved")]
    AlreadyResolved(String),
    #[error("an mcp agent may not approve its own request")]
    SelfApproval,
    #[error("call was cancelled")]
    Cancelled,
}

/// The outcome of waiting on a request: either a decision, or the reason the
/// wait ended without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Approved,
    Denied { reason: Option<String> },
    Timeout,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ApprovalEvent {
    pub approval_id: String,
    pub kind: ApprovalEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalEventKind {
    Pending,
    Resolved,
}

struct PendingEntry {
    tx: oneshot::Sender<ApprovalOutcome>,
    request_session_id: String,
}

/// The in-memory rendezvous for pending approvals. The store is the source
/// of truth for *which* approvals exist; this map is the source of truth
/// for which ones have a live caller currently blocked on them.
pub struct ApprovalManager {
    store: Arc<ApprovalStore>,
    bus: Arc<EventBus<ApprovalEvent>>,
    pending: Mutex<HashMap<String, PendingEntry>>,
}

impl ApprovalManager {
    pub fn new(store: Arc<ApprovalStore>, bus: Arc<EventBus<ApprovalEvent>>) -> Self {
        Self {
            store,
            bus,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Persists `record`, registers a delivery channel, and blocks until a
    /// resolver fires, the timeout elapses, or `cancel` is triggered.
    pub async fn request_approval(&self, record: ApprovalRecord, cancel: CancellationToken) -> Result<ApprovalOutcome, ApprovalError> {
        let id = record.id.clone();
        let timeout_sec = record.timeout_sec;
        let request_session_id = record.request_session_id.clone();

        self.store.insert(record).map_err(|_| ApprovalError::NotFound(id.clone()))?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            pending.insert(
                id.clone(),
                PendingEntry {
                    tx,
                    request_session_id,
                },
            );
        }
        self.bus.publish(ApprovalEvent {
            approval_id: id.clone(),
            kind: ApprovalEventKind::Pending,
        });

        let timeout = tokio::time::sleep(Duration::from_secs(timeout_sec));
        tokio::pin!(timeout);

        tokio::select! {
            _ = cancel.cancelled() => {
                if self.pending.lock().remove(&id).is_some() {
                    let _ = self.store.resolve(&id, ApprovalStatus::Cancelled, None, None, Some("caller cancelled".into()));
                    self.bus.publish(ApprovalEvent { approval_id: id.clone(), kind: ApprovalEventKind::Resolved });
                }
                Ok(ApprovalOutcome::Cancelled)
            }
            _ = &mut timeout => {
                if self.pending.lock().remove(&id).is_some() {
                    let _ = self.store.resolve(&id, ApprovalStatus::Timeout, None, None, Some("timed out".into()));
                    self.bus.publish(ApprovalEvent { approval_id: id.clone(), kind: ApprovalEventKind::Resolved });
                }
                Ok(ApprovalOutcome::Timeout)
            }
            outcome = rx => {
                outcome.map_err(|_| ApprovalError::Cancelled)
            }
        }
    }

    /// Persists the terminal decision and, if a caller is still waiting,
    /// delivers it. The atomic removal of the pending-map entry is the
    /// linearization point: of any concurrent resolvers racing on the same
    /// `id`, exactly one observes `Some` and writes the terminal status, so
    /// a denial can never clobber an approval or vice versa.
    pub fn resolve(
        &self,
        id: &str,
        approver_session_id: &str,
        approver_type: ApproverType,
        approved: bool,
        reason: Option<String>,
    ) -> Result<(), ApprovalError> {
        // Self-approval prevention peeks the rendezvous entry without
        // consuming it, so a rejected self-approval leaves the request
        // pending for a legitimate resolver. Dashboard approvals are exempt.
        if approver_type == ApproverType::McpAgent {
            let pending = self.pending.lock();
            if let Some(entry) = pending.get(id) {
                if entry.request_session_id == approver_session_id {
                    return Err(ApprovalError::SelfApproval);
                }
            }
        }

        let entry = match self.pending.lock().remove(id) {
            Some(entry) => entry,
            None => {
                return Err(match self.store.get(id) {
                    Some(record) if record.status != ApprovalStatus::Pending => ApprovalError::AlreadyResolved(id.to_string()),
                    _ => ApprovalError::NotFound(id.to_string()),
                });
            }
        };

        let status = if approved { ApprovalStatus::Approved } else { ApprovalStatus::Denied };
        if let Err(e) = self
            .store
            .resolve(id, status, Some(approver_session_id.to_string()), Some(approver_type), reason.clone())
        {
            tracing::warn!(approval_id = %id, error = %e, "failed to persist approval resolution; in-memory delivery still proceeds");
        }

        let outcome = if approved {
            ApprovalOutcome::Approved
        } else {
            ApprovalOutcome::Denied { reason }
        };
        let _ = entry.tx.send(outcome);

        self.bus.publish(ApprovalEvent {
            approval_id: id.to_string(),
            kind: ApprovalEventKind::Resolved,
        });
        Ok(())
    }

    /// Snapshot of currently pending approvals, optionally hiding the ones
    /// requested by `exclude_session` (an agent cannot see its own pending
    /// requests).
    pub fn list_pending(&self, exclude_session: Option<&str>) -> Vec<ApprovalRecord> {
        let ids: Vec<String> = self.pending.lock().keys().cloned().collect();
        ids.into_iter()
            .filter_map(|id| self.store.get(&id))
            .filter(|record| record.status == ApprovalStatus::Pending)
            .filter(|record| exclude_session.map(|s| record.request_session_id != s).unwrap_or(true))
            .collect()
    }

    /// Cancels every in-flight wait, delivering `ApprovalOutcome::Denied`.
    /// Used on graceful server shutdown.
    pub fn shutdown(&self) {
        let drained: Vec<(String, PendingEntry)> = {
            let mut pending = self.pending.lock();
            pending.drain().collect()
        };
        for (id, entry) in drained {
            let _ = self.store.resolve(&id, ApprovalStatus::Cancelled, None, None, Some("server shutdown".into()));
            let _ = entry.tx.send(ApprovalOutcome::Denied {
                reason: Some("server shutdown".into()),
            });
            self.bus.publish(ApprovalEvent {
                approval_id: id,
                kind: ApprovalEventKind::Resolved,
            });
        }
    }

    /// Startup sweep: marks orphaned `pending` records from a prior crashed
    /// run as `timeout`.
    pub fn expire_stale(&self, stale_after_sec: u64) -> Result<usize, ApprovalError> {
        self.store
            .sweep_stale(stale_after_sec)
            .map_err(|_| ApprovalError::NotFound("sweep failed".into()))
    }

    pub fn default_timeout_sec(&self) -> u64 {
        mux_domain::model::DEFAULT_APPROVAL_TIMEOUT_SEC
    }
}
