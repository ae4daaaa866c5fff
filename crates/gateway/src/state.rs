use std::path::PathBuf;
use std::sync::Arc;

use mux_core::approval::ApprovalManager;
use mux_core::bus::EventBus;
use mux_core::dispatch::{CacheAwareDownstream, Dispatcher};
use mux_core::toolcache::ToolCallCache;
use mux_domain::config::Config;
use mux_downstream::{DownstreamManager, StdioDownstreamManager};
use mux_store::{ApprovalStore, AuditLog, RouteStore, WorkspaceStore};

/// The gateway's composition root: every shared service the front door and
/// the admin API reach into, each Arc-wrapped so the whole thing is cheap to
/// clone into a spawned task or an axum handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub routes: Arc<RouteStore>,
    pub workspaces: Arc<WorkspaceStore>,
    pub approval_store: Arc<ApprovalStore>,
    pub approvals: Arc<ApprovalManager>,
    pub cache: Arc<ToolCallCache>,
    pub downstream: Arc<StdioDownstreamManager>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub async fn bootstrap(config: Config) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let state_dir = PathBuf::from(&config.state_dir);
        std::fs::create_dir_all(&state_dir)
            .map_err(|e| anyhow::anyhow!("creating state directory {}: {e}", state_dir.display()))?;

        let routes = Arc::new(RouteStore::open(&state_dir)?);
        routes.seed_if_empty(&config.routes)?;
        let workspaces = Arc::new(WorkspaceStore::open(&state_dir)?);
        workspaces.seed_if_empty(&config.workspaces)?;
        tracing::info!(
            routes = routes.list().len(),
            workspaces = workspaces.list().len(),
            "route and workspace stores ready"
        );

        let approval_store = Arc::new(ApprovalStore::open(&state_dir)?);
        let bus = Arc::new(EventBus::new());
        let approvals = Arc::new(ApprovalManager::new(approval_store.clone(), bus));
        let swept = approvals.expire_stale(config.approval.stale_after_sec)?;
        if swept > 0 {
            tracing::info!(count = swept, "swept stale pending approvals left over from a prior run");
        }

        let audit = Arc::new(AuditLog::open(&state_dir)?);

        let cache = Arc::new(ToolCallCache::new(
            config.cache.tool_calls_capacity,
            config.cache.default_ttl_sec,
            config.tool_call_cache_policies.clone(),
        ));

        let downstream = Arc::new(StdioDownstreamManager::from_config(&config.downstream).await);
        tracing::info!(
            servers = downstream.server_count(),
            tools = downstream.tool_count(),
            "downstream manager ready"
        );

        let cache_aware = CacheAwareDownstream::new(downstream.clone(), cache.clone());
        let dispatcher = Arc::new(Dispatcher::new(
            routes.clone(),
            workspaces.clone(),
            cache_aware,
            approvals.clone(),
            audit,
        ));

        Ok(Self {
            config,
            routes,
            workspaces,
            approval_store,
            approvals,
            cache,
            downstream,
            dispatcher,
        })
    }

    pub async fn shutdown(&self) {
        self.approvals.shutdown();
        self.downstream.shutdown().await;
    }
}
