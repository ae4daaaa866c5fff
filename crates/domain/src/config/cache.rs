use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Generic cache sizing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Max entries held by the tool-definition cache (keyed by downstream server).
    #[serde(default = "d_tool_defs_capacity")]
    pub tool_defs_capacity: usize,

    /// Max entries held by the tool-call result cache.
    #[serde(default = "d_tool_calls_capacity")]
    pub tool_calls_capacity: usize,

    /// Default TTL (seconds) applied to a cacheable call when a server's
    /// policy doesn't specify its own. 0 is treated as a policy-local
    /// override meaning "indefinite"; this default itself must be positive.
    #[serde(default = "d_default_ttl_sec")]
    pub default_ttl_sec: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            tool_defs_capacity: d_tool_defs_capacity(),
            tool_calls_capacity: d_tool_calls_capacity(),
            default_ttl_sec: d_default_ttl_sec(),
        }
    }
}

fn d_tool_defs_capacity() -> usize {
    256
}
fn d_tool_calls_capacity() -> usize {
    4096
}
fn d_default_ttl_sec() -> u64 {
    1800
}

/// Per-downstream-server cache policy: which tools are cacheable, which are
/// mutating (and therefore invalidate the server's cached entries), and the
/// TTL to apply. See SPEC_FULL.md §4.2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallCachePolicy {
    pub downstream_server_id: String,
    /// Master switch: a configured-but-disabled server keeps its patterns
    /// on record (for a future re-enable) without caching anything.
    #[serde(default = "d_enabled")]
    pub enabled: bool,
    /// Glob patterns (bare tool name, or name plus `_`-separated suffix)
    /// matched against the tool name to decide cacheability.
    #[serde(default)]
    pub cacheable: Vec<String>,
    /// Glob patterns identifying mutating tools; a match invalidates every
    /// cached entry for this server's `(server, auth_scope)` pair.
    #[serde(default)]
    pub mutating: Vec<String>,
    /// 0 = cache indefinitely, negative = use the 30-minute default,
    /// positive = TTL in seconds.
    #[serde(default)]
    pub ttl_sec: i64,
    /// Per-server cap on cached entries, independent of the cache's global
    /// `tool_calls_capacity`. `None` means the server is bound only by the
    /// global cap.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

fn d_enabled() -> bool {
    true
}

impl ToolCallCachePolicy {
    pub fn new(downstream_server_id: impl Into<String>) -> Self {
        Self {
            downstream_server_id: downstream_server_id.into(),
            enabled: true,
            cacheable: Vec::new(),
            mutating: Vec::new(),
            ttl_sec: 0,
            max_entries: None,
        }
    }
}
