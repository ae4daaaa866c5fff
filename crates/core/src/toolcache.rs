//! Tool-call cache: a policy layer over [`crate::cache::GenericCache`] that
//! decides cacheability and mutation-driven invalidation per downstream
//! server. See SPEC_FULL.md §4.2.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use mux_domain::config::ToolCallCachePolicy;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::cache::{CacheStats, GenericCache, LoadError};

/// `(server_id, auth_scope_id, tool_name, args_fingerprint)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolCallKey {
    pub server_id: String,
    pub auth_scope_id: String,
    pub tool_name: String,
    pub args_fingerprint: String,
}

/// First 8 bytes (hex-encoded) of a SHA-256 digest over the argument bytes
/// exactly as received — callers must not pre-canonicalize (see SPEC_FULL.md
/// §4.2's key-construction note).
pub fn fingerprint(args_bytes: &[u8]) -> String {
    let digest = Sha256::digest(args_bytes);
    hex::encode(&digest[..8])
}

/// `0` = effectively indefinite, negative = a fixed 30-minute default,
/// positive = that many seconds.
const NEGATIVE_TTL_DEFAULT_SEC: u64 = 1800;
const INDEFINITE_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 50);

fn resolve_ttl(ttl_sec: i64) -> Duration {
    match ttl_sec.cmp(&0) {
        std::cmp::Ordering::Equal => INDEFINITE_TTL,
        std::cmp::Ordering::Less => Duration::from_secs(NEGATIVE_TTL_DEFAULT_SEC),
        std::cmp::Ordering::Greater => Duration::from_secs(ttl_sec as u64),
    }
}

/// Matches a single shell-style glob restricted to a trailing `*` or the
/// literal `*`, against `name` and every `_`-separated suffix of `name` —
/// so `get_*` matches both `get_task` and `clickup_get_task`.
pub fn tool_name_matches(pattern: &str, bare_name: &str) -> bool {
    let suffixes = name_suffixes(bare_name);
    suffixes.iter().any(|candidate| glob_matches(pattern, candidate))
}

fn glob_matches(pattern: &str, name: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}

/// `name` itself plus every suffix obtained by dropping a leading
/// `_`-separated segment: `clickup_get_task` → `["clickup_get_task",
/// "get_task", "task"]`.
fn name_suffixes(name: &str) -> Vec<&str> {
    let mut suffixes = vec![name];
    let mut rest = name;
    while let Some(idx) = rest.find('_') {
        rest = &rest[idx + 1..];
        suffixes.push(rest);
    }
    suffixes
}

/// Strip a `<ns>__<bare>` namespace prefix if present.
pub fn bare_tool_name(namespaced: &str) -> &str {
    namespaced.split_once("__").map(|(_, bare)| bare).unwrap_or(namespaced)
}

pub struct ToolCallCache {
    cache: GenericCache<ToolCallKey, Vec<u8>>,
    policies: Vec<ToolCallCachePolicy>,
    default_ttl_sec: u64,
    /// Per-server insertion order, maintained only for servers whose policy
    /// sets `max_entries`, so a server-local cap can be enforced
    /// independently of the cache's shared global LRU order.
    server_order: Mutex<HashMap<String, VecDeque<ToolCallKey>>>,
}

impl ToolCallCache {
    pub fn new(capacity: usize, default_ttl_sec: u64, policies: Vec<ToolCallCachePolicy>) -> Self {
        Self {
            cache: GenericCache::new(capacity, Duration::from_secs(default_ttl_sec.max(1))),
            policies,
            default_ttl_sec,
            server_order: Mutex::new(HashMap::new()),
        }
    }

    fn policy_for(&self, server_id: &str) -> Option<&ToolCallCachePolicy> {
        self.policies.iter().find(|p| p.downstream_server_id == server_id)
    }

    /// Server has an `enabled` policy AND the bare tool name matches one of
    /// its `cacheable` patterns.
    pub fn is_cacheable(&self, server_id: &str, bare_tool_name: &str) -> bool {
        match self.policy_for(server_id) {
            Some(policy) => policy.enabled && policy.cacheable.iter().any(|p| tool_name_matches(p, bare_tool_name)),
            None => false,
        }
    }

    /// Independent of whether the server has caching enabled at all.
    pub fn is_mutation(&self, server_id: &str, bare_tool_name: &str) -> bool {
        match self.policy_for(server_id) {
            Some(policy) => policy.mutating.iter().any(|p| tool_name_matches(p, bare_tool_name)),
            None => false,
        }
    }

    fn ttl_for(&self, server_id: &str) -> Duration {
        match self.policy_for(server_id) {
            Some(policy) => resolve_ttl(policy.ttl_sec),
            None => Duration::from_secs(self.default_ttl_sec),
        }
    }

    pub fn get_with_age(&self, key: &ToolCallKey) -> Option<(Vec<u8>, Duration)> {
        self.cache.get_with_age(key)
    }

    pub fn set(&self, key: ToolCallKey, value: Vec<u8>) {
        let ttl = self.ttl_for(&key.server_id);
        self.cache.set_with_ttl(key.clone(), value, ttl);
        self.enforce_max_entries(key);
    }

    /// If `server_id`'s policy sets `max_entries`, evicts the oldest entries
    /// for that server until it fits, tracked independently of the shared
    /// cache's global LRU order.
    fn enforce_max_entries(&self, key: ToolCallKey) {
        let Some(max) = self.policy_for(&key.server_id).and_then(|p| p.max_entries) else {
            return;
        };
        let mut order = self.server_order.lock();
        let queue = order.entry(key.server_id.clone()).or_default();
        queue.retain(|existing| existing != &key);
        queue.push_back(key);
        while queue.len() > max {
            if let Some(stale) = queue.pop_front() {
                self.cache.invalidate(&stale);
            }
        }
    }

    pub async fn get_or_load<F, Fut>(&self, key: ToolCallKey, load_fn: F) -> Result<Vec<u8>, LoadError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<u8>, LoadError>>,
    {
        // Single-flight coalescing always goes through the underlying cache
        // (which applies its own default TTL on insert); when the server's
        // policy specifies a different TTL we immediately re-stamp the
        // entry's expiry afterward so later reads honor the policy.
        let ttl = self.ttl_for(&key.server_id);
        let result = self.cache.get_or_load(key.clone(), load_fn).await;
        if let Ok(value) = &result {
            if ttl != self.cache_default_ttl() {
                self.cache.set_with_ttl(key.clone(), value.clone(), ttl);
            }
            self.enforce_max_entries(key);
        }
        result
    }

    fn cache_default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_sec)
    }

    /// Deliberately coarse: invalidates every cached entry for
    /// `(server_id, auth_scope_id)` regardless of tool name.
    pub fn invalidate_for_mutation(&self, server_id: &str, auth_scope_id: &str) -> usize {
        let server_id = server_id.to_string();
        let auth_scope_id = auth_scope_id.to_string();
        self.cache
            .invalidate_where(|key| key.server_id == server_id && key.auth_scope_id == auth_scope_id)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn flush(&self) {
        self.cache.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ToolCallCachePolicy {
        ToolCallCachePolicy {
            downstream_server_id: "clickup".into(),
            enabled: true,
            cacheable: vec!["get_*".into(), "search".into()],
            mutating: vec!["create_*".into(), "update_*".into()],
            ttl_sec: 0,
            max_entries: None,
        }
    }

    #[test]
    fn pattern_matches_bare_and_suffix() {
        assert!(tool_name_matches("get_*", "get_task"));
        assert!(tool_name_matches("get_*", "clickup_get_task"));
        assert!(tool_name_matches("search_*", "search"));
        assert!(!tool_name_matches("get_*", "create_task"));
    }

    #[test]
    fn bare_tool_name_strips_namespace() {
        assert_eq!(bare_tool_name("clickup__get_task"), "get_task");
        assert_eq!(bare_tool_name("get_task"), "get_task");
    }

    #[test]
    fn is_cacheable_and_is_mutation_respect_policy() {
        let cache = ToolCallCache::new(64, 1800, vec![policy()]);
        assert!(cache.is_cacheable("clickup", "get_task"));
        assert!(cache.is_mutation("clickup", "create_task"));
        assert!(!cache.is_cacheable("clickup", "create_task"));
    }

    #[test]
    fn unknown_server_is_not_cacheable() {
        let cache = ToolCallCache::new(64, 1800, vec![policy()]);
        assert!(!cache.is_cacheable("ghost", "get_task"));
        assert!(!cache.is_mutation("ghost", "create_task"));
    }

    #[test]
    fn disabled_policy_is_never_cacheable_but_mutation_detection_is_unaffected() {
        let mut disabled = policy();
        disabled.enabled = false;
        let cache = ToolCallCache::new(64, 1800, vec![disabled]);
        assert!(!cache.is_cacheable("clickup", "get_task"));
        assert!(cache.is_mutation("clickup", "create_task"));
    }

    #[test]
    fn max_entries_caps_a_single_servers_footprint_independent_of_global_capacity() {
        let mut capped = policy();
        capped.max_entries = Some(2);
        let cache = ToolCallCache::new(64, 1800, vec![capped]);

        for i in 0..4 {
            cache.set(
                ToolCallKey {
                    server_id: "clickup".into(),
                    auth_scope_id: "default".into(),
                    tool_name: "get_task".into(),
                    args_fingerprint: format!("f{i}"),
                },
                b"cached".to_vec(),
            );
        }

        assert!(cache
            .get_with_age(&ToolCallKey {
                server_id: "clickup".into(),
                auth_scope_id: "default".into(),
                tool_name: "get_task".into(),
                args_fingerprint: "f0".into(),
            })
            .is_none());
        assert!(cache
            .get_with_age(&ToolCallKey {
                server_id: "clickup".into(),
                auth_scope_id: "default".into(),
                tool_name: "get_task".into(),
                args_fingerprint: "f3".into(),
            })
            .is_some());
    }

    #[test]
    fn ttl_resolution_follows_sign_convention() {
        assert_eq!(resolve_ttl(30), Duration::from_secs(30));
        assert_eq!(resolve_ttl(-1), Duration::from_secs(NEGATIVE_TTL_DEFAULT_SEC));
        assert_eq!(resolve_ttl(0), INDEFINITE_TTL);
    }

    #[test]
    fn invalidate_for_mutation_only_clears_matching_scope() {
        let cache = ToolCallCache::new(64, 1800, vec![policy()]);
        cache.set(
            ToolCallKey {
                server_id: "clickup".into(),
                auth_scope_id: "scope-a".into(),
                tool_name: "get_task".into(),
                args_fingerprint: "f1".into(),
            },
            b"cached".to_vec(),
        );
        cache.set(
            ToolCallKey {
                server_id: "clickup".into(),
                auth_scope_id: "scope-b".into(),
                tool_name: "get_task".into(),
                args_fingerprint: "f1".into(),
            },
            b"cached".to_vec(),
        );

        let removed = cache.invalidate_for_mutation("clickup", "scope-a");
        assert_eq!(removed, 1);
        assert!(cache
            .get_with_age(&ToolCallKey {
                server_id: "clickup".into(),
                auth_scope_id: "scope-a".into(),
                tool_name: "get_task".into(),
                args_fingerprint: "f1".into(),
            })
            .is_none());
        assert!(cache
            .get_with_age(&ToolCallKey {
                server_id: "clickup".into(),
                auth_scope_id: "scope-b".into(),
                tool_name: "get_task".into(),
                args_fingerprint: "f1".into(),
            })
            .is_some());
    }

    #[test]
    fn fingerprint_is_stable_and_distinguishes_distinct_bytes() {
        let a = fingerprint(br#"{"path":"/tmp"}"#);
        let b = fingerprint(br#"{"path":"/tmp"}"#);
        let c = fingerprint(br#"{"path":"/other"}"#);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }
}
