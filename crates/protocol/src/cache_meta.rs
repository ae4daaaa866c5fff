use serde::{Deserialize, Serialize};

/// Metadata the dispatch orchestrator merges into a `tools/call` result so
/// the calling agent can tell whether the value came from cache.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheMeta {
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_seconds: Option<u64>,
}

impl CacheMeta {
    pub fn miss() -> Self {
        Self {
            cached: false,
            age_seconds: None,
        }
    }

    pub fn hit(age_seconds: u64) -> Self {
        Self {
            cached: true,
            age_seconds: Some(age_seconds),
        }
    }
}

/// The `_meta` envelope the dispatch orchestrator merges into a `tools/call`
/// result, per the wire contract's `_meta.cache` field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheMeta>,
}
