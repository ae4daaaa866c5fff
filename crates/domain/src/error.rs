//! Shared error type used across all mux crates.

/// Errors that can surface from config loading, store I/O, or shared domain
/// logic. Crate-specific domain sentinels (route/approval outcomes) live
/// closer to the code that produces them — see `mux_core::route::RouteError`
/// and `mux_core::approval::ApprovalError`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML: {0}")]
    Toml(String),

    #[error("config: {0}")]
    Config(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
