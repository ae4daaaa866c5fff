pub mod config;
pub mod error;
pub mod model;
pub mod tool;

pub use config::Config;
pub use error::{Error, Result};
pub use tool::minify_schema;
