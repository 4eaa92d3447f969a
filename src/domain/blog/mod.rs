//! Blog domain - models and statement builders for articles and tags

pub mod models;
pub mod queries;

// Re-export models for convenience
pub use models::*;

// Re-export query modules
pub use queries::{articles, tags};
