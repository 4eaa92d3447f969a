//! Shared relational execution engine for the blog article and tag services.
//!
//! - [`engine`]: set-once statement results, single-shot statements, and the
//!   transaction actor that serializes statements over one physical
//!   transaction
//! - [`domain`]: keyset pagination and the article/tag statement builders
//! - [`services`]: the Postgres connection registry and error types

pub mod config;
pub mod constants;
pub mod domain;
pub mod engine;
pub mod services;

pub use config::DatabaseConfig;
pub use services::db::{Database, PgTransaction};
pub use services::error::{Error, LogErr, Result};
