//! The physical transaction seam
//!
//! The engine never talks to a driver directly. It asks a `Backend` for an
//! owned transaction handle, lends that handle to statements, and hands it back
//! for COMMIT or ROLLBACK. `services::db::Database` is the Postgres backend.

use async_trait::async_trait;

use crate::services::error::Result;

#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// An open physical transaction
    type Handle: Send + 'static;

    async fn begin(&self) -> Result<Self::Handle>;

    async fn commit(&self, handle: Self::Handle) -> Result<()>;

    async fn rollback(&self, handle: Self::Handle) -> Result<()>;
}
