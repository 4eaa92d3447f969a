//! Single-shot units of database work
//!
//! A `Statement` pairs a closure with the result container it publishes into.
//! The closure receives a live transaction handle, so the same statement can
//! run on its own transaction or inside a shared one:
//!
//! ```ignore
//! let out = SingleStatementResult::new();
//! let mut stmt = articles::get_article("42".into(), out.clone());
//!
//! // standalone: begins, runs, commits (or rolls back on error)
//! stmt.execute(&database).await?;
//!
//! // or inside a shared transaction, commit belongs to the caller
//! tx.execute_statement(&mut stmt).await?;
//!
//! let article = out.get_strict()?;
//! ```

use std::fmt;

use futures::future::BoxFuture;

use super::backend::Backend;
use super::result::StatementResult;
use crate::services::error::{Error, Result};

/// The type-erased body of a statement, ready to be run against a handle
pub(crate) type Work<H> =
    Box<dyn for<'c> FnOnce(&'c mut H) -> BoxFuture<'c, Result<()>> + Send + 'static>;

fn erase<H, F>(f: F) -> Work<H>
where
    F: for<'c> FnOnce(&'c mut H) -> BoxFuture<'c, Result<()>> + Send + 'static,
{
    Box::new(f)
}

pub struct Statement<H> {
    work: Option<Work<H>>,
    executed: bool,
}

impl<H: Send + 'static> Statement<H> {
    /// Wrap `f`, which will be called once with the handle and `result`.
    pub fn new<R, F>(result: R, f: F) -> Self
    where
        R: StatementResult,
        F: for<'c> FnOnce(&'c mut H, R) -> BoxFuture<'c, Result<()>> + Send + 'static,
    {
        Self {
            work: Some(erase(move |handle: &mut H| f(handle, result))),
            executed: false,
        }
    }

    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Run on a transaction of its own: BEGIN, run, then COMMIT on success or
    /// ROLLBACK on failure.
    pub async fn execute<B>(&mut self, backend: &B) -> Result<()>
    where
        B: Backend<Handle = H>,
    {
        let work = self.take_work()?;
        let mut handle = backend.begin().await?;

        match work(&mut handle).await {
            Ok(()) => backend.commit(handle).await,
            Err(e) => {
                if let Err(rollback_err) = backend.rollback(handle).await {
                    tracing::warn!(
                        error = %rollback_err,
                        "rollback after failed statement also failed"
                    );
                }
                Err(e)
            }
        }
    }

    /// Run against a handle owned by someone else. Never commits.
    pub async fn execute_in(&mut self, handle: &mut H) -> Result<()> {
        let work = self.take_work()?;
        work(handle).await
    }

    /// Flip the executed flag and hand out the body, or `AlreadyExecuted`.
    pub(crate) fn take_work(&mut self) -> Result<Work<H>> {
        if self.executed {
            return Err(Error::AlreadyExecuted);
        }
        self.executed = true;
        self.work.take().ok_or(Error::AlreadyExecuted)
    }
}

impl<H> fmt::Debug for Statement<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("executed", &self.executed)
            .finish()
    }
}
