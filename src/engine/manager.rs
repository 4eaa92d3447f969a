//! Transaction factory

use std::sync::Arc;
use std::time::Duration;

use super::backend::Backend;
use super::transaction::Transaction;
use crate::services::error::{Error, Result};

/// Starts transaction actors on a shared backend
pub struct TransactionManager<B: Backend> {
    backend: Arc<B>,
    statement_timeout: Option<Duration>,
}

impl<B: Backend> TransactionManager<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            statement_timeout: None,
        }
    }

    /// Bound every statement run by transactions started from here
    pub fn with_statement_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.statement_timeout = timeout;
        self
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Spawn an actor and hand back its handle straight away.
    ///
    /// BEGIN runs on the actor. If it fails, the error is published on the
    /// error subscription and every later request on the handle fails with
    /// `Error::Begin`. Must be called inside a tokio runtime.
    pub fn get_and_start(&self) -> Transaction<B::Handle> {
        let (tx, _ready) = Transaction::start(Arc::clone(&self.backend), self.statement_timeout);
        tx
    }

    /// Like `get_and_start`, but wait until BEGIN has succeeded.
    pub async fn begin(&self) -> Result<Transaction<B::Handle>> {
        let (tx, ready) = Transaction::start(Arc::clone(&self.backend), self.statement_timeout);
        match ready.await {
            Ok(Ok(())) => Ok(tx),
            Ok(Err(e)) => Err(Error::Begin(Box::new(e))),
            Err(_) => Err(Error::TransactionClosed),
        }
    }
}

impl<B: Backend> Clone for TransactionManager<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            statement_timeout: self.statement_timeout,
        }
    }
}
