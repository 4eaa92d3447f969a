//! Transaction actor
//!
//! One spawned task owns the physical transaction handle. Everything else
//! talks to it over channels:
//!
//! - `stmt` queue: statements paired with a private reply channel
//! - `commit` / `rollback`: capacity-1 signal channels carrying a reply for the
//!   physical outcome
//! - error subscription: every statement, commit or rollback failure, for
//!   observers that only want to log
//!
//! The actor runs statements one at a time, so callers sharing a `Transaction`
//! from several tasks never touch the handle concurrently. It stops after the
//! first commit or rollback, or when every `Transaction` clone has been
//! dropped (in which case it rolls back).
//!
//! A statement cut short by a timeout or by its caller going away may still
//! have run part of its work on the server, so the actor marks itself aborted:
//! later statements fail with `Aborted` and `commit` rolls back instead.
//!
//! On the way out it closes the
//! statement queue, fails whatever was still queued, then drops the commit,
//! rollback and error channels in that order.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug, error, warn};
use uuid::Uuid;

use super::backend::Backend;
use super::statement::{Statement, Work};
use crate::constants::STATEMENT_QUEUE_CAPACITY;
use crate::services::error::{Error, Result};

/// Receiving end of a transaction's error stream. Closes when the actor stops.
pub type ErrorSubscription = mpsc::UnboundedReceiver<Error>;

type Reply = oneshot::Sender<Result<()>>;

struct Job<H> {
    work: Work<H>,
    reply: Reply,
}

/// Handle to a running transaction actor. Cheap to clone; clones share the
/// same physical transaction.
pub struct Transaction<H> {
    id: Uuid,
    stmt_tx: mpsc::Sender<Job<H>>,
    commit_tx: mpsc::Sender<Reply>,
    rollback_tx: mpsc::Sender<Reply>,
    errors: Arc<Mutex<Option<ErrorSubscription>>>,
    begin_failure: Arc<OnceLock<Error>>,
}

impl<H: Send + 'static> Transaction<H> {
    /// Build the channels and spawn the actor. The returned receiver resolves
    /// once BEGIN has succeeded or failed.
    pub(crate) fn start<B>(
        backend: Arc<B>,
        statement_timeout: Option<Duration>,
    ) -> (Self, oneshot::Receiver<Result<()>>)
    where
        B: Backend<Handle = H>,
    {
        let id = Uuid::new_v4();
        let (stmt_tx, stmt_rx) = mpsc::channel(STATEMENT_QUEUE_CAPACITY);
        let (commit_tx, commit_rx) = mpsc::channel(1);
        let (rollback_tx, rollback_rx) = mpsc::channel(1);
        let (err_tx, err_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let begin_failure = Arc::new(OnceLock::new());

        let actor = Actor {
            backend,
            stmt_rx,
            commit_rx,
            rollback_rx,
            err_tx,
            statement_timeout,
            begin_failure: Arc::clone(&begin_failure),
            aborted: false,
        };
        tokio::spawn(
            actor
                .run(ready_tx)
                .instrument(tracing::debug_span!("transaction", %id)),
        );

        let tx = Self {
            id,
            stmt_tx,
            commit_tx,
            rollback_tx,
            errors: Arc::new(Mutex::new(Some(err_rx))),
            begin_failure,
        };
        (tx, ready_rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Submit a statement and wait for the actor to run it.
    ///
    /// Statements from one caller apply in submission order. Statements from
    /// concurrent callers are serialized in whatever order the actor receives
    /// them. Dropping the returned future aborts the statement if it is
    /// already running.
    ///
    /// A statement offered to a closed transaction is left unexecuted and can
    /// be retried elsewhere. One still queued when the transaction closes is
    /// consumed.
    pub async fn execute_statement(&self, stmt: &mut Statement<H>) -> Result<()> {
        let permit = self
            .stmt_tx
            .reserve()
            .await
            .map_err(|_| self.closed_error())?;
        let work = stmt.take_work()?;
        let (reply, outcome) = oneshot::channel();
        permit.send(Job { work, reply });

        outcome.await.unwrap_or_else(|_| Err(self.closed_error()))
    }

    /// COMMIT and return the physical outcome. A failure is also published on
    /// the error subscription.
    ///
    /// After an interrupted statement this rolls back and returns `Aborted`.
    pub async fn commit(&self) -> Result<()> {
        self.signal(&self.commit_tx).await
    }

    /// ROLLBACK and return the physical outcome.
    pub async fn rollback(&self) -> Result<()> {
        self.signal(&self.rollback_tx).await
    }

    /// Take the error stream. Only the first call gets it.
    ///
    /// The stream is unbounded, so an idle subscriber never stalls the actor.
    /// Draining it until it closes is how a caller waits for the transaction
    /// to be completely finished.
    pub fn subscribe_error(&self) -> Option<ErrorSubscription> {
        self.errors.lock().take()
    }

    /// True once the actor has stopped serving requests
    pub fn is_closed(&self) -> bool {
        self.stmt_tx.is_closed()
    }

    async fn signal(&self, chan: &mpsc::Sender<Reply>) -> Result<()> {
        let (reply, outcome) = oneshot::channel();
        chan.send(reply).await.map_err(|_| self.closed_error())?;
        outcome.await.unwrap_or_else(|_| Err(self.closed_error()))
    }

    fn closed_error(&self) -> Error {
        match self.begin_failure.get() {
            Some(e) => Error::Begin(Box::new(e.clone())),
            None => Error::TransactionClosed,
        }
    }
}

impl<H> Clone for Transaction<H> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            stmt_tx: self.stmt_tx.clone(),
            commit_tx: self.commit_tx.clone(),
            rollback_tx: self.rollback_tx.clone(),
            errors: Arc::clone(&self.errors),
            begin_failure: Arc::clone(&self.begin_failure),
        }
    }
}

impl<H> fmt::Debug for Transaction<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("closed", &self.stmt_tx.is_closed())
            .finish()
    }
}

/// Read everything left on a subscription until the actor closes it.
pub async fn drain_errors(mut errors: ErrorSubscription) -> Vec<Error> {
    let mut collected = Vec::new();
    while let Some(e) = errors.recv().await {
        collected.push(e);
    }
    collected
}

struct Actor<B: Backend> {
    backend: Arc<B>,
    stmt_rx: mpsc::Receiver<Job<B::Handle>>,
    commit_rx: mpsc::Receiver<Reply>,
    rollback_rx: mpsc::Receiver<Reply>,
    err_tx: mpsc::UnboundedSender<Error>,
    statement_timeout: Option<Duration>,
    begin_failure: Arc<OnceLock<Error>>,
    /// Set once a statement was interrupted mid-flight
    aborted: bool,
}

impl<B: Backend> Actor<B> {
    async fn run(mut self, ready: oneshot::Sender<Result<()>>) {
        match self.backend.begin().await {
            Ok(handle) => {
                debug!("transaction begun");
                let _ = ready.send(Ok(()));
                self.serve(handle).await;
            }
            Err(e) => {
                error!(error = %e, "failed to begin transaction");
                let _ = self.begin_failure.set(e.clone());
                self.publish(e.clone());
                let _ = ready.send(Err(e));
            }
        }
        self.shutdown();
    }

    async fn serve(&mut self, mut handle: B::Handle) {
        loop {
            tokio::select! {
                Some(job) = self.stmt_rx.recv() => {
                    self.run_job(&mut handle, job).await;
                }
                Some(reply) = self.commit_rx.recv() => {
                    let outcome = if self.aborted {
                        if let Err(e) = self.backend.rollback(handle).await {
                            warn!(error = %e, "rollback of aborted transaction failed");
                        }
                        Err(Error::Aborted)
                    } else {
                        self.backend.commit(handle).await
                    };
                    self.finish("commit", outcome, Some(reply));
                    return;
                }
                Some(reply) = self.rollback_rx.recv() => {
                    let outcome = self.backend.rollback(handle).await;
                    self.finish("rollback", outcome, Some(reply));
                    return;
                }
                else => {
                    warn!("all transaction handles dropped without commit, rolling back");
                    let outcome = self.backend.rollback(handle).await;
                    self.finish("rollback", outcome, None);
                    return;
                }
            }
        }
    }

    async fn run_job(&mut self, handle: &mut B::Handle, job: Job<B::Handle>) {
        let Job { work, mut reply } = job;
        if reply.is_closed() {
            debug!("caller went away before its statement ran");
            return;
        }
        if self.aborted {
            self.publish(Error::Aborted);
            let _ = reply.send(Err(Error::Aborted));
            return;
        }

        let outcome = tokio::select! {
            result = self.bounded(work(handle)) => result,
            _ = reply.closed() => Err(Error::Cancelled),
        };

        if let Err(e) = &outcome {
            warn!(error = %e, "statement failed");
            self.publish(e.clone());
            if matches!(e, Error::Timeout { .. } | Error::Cancelled) {
                self.aborted = true;
            }
        }
        let _ = reply.send(outcome);
    }

    async fn bounded(&self, fut: BoxFuture<'_, Result<()>>) -> Result<()> {
        match self.statement_timeout {
            Some(after) => tokio::time::timeout(after, fut)
                .await
                .unwrap_or_else(|_| Err(Error::Timeout { after })),
            None => fut.await,
        }
    }

    fn finish(&self, action: &'static str, outcome: Result<()>, reply: Option<Reply>) {
        match &outcome {
            Ok(()) => debug!(action, "transaction finished"),
            Err(e) => {
                error!(action, error = %e, "transaction did not finish cleanly");
                self.publish(e.clone());
            }
        }
        if let Some(reply) = reply {
            let _ = reply.send(outcome);
        }
    }

    fn publish(&self, e: Error) {
        // nobody subscribed, or the subscriber already hung up
        let _ = self.err_tx.send(e);
    }

    fn shutdown(self) {
        let Actor {
            mut stmt_rx,
            commit_rx,
            rollback_rx,
            err_tx,
            begin_failure,
            ..
        } = self;

        stmt_rx.close();
        while let Ok(job) = stmt_rx.try_recv() {
            let err = match begin_failure.get() {
                Some(e) => Error::Begin(Box::new(e.clone())),
                None => Error::TransactionClosed,
            };
            let _ = job.reply.send(Err(err));
        }

        drop(stmt_rx);
        drop(commit_rx);
        drop(rollback_rx);
        drop(err_tx);
        debug!("transaction actor stopped");
    }
}
