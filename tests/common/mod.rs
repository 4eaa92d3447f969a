//! In-memory backend for exercising the transaction actor without a database

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use blogdb::engine::{Backend, SingleStatementResult, Statement, StatementResult};
use blogdb::{Error, Result};
use parking_lot::Mutex;

#[derive(Default)]
pub struct MockBackend {
    pub fail_begin: bool,
    pub fail_commit: bool,
    pub begun: AtomicUsize,
    pub committed: AtomicUsize,
    pub rolled_back: AtomicUsize,
    /// Statements applied to any handle, in the order the driver saw them
    pub applied: Arc<Mutex<Vec<String>>>,
    /// Set while a statement is inside the driver
    pub busy: Arc<AtomicBool>,
    pub overlaps: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().clone()
    }
}

pub struct MockConn {
    applied: Arc<Mutex<Vec<String>>>,
    busy: Arc<AtomicBool>,
    overlaps: Arc<AtomicUsize>,
}

impl MockConn {
    /// Pretend to run a statement, recording any re-entrant call
    pub async fn run(&mut self, label: &str, hold: Duration) {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let _busy = BusyGuard(Arc::clone(&self.busy));
        tokio::time::sleep(hold).await;
        self.applied.lock().push(label.to_string());
    }
}

/// Clears the busy flag even when the statement future is dropped mid-sleep
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn driver_error(what: &str) -> Error {
    sqlx::Error::Protocol(format!("{} failed", what)).into()
}

#[async_trait]
impl Backend for MockBackend {
    type Handle = MockConn;

    async fn begin(&self) -> Result<MockConn> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        if self.fail_begin {
            return Err(driver_error("begin"));
        }
        Ok(MockConn {
            applied: Arc::clone(&self.applied),
            busy: Arc::clone(&self.busy),
            overlaps: Arc::clone(&self.overlaps),
        })
    }

    async fn commit(&self, _handle: MockConn) -> Result<()> {
        if self.fail_commit {
            return Err(driver_error("commit"));
        }
        self.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self, _handle: MockConn) -> Result<()> {
        self.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A statement that holds the handle for `hold` and publishes its label
pub fn record(
    label: String,
    hold: Duration,
    out: SingleStatementResult<String>,
) -> Statement<MockConn> {
    Statement::new(out, move |conn: &mut MockConn, out| {
        Box::pin(async move {
            conn.run(&label, hold).await;
            out.set(label);
            Ok::<_, Error>(())
        })
    })
}

/// A statement that fails with `err` without touching the handle
pub fn failing(err: Error) -> Statement<MockConn> {
    Statement::new(SingleStatementResult::<()>::new(), move |_conn: &mut MockConn, _out| {
        Box::pin(async move { Err::<(), _>(err) })
    })
}
