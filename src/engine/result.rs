//! Set-once result containers
//!
//! A statement is built before it runs and read after it ran. The caller keeps
//! a clone of the container, the statement closure owns another, and the
//! closure publishes into it exactly once.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::services::error::{Error, Result};

/// Common surface of the single and multiple value containers
pub trait StatementResult: Clone + Send + Sync + 'static {
    type Value: Send;

    /// Publish a value. Returns `false` and keeps the first value if one was
    /// already published.
    fn set(&self, value: Self::Value) -> bool;

    fn has_been_set(&self) -> bool;
}

struct Slot<T> {
    value: Option<T>,
    has_been_set: bool,
}

impl<T> Slot<T> {
    fn empty() -> Self {
        Self {
            value: None,
            has_been_set: false,
        }
    }

    fn set(&mut self, value: T) -> bool {
        if self.has_been_set {
            tracing::trace!("ignoring second publish into statement result");
            return false;
        }
        self.value = Some(value);
        self.has_been_set = true;
        true
    }
}

/// Holds at most one `T`
pub struct SingleStatementResult<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> SingleStatementResult<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::empty())),
        }
    }

    /// Remove the value, leaving the container set but empty-handed
    pub fn take(&self) -> Option<T> {
        self.slot.lock().value.take()
    }
}

impl<T: Clone> SingleStatementResult<T> {
    pub fn get(&self) -> Option<T> {
        self.slot.lock().value.clone()
    }

    /// Read after a successful execute; `ResultNotSet` otherwise
    pub fn get_strict(&self) -> Result<T> {
        self.get().ok_or(Error::ResultNotSet)
    }
}

impl<T> Default for SingleStatementResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SingleStatementResult<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Send + 'static> StatementResult for SingleStatementResult<T> {
    type Value = T;

    fn set(&self, value: T) -> bool {
        self.slot.lock().set(value)
    }

    fn has_been_set(&self) -> bool {
        self.slot.lock().has_been_set
    }
}

impl<T> fmt::Debug for SingleStatementResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleStatementResult")
            .field("has_been_set", &self.slot.lock().has_been_set)
            .finish()
    }
}

/// Holds at most one sequence of `T`
pub struct MultipleStatementResult<T> {
    slot: Arc<Mutex<Slot<Vec<T>>>>,
}

impl<T> MultipleStatementResult<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::empty())),
        }
    }

    /// Number of published values, zero when unset
    pub fn len(&self) -> usize {
        self.slot.lock().value.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn take(&self) -> Option<Vec<T>> {
        self.slot.lock().value.take()
    }
}

impl<T: Clone> MultipleStatementResult<T> {
    /// The published values, or an empty vec when nothing was published
    pub fn get(&self) -> Vec<T> {
        self.slot.lock().value.clone().unwrap_or_default()
    }

    pub fn get_strict(&self) -> Result<Vec<T>> {
        self.slot.lock().value.clone().ok_or(Error::ResultNotSet)
    }
}

impl<T> Default for MultipleStatementResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for MultipleStatementResult<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Send + 'static> StatementResult for MultipleStatementResult<T> {
    type Value = Vec<T>;

    fn set(&self, value: Vec<T>) -> bool {
        self.slot.lock().set(value)
    }

    fn has_been_set(&self) -> bool {
        self.slot.lock().has_been_set
    }
}

impl<T> fmt::Debug for MultipleStatementResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipleStatementResult")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_keeps_first_value() {
        let result = SingleStatementResult::new();
        assert!(!result.has_been_set());
        assert!(result.set("first".to_string()));
        assert!(!result.set("second".to_string()));
        assert_eq!(result.get().as_deref(), Some("first"));
        assert_eq!(result.get_strict().unwrap(), "first");
    }

    #[test]
    fn test_single_unset_strict_get_fails() {
        let result: SingleStatementResult<i64> = SingleStatementResult::new();
        assert_eq!(result.get(), None);
        assert!(matches!(result.get_strict(), Err(Error::ResultNotSet)));
    }

    #[test]
    fn test_clones_share_the_slot() {
        let result = SingleStatementResult::new();
        let sink = result.clone();
        sink.set(3_i32);
        assert_eq!(result.get(), Some(3));
        assert!(!result.set(4));
        assert_eq!(sink.get(), Some(3));
    }

    #[test]
    fn test_multiple_keeps_first_sequence() {
        let result: MultipleStatementResult<i32> = MultipleStatementResult::new();
        assert!(result.is_empty());
        assert!(result.get().is_empty());
        assert!(matches!(result.get_strict(), Err(Error::ResultNotSet)));

        assert!(result.set(vec![1, 2, 3]));
        assert!(!result.set(vec![9]));
        assert_eq!(result.len(), 3);
        assert_eq!(result.get(), vec![1, 2, 3]);
    }

    #[test]
    fn test_take_does_not_reopen_the_slot() {
        let result = MultipleStatementResult::new();
        result.set(vec!["a"]);
        assert_eq!(result.take(), Some(vec!["a"]));
        assert!(result.has_been_set());
        assert!(!result.set(vec!["b"]));
        assert!(result.get().is_empty());
    }
}
