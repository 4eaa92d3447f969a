//! Statement execution engine: set-once results, single-shot statements, and
//! the transaction actor that serializes them.

pub mod backend;
pub mod manager;
pub mod result;
pub mod statement;
pub mod transaction;

pub use backend::Backend;
pub use manager::TransactionManager;
pub use result::{MultipleStatementResult, SingleStatementResult, StatementResult};
pub use statement::Statement;
pub use transaction::{ErrorSubscription, Transaction, drain_errors};
