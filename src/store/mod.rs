//! Store accessor
//!
//! ```text
//! transactions.db (bulk loaded) → TransactionStore (query_only)
//!     ├─ hour_of_day(time)   scalar, shared with segmentation
//!     └─ stddev_pop(x)       population std aggregate
//! ```

pub mod functions;
pub mod pragma;
pub mod reader;
pub mod record;
pub mod schema;

pub use reader::TransactionStore;
pub use record::Transaction;
pub use schema::{create_transactions_table, insert_transactions, NewTransaction};
