//! Strata - a page-cached relational storage and query engine in Rust
//!
//! Tables keep their rows in an ordered primary key index backed by
//! byte-budgeted pages. Only a bounded number of pages stay resident; the rest
//! live in per-page files and are read back on demand.
//!
//! # Architecture
//!
//! - **Storage** (`storage`): page files and the per-table page cache
//!   - `DiskManager`: reads, writes and lists page files
//!   - `DiskScheduler`: serializes disk I/O on a background worker
//!   - `codec`: versioned binary page format
//!   - `PageStore`: index, resident pages, eviction and resurrection
//!
//! - **Buffer** (`buffer`): `LruReplacer` picks the least recently visited
//!   unpinned page to evict
//!
//! - **Concurrency** (`concurrency`): table-level S/X locks
//!   - `TableLock`: the per-table state machine
//!   - `LockManager`: FIFO admission across sessions
//!
//! - **Execution** (`execution`): lazy queries with three-valued predicates
//!   - `SingleTable`: scans, constant predicates and primary key lookups
//!   - `JointTable`: Cartesian joins with primary key acceleration
//!   - `QueryResult`: column projection
//!
//! - **Catalog** (`catalog`): `Context`, `Database` and `Table`
//!
//! - **Service** (`service`): `Session`, autocommit and explicit transactions
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strata::catalog::Context;
//! use strata::common::StorageConfig;
//! use strata::execution::{ColumnSelector, CompareOp, Comparer, Condition, Logic};
//! use strata::service::Session;
//! use strata::tuple::{ColumnType, SchemaBuilder};
//!
//! let context = Arc::new(Context::new(StorageConfig::new("data")).unwrap());
//! context.create_database_if_not_exists("school");
//!
//! let session = Session::connect(Arc::clone(&context), "school").unwrap();
//! let schema = SchemaBuilder::new()
//!     .primary("id", ColumnType::Int)
//!     .string("name", 32)
//!     .build()
//!     .unwrap();
//! session.create_table("person", schema).unwrap();
//! session
//!     .insert("person", None, &[&["0", "'hi'"], &["1", "'hello'"]])
//!     .unwrap();
//!
//! let filter = Logic::condition(Condition::new(
//!     Comparer::column("id"),
//!     CompareOp::Gt,
//!     0.into(),
//! ));
//! let output = session
//!     .select(&["person"], None, &[ColumnSelector::all()], Some(filter))
//!     .unwrap();
//! assert_eq!(output.rows.len(), 1);
//!
//! context.quit().unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod concurrency;
pub mod execution;
pub mod index;
pub mod service;
pub mod storage;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{PageId, Result, SessionId, StorageConfig, StrataError};
