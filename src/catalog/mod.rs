mod context;
mod database;
mod table;
mod table_iter;

pub use context::Context;
pub use database::Database;
pub use table::{StorageStats, Table};
pub use table_iter::{KeyCursor, TableIter};
