mod lock_manager;
mod table_lock;

pub use lock_manager::*;
pub use table_lock::*;
