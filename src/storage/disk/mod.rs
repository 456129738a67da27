pub mod codec;
mod disk_manager;
mod disk_scheduler;

pub use disk_manager::*;
pub use disk_scheduler::*;
