mod lru_replacer;

pub use lru_replacer::*;
