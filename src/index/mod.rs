mod ordered_index;

pub use ordered_index::OrderedIndex;
