mod joint_row;
mod joint_table;
mod logic;
mod meta_info;
mod query_result;
mod query_table;
mod single_table;

pub use joint_row::JointRow;
pub use joint_table::JointTable;
pub use logic::{passes, CompareOp, Comparer, Condition, Logic, LogicOp, Ternary};
pub use meta_info::{resolve_column, ColumnRef, MetaInfo};
pub use query_result::{ColumnSelector, QueryResult};
pub use query_table::{QueryCursor, QueryTable};
pub use single_table::SingleTable;
