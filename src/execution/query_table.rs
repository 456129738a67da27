use std::collections::VecDeque;
use std::sync::Arc;

use crate::common::{Result, StrataError};

use super::{passes, JointRow, Logic, MetaInfo};

/// Buffered state shared by every query source.
///
/// Sources produce matching rows into `queue` one at a time. An error hit
/// while looking ahead is held back until the row already produced has been
/// handed out.
#[derive(Debug)]
pub struct QueryCursor {
    queue: VecDeque<JointRow>,
    is_first: bool,
    selection: Option<Logic>,
    pending_error: Option<StrataError>,
}

impl QueryCursor {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            is_first: true,
            selection: None,
            pending_error: None,
        }
    }

    /// Queues a produced row.
    pub fn push(&mut self, row: JointRow) {
        self.queue.push_back(row);
    }

    pub fn pop(&mut self) -> Option<JointRow> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// True until the first row has been requested.
    pub fn is_first(&self) -> bool {
        self.is_first
    }

    pub fn selection(&self) -> Option<&Logic> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Option<Logic>) {
        self.selection = selection;
    }

    /// Applies the selection to `row`.
    pub fn passes(&self, row: &JointRow) -> Result<bool> {
        passes(self.selection.as_ref(), row)
    }
}

impl Default for QueryCursor {
    fn default() -> Self {
        Self::new()
    }
}

/// A lazy source of joint rows.
///
/// Implementors provide `prepare_next`, which pushes at most one row that
/// passes the selection onto the cursor queue, and leaves the queue empty
/// once the source is exhausted.
pub trait QueryTable: Send {
    fn cursor(&self) -> &QueryCursor;

    fn cursor_mut(&mut self) -> &mut QueryCursor;

    /// Produces the next matching row, if any, into the cursor queue.
    fn prepare_next(&mut self) -> Result<()>;

    /// Schemas of the tables whose rows this source concatenates.
    fn metas(&self) -> Arc<[MetaInfo]>;

    /// Replaces the selection. Must be called before the first row is read.
    fn set_selection(&mut self, selection: Option<Logic>) {
        self.cursor_mut().set_selection(selection);
    }

    fn has_next(&self) -> bool {
        let cursor = self.cursor();
        cursor.is_first || !cursor.queue.is_empty() || cursor.pending_error.is_some()
    }

    /// Returns the next row, preparing one more ahead of time.
    fn next_row(&mut self) -> Result<Option<JointRow>> {
        if let Some(e) = self.cursor_mut().pending_error.take() {
            return Err(e);
        }

        if self.cursor().is_empty() {
            let prepared = self.prepare_next();
            self.cursor_mut().is_first = false;
            prepared?;
        }

        let Some(row) = self.cursor_mut().pop() else {
            return Ok(None);
        };

        if let Err(e) = self.prepare_next() {
            self.cursor_mut().pending_error = Some(e);
        }
        Ok(Some(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{ColumnType, Entry, Row, SchemaBuilder};

    /// Yields 0..limit, failing once when it reaches `fail_at`.
    struct Counter {
        next: i32,
        limit: i32,
        fail_at: Option<i32>,
        metas: Arc<[MetaInfo]>,
        cursor: QueryCursor,
    }

    impl Counter {
        fn new(limit: i32, fail_at: Option<i32>) -> Self {
            let schema = SchemaBuilder::new()
                .primary("n", ColumnType::Int)
                .build_arc()
                .unwrap();
            Self {
                next: 0,
                limit,
                fail_at,
                metas: vec![MetaInfo::new("counter", schema)].into(),
                cursor: QueryCursor::new(),
            }
        }
    }

    impl QueryTable for Counter {
        fn cursor(&self) -> &QueryCursor {
            &self.cursor
        }

        fn cursor_mut(&mut self) -> &mut QueryCursor {
            &mut self.cursor
        }

        fn prepare_next(&mut self) -> Result<()> {
            if self.fail_at == Some(self.next) {
                self.fail_at = None;
                return Err(StrataError::KeyNotExist(self.next.to_string()));
            }
            while self.next < self.limit {
                let row = JointRow::single(
                    Row::new(vec![Entry::Int(self.next)]),
                    Arc::clone(&self.metas),
                );
                self.next += 1;
                if self.cursor.passes(&row)? {
                    self.cursor.push(row);
                    break;
                }
            }
            Ok(())
        }

        fn metas(&self) -> Arc<[MetaInfo]> {
            Arc::clone(&self.metas)
        }
    }

    fn drain(source: &mut impl QueryTable) -> Vec<i32> {
        let mut out = Vec::new();
        while let Some(row) = source.next_row().unwrap() {
            match row.entries()[0] {
                Entry::Int(n) => out.push(n),
                _ => unreachable!(),
            }
        }
        out
    }

    #[test]
    fn test_query_table_lookahead() {
        let mut source = Counter::new(3, None);
        assert!(source.has_next());
        assert_eq!(source.next_row().unwrap().map(|r| r.entries()[0].clone()), Some(Entry::Int(0)));
        // one row is always prepared ahead
        assert_eq!(source.cursor().queue.len(), 1);
        assert_eq!(drain(&mut source), vec![1, 2]);
        assert!(!source.has_next());
        assert!(source.next_row().unwrap().is_none());
    }

    #[test]
    fn test_query_table_empty_source() {
        let mut source = Counter::new(0, None);
        assert!(source.has_next());
        assert!(source.next_row().unwrap().is_none());
        assert!(!source.has_next());
    }

    #[test]
    fn test_query_table_selection() {
        use crate::execution::{CompareOp, Comparer, Condition};

        let mut source = Counter::new(10, None);
        source.set_selection(Some(Logic::condition(Condition::new(
            Comparer::column("n"),
            CompareOp::Ge,
            7.into(),
        ))));
        assert_eq!(drain(&mut source), vec![7, 8, 9]);
    }

    #[test]
    fn test_query_table_lookahead_error_is_deferred() {
        let mut source = Counter::new(3, Some(1));
        assert!(source.next_row().unwrap().is_some());
        assert!(source.has_next());
        assert!(matches!(source.next_row(), Err(StrataError::KeyNotExist(_))));
        assert_eq!(drain(&mut source), vec![1, 2]);
    }
}
