use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::{KeyCursor, Table, TableIter};
use crate::common::{Result, StrataError};
use crate::tuple::{Entry, Row};

use super::{
    passes, resolve_column, CompareOp, Comparer, JointRow, Logic, MetaInfo, QueryCursor,
    QueryTable,
};

/// `target.pk = source.column`: the target row is looked up instead of
/// iterated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dependency {
    target: usize,
    source: usize,
    column: usize,
}

/// Walks the primary keys of two tables in step, yielding equal pairs.
struct MergeJoin {
    left: KeyCursor,
    right: KeyCursor,
}

impl MergeJoin {
    fn next_pair(&mut self) -> Result<Option<(Entry, Entry)>> {
        let mut left = self.left.next_key()?;
        let mut right = self.right.next_key()?;
        loop {
            let ordering = match (&left, &right) {
                (Some(l), Some(r)) => l.cmp(r),
                _ => return Ok(None),
            };
            match ordering {
                Ordering::Less => left = self.left.next_key()?,
                Ordering::Greater => right = self.right.next_key()?,
                Ordering::Equal => return Ok(left.zip(right)),
            }
        }
    }
}

enum Combination {
    Rows(Vec<Row>),
    Discarded,
    Exhausted,
}

/// Join of two or more tables.
///
/// Without a usable primary key equality the rows are the Cartesian product
/// in odometer order, the last table advancing fastest.
pub struct JointTable {
    tables: Vec<Arc<Table>>,
    iterators: Vec<Option<TableIter>>,
    current: Vec<Option<Row>>,
    join_logic: Option<Logic>,
    dependency: Option<Dependency>,
    merge: Option<MergeJoin>,
    seeded: bool,
    exhausted: bool,
    metas: Arc<[MetaInfo]>,
    cursor: QueryCursor,
}

impl JointTable {
    pub fn new(tables: Vec<Arc<Table>>, join_logic: Option<Logic>) -> Self {
        let metas: Arc<[MetaInfo]> = tables.iter().map(|table| table.meta()).collect();
        let mut joint = Self {
            iterators: tables.iter().map(|table| Some(table.iter())).collect(),
            current: vec![None; tables.len()],
            tables,
            join_logic,
            dependency: None,
            merge: None,
            seeded: false,
            exhausted: false,
            metas,
            cursor: QueryCursor::new(),
        };
        joint.simplify_join();
        joint
    }

    /// Replaces a primary key equality with index access.
    fn simplify_join(&mut self) {
        let Some(condition) = self.join_logic.as_ref().and_then(Logic::as_condition) else {
            return;
        };
        let (Comparer::Column(left), Comparer::Column(right)) = (&condition.left, &condition.right)
        else {
            return;
        };
        if condition.op != CompareOp::Eq {
            return;
        }
        let (Ok(left), Ok(right)) = (
            resolve_column(&self.metas, left),
            resolve_column(&self.metas, right),
        ) else {
            return;
        };
        // mixed categories must reach evaluation and fail with TypeMismatch
        if left.table == right.table
            || left.column_type.is_numeric() != right.column_type.is_numeric()
        {
            return;
        }

        let left_pk = left.column == self.tables[left.table].primary_index();
        let right_pk = right.column == self.tables[right.table].primary_index();
        if left_pk && right_pk && self.tables.len() == 2 {
            self.merge = Some(MergeJoin {
                left: self.tables[0].key_cursor(),
                right: self.tables[1].key_cursor(),
            });
            self.iterators = vec![None, None];
            debug!("join on both primary keys, merging");
        } else if left_pk || right_pk {
            let (target, source) = if left_pk { (left, right) } else { (right, left) };
            self.dependency = Some(Dependency {
                target: target.table,
                source: source.table,
                column: source.column,
            });
            self.iterators[target.table] = None;
            debug!(
                table = %self.tables[target.table].name(),
                "join on primary key, looking up"
            );
        } else {
            return;
        }
        self.join_logic = Some(Logic::always());
    }

    fn next_combination(&mut self) -> Result<Combination> {
        if self.exhausted {
            return Ok(Combination::Exhausted);
        }
        if self.merge.is_some() {
            return self.merge_step();
        }

        let advanced = if self.seeded {
            self.advance()?
        } else {
            self.seeded = true;
            self.seed()?
        };
        if !advanced {
            self.exhausted = true;
            return Ok(Combination::Exhausted);
        }

        if let Some(dependency) = self.dependency {
            let key = match &self.current[dependency.source] {
                Some(row) => row.entries()[dependency.column].clone(),
                None => return Ok(Combination::Discarded),
            };
            match self.tables[dependency.target].get(&key) {
                Ok(row) => self.current[dependency.target] = Some(row),
                Err(StrataError::KeyNotExist(_)) => return Ok(Combination::Discarded),
                Err(e) => return Err(e),
            }
        }

        match self.current.iter().cloned().collect::<Option<Vec<Row>>>() {
            Some(rows) => Ok(Combination::Rows(rows)),
            None => Ok(Combination::Discarded),
        }
    }

    fn merge_step(&mut self) -> Result<Combination> {
        let Some(merge) = self.merge.as_mut() else {
            return Ok(Combination::Exhausted);
        };
        let Some((left, right)) = merge.next_pair()? else {
            self.exhausted = true;
            return Ok(Combination::Exhausted);
        };

        let mut rows = Vec::with_capacity(2);
        for (table, key) in self.tables.iter().zip([left, right]) {
            match table.get(&key) {
                Ok(row) => rows.push(row),
                Err(StrataError::KeyNotExist(_)) => return Ok(Combination::Discarded),
                Err(e) => return Err(e),
            }
        }
        Ok(Combination::Rows(rows))
    }

    /// Takes the first row of every iterated table. False if one is empty.
    fn seed(&mut self) -> Result<bool> {
        for (slot, iterator) in self.current.iter_mut().zip(self.iterators.iter_mut()) {
            if let Some(iterator) = iterator {
                match iterator.next() {
                    Some(row) => *slot = Some(row?),
                    None => return Ok(false),
                }
            }
        }
        Ok(true)
    }

    /// Steps the odometer. False once the leftmost iterated table wraps.
    fn advance(&mut self) -> Result<bool> {
        for i in (0..self.tables.len()).rev() {
            let Some(iterator) = self.iterators[i].as_mut() else {
                continue;
            };
            if let Some(row) = iterator.next() {
                self.current[i] = Some(row?);
                return Ok(true);
            }

            // carry into the next iterated table to the left
            if !self.iterators[..i].iter().any(Option::is_some) {
                return Ok(false);
            }
            let mut restarted = self.tables[i].iter();
            match restarted.next() {
                Some(row) => self.current[i] = Some(row?),
                None => return Ok(false),
            }
            self.iterators[i] = Some(restarted);
        }
        Ok(false)
    }
}

impl QueryTable for JointTable {
    fn cursor(&self) -> &QueryCursor {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut QueryCursor {
        &mut self.cursor
    }

    fn prepare_next(&mut self) -> Result<()> {
        loop {
            let rows = match self.next_combination()? {
                Combination::Exhausted => return Ok(()),
                Combination::Discarded => continue,
                Combination::Rows(rows) => rows,
            };
            let row = JointRow::from_rows(&rows, Arc::clone(&self.metas));
            if passes(self.join_logic.as_ref(), &row)? && self.cursor.passes(&row)? {
                self.cursor.push(row);
                return Ok(());
            }
        }
    }

    fn metas(&self) -> Arc<[MetaInfo]> {
        Arc::clone(&self.metas)
    }
}

impl Iterator for JointTable {
    type Item = Result<JointRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}
