use std::sync::Arc;

use crate::catalog::{Table, TableIter};
use crate::common::{Result, StrataError};
use crate::tuple::Row;

use super::{CompareOp, Comparer, JointRow, Logic, MetaInfo, QueryCursor, QueryTable};

/// How a single-table query reads its rows, chosen from the selection.
#[derive(Debug, Clone, PartialEq)]
enum ScanPlan {
    /// Every row in key order
    FullScan,
    /// The selection has no column operand; decided on the first pull
    Constant,
    /// `pk = constant`
    PointLookup(Comparer),
    /// Every row the selection accepts
    Filter,
    Done,
}

/// Query source over one table.
pub struct SingleTable {
    table: Arc<Table>,
    rows: TableIter,
    metas: Arc<[MetaInfo]>,
    plan: ScanPlan,
    cursor: QueryCursor,
}

impl SingleTable {
    pub fn new(table: Arc<Table>) -> Self {
        let metas: Arc<[MetaInfo]> = vec![table.meta()].into();
        Self {
            rows: table.iter(),
            table,
            metas,
            plan: ScanPlan::FullScan,
            cursor: QueryCursor::new(),
        }
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    fn plan_for(&self, selection: Option<&Logic>) -> ScanPlan {
        let Some(logic) = selection else {
            return ScanPlan::FullScan;
        };
        let condition = match logic {
            Logic::Terminal(None) => return ScanPlan::FullScan,
            Logic::Terminal(Some(condition)) => condition,
            Logic::Node { .. } => return ScanPlan::Filter,
        };

        if !condition.has_column() {
            return ScanPlan::Constant;
        }
        if condition.op != CompareOp::Eq {
            return ScanPlan::Filter;
        }

        let constant = match (&condition.left, &condition.right) {
            (Comparer::Column(name), constant) | (constant, Comparer::Column(name))
                if !constant.is_column() && self.is_primary(name) =>
            {
                constant
            }
            _ => return ScanPlan::Filter,
        };
        match constant {
            Comparer::Null => ScanPlan::Filter,
            constant => ScanPlan::PointLookup(constant.clone()),
        }
    }

    /// Whether `name` is this table's primary column, bare or qualified.
    fn is_primary(&self, name: &str) -> bool {
        let primary = self.table.primary_name();
        match name.split_once('.') {
            None => name == primary,
            Some((table, column)) => table == self.table.name() && column == primary,
        }
    }

    fn wrap(&self, row: Row) -> JointRow {
        JointRow::single(row, Arc::clone(&self.metas))
    }

    fn scan_next(&mut self, filtered: bool) -> Result<()> {
        for row in self.rows.by_ref() {
            let row = JointRow::single(row?, Arc::clone(&self.metas));
            if !filtered || self.cursor.passes(&row)? {
                self.cursor.push(row);
                return Ok(());
            }
        }
        self.plan = ScanPlan::Done;
        Ok(())
    }

    fn lookup(&mut self, constant: &Comparer) -> Result<()> {
        let key = constant.to_entry(self.table.schema().primary_column().column_type())?;
        let row = match self.table.get(&key) {
            Ok(row) => self.wrap(row),
            Err(StrataError::KeyNotExist(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        // the key conversion may have truncated the constant
        if self.cursor.passes(&row)? {
            self.cursor.push(row);
        }
        Ok(())
    }
}

impl QueryTable for SingleTable {
    fn cursor(&self) -> &QueryCursor {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut QueryCursor {
        &mut self.cursor
    }

    fn prepare_next(&mut self) -> Result<()> {
        match self.plan.clone() {
            ScanPlan::FullScan => self.scan_next(false),
            ScanPlan::Filter => self.scan_next(true),
            ScanPlan::Constant => {
                let accepted = match self.cursor.selection() {
                    Some(logic) => logic.evaluate_constant()?.is_true(),
                    None => true,
                };
                if accepted {
                    self.plan = ScanPlan::FullScan;
                    self.scan_next(false)
                } else {
                    self.plan = ScanPlan::Done;
                    Ok(())
                }
            }
            ScanPlan::PointLookup(constant) => {
                self.plan = ScanPlan::Done;
                if self.cursor.is_first() {
                    self.lookup(&constant)?;
                }
                Ok(())
            }
            ScanPlan::Done => Ok(()),
        }
    }

    fn metas(&self) -> Arc<[MetaInfo]> {
        Arc::clone(&self.metas)
    }

    fn set_selection(&mut self, selection: Option<Logic>) {
        self.plan = self.plan_for(selection.as_ref());
        self.cursor.set_selection(selection);
    }
}

impl Iterator for SingleTable {
    type Item = Result<JointRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::StorageConfig;
    use crate::execution::Condition;
    use crate::storage::disk::{DiskManager, DiskScheduler};
    use crate::tuple::{ColumnType, Entry, SchemaBuilder};
    use tempfile::TempDir;

    fn people(dir: &TempDir) -> Arc<Table> {
        let dm = Arc::new(DiskManager::new(dir.path()).unwrap());
        let scheduler = Arc::new(DiskScheduler::new(dm));
        let schema = SchemaBuilder::new()
            .primary("id", ColumnType::Int)
            .column("age", ColumnType::Int)
            .build()
            .unwrap();
        let config = StorageConfig::new(dir.path());
        let table = Arc::new(Table::new("db", "people", schema, &config, scheduler));
        for (id, age) in [(1, Some(30)), (2, None), (3, Some(20)), (4, Some(40))] {
            let age = age.map_or(Entry::Null, Entry::Int);
            table.insert(vec![Entry::Int(id), age], false).unwrap();
        }
        table
    }

    fn ids(query: SingleTable) -> Vec<i32> {
        query
            .map(|row| match row.unwrap().entries()[0] {
                Entry::Int(id) => id,
                _ => unreachable!(),
            })
            .collect()
    }

    fn query(table: &Arc<Table>, logic: Option<Logic>) -> SingleTable {
        let mut query = SingleTable::new(Arc::clone(table));
        query.set_selection(logic);
        query
    }

    fn cond(left: Comparer, op: CompareOp, right: Comparer) -> Logic {
        Logic::condition(Condition::new(left, op, right))
    }

    #[test]
    fn test_single_table_plans() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        let q = SingleTable::new(Arc::clone(&table));

        assert_eq!(q.plan_for(None), ScanPlan::FullScan);
        assert_eq!(q.plan_for(Some(&Logic::always())), ScanPlan::FullScan);
        assert_eq!(
            q.plan_for(Some(&cond(1.into(), CompareOp::Eq, 1.into()))),
            ScanPlan::Constant
        );
        assert_eq!(
            q.plan_for(Some(&cond(2.into(), CompareOp::Eq, Comparer::column("people.id")))),
            ScanPlan::PointLookup(2.into())
        );
        assert_eq!(
            q.plan_for(Some(&cond(Comparer::column("id"), CompareOp::Eq, Comparer::Null))),
            ScanPlan::Filter
        );
        assert_eq!(
            q.plan_for(Some(&cond(Comparer::column("other.id"), CompareOp::Eq, 2.into()))),
            ScanPlan::Filter
        );
        assert_eq!(
            q.plan_for(Some(&cond(Comparer::column("age"), CompareOp::Eq, 2.into()))),
            ScanPlan::Filter
        );
    }

    #[test]
    fn test_single_table_full_scan() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        assert_eq!(ids(query(&table, None)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_single_table_constant_selection() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        assert_eq!(
            ids(query(&table, Some(cond(1.into(), CompareOp::Lt, 2.into())))),
            vec![1, 2, 3, 4]
        );
        assert!(ids(query(&table, Some(cond(1.into(), CompareOp::Gt, 2.into())))).is_empty());
        assert!(ids(query(&table, Some(cond(1.into(), CompareOp::Eq, Comparer::Null)))).is_empty());
    }

    #[test]
    fn test_single_table_point_lookup() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        let eq = |value: f64| cond(Comparer::column("id"), CompareOp::Eq, value.into());

        assert_eq!(ids(query(&table, Some(eq(3.0)))), vec![3]);
        assert!(ids(query(&table, Some(eq(9.0)))).is_empty());
        assert!(ids(query(&table, Some(eq(3.5)))).is_empty());
    }

    #[test]
    fn test_single_table_filter_skips_unknown() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        let logic = cond(Comparer::column("age"), CompareOp::Ge, 30.into());
        assert_eq!(ids(query(&table, Some(logic))), vec![1, 4]);

        let either = Logic::or(
            cond(Comparer::column("age"), CompareOp::Lt, 25.into()),
            cond(Comparer::column("id"), CompareOp::Eq, 2.into()),
        );
        assert_eq!(ids(query(&table, Some(either))), vec![2, 3]);
    }

    #[test]
    fn test_single_table_type_mismatch() {
        let dir = TempDir::new().unwrap();
        let table = people(&dir);
        let mut q = query(
            &table,
            Some(cond(Comparer::column("age"), CompareOp::Eq, Comparer::string("x"))),
        );
        assert!(matches!(q.next(), Some(Err(StrataError::TypeMismatch { .. }))));
    }
}
