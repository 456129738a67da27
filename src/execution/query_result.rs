use std::fmt;

use crate::common::{Result, StrataError};
use crate::tuple::Row;

use super::{MetaInfo, QueryTable};

/// One item of a projection list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnSelector {
    pub table: Option<String>,
    pub column: Option<String>,
}

impl ColumnSelector {
    /// Every column of every table.
    pub fn all() -> Self {
        Self::default()
    }

    /// Every column of `table`.
    pub fn table_all(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: None,
        }
    }

    /// A column name that must be unique across the queried tables.
    pub fn column(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: Some(column.into()),
        }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: Some(column.into()),
        }
    }
}

impl fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.table, &self.column) {
            (None, None) => write!(f, "*"),
            (Some(table), None) => write!(f, "{}.*", table),
            (None, Some(column)) => write!(f, "{}", column),
            (Some(table), Some(column)) => write!(f, "{}.{}", table, column),
        }
    }
}

/// Projects the rows of a query onto selected columns.
pub struct QueryResult {
    query: Box<dyn QueryTable>,
    indices: Vec<usize>,
    column_names: Vec<String>,
}

impl QueryResult {
    /// Resolves `selectors` against the query's tables. An empty list
    /// selects every column.
    pub fn new(query: Box<dyn QueryTable>, selectors: &[ColumnSelector]) -> Result<Self> {
        let metas = query.metas();
        let joined = metas.len() > 1;
        let mut indices = Vec::new();
        let mut column_names = Vec::new();

        if selectors.is_empty() {
            let mut offset = 0;
            for meta in metas.iter() {
                select_all(meta, offset, joined, &mut indices, &mut column_names);
                offset += meta.column_count();
            }
        }

        for selector in selectors {
            match (&selector.table, &selector.column) {
                (None, None) => {
                    let mut offset = 0;
                    for meta in metas.iter() {
                        select_all(meta, offset, joined, &mut indices, &mut column_names);
                        offset += meta.column_count();
                    }
                }
                (Some(table), None) => {
                    let (meta, offset) = table_offset(&metas, table)
                        .ok_or_else(|| StrataError::AttributeNotFound(selector.to_string()))?;
                    select_all(meta, offset, joined, &mut indices, &mut column_names);
                }
                (None, Some(column)) => {
                    let mut found = None;
                    let mut offset = 0;
                    for meta in metas.iter() {
                        if let Some(index) = meta.column_index(column) {
                            if found.is_some() {
                                return Err(StrataError::AttributeCollision(column.clone()));
                            }
                            found = Some(offset + index);
                        }
                        offset += meta.column_count();
                    }
                    let index =
                        found.ok_or_else(|| StrataError::AttributeNotFound(column.clone()))?;
                    indices.push(index);
                    column_names.push(column.clone());
                }
                (Some(table), Some(column)) => {
                    let index = table_offset(&metas, table).and_then(|(meta, offset)| {
                        meta.column_index(column).map(|index| offset + index)
                    });
                    let index =
                        index.ok_or_else(|| StrataError::AttributeNotFound(selector.to_string()))?;
                    indices.push(index);
                    column_names.push(column.clone());
                }
            }
        }

        Ok(Self {
            query,
            indices,
            column_names,
        })
    }

    /// Result headers, one per projected column.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn has_next(&self) -> bool {
        self.query.has_next()
    }

    fn next_record(&mut self) -> Result<Option<Row>> {
        let Some(row) = self.query.next_row()? else {
            return Ok(None);
        };
        let entries = row.entries();
        Ok(Some(Row::new(
            self.indices.iter().map(|&i| entries[i].clone()).collect(),
        )))
    }
}

fn select_all(
    meta: &MetaInfo,
    offset: usize,
    qualified: bool,
    indices: &mut Vec<usize>,
    column_names: &mut Vec<String>,
) {
    for column in 0..meta.column_count() {
        indices.push(offset + column);
        let name = if qualified {
            meta.full_name(column)
        } else {
            meta.column_name(column).map(str::to_string)
        };
        column_names.push(name.unwrap_or_default());
    }
}

fn table_offset<'a>(metas: &'a [MetaInfo], table: &str) -> Option<(&'a MetaInfo, usize)> {
    let mut offset = 0;
    for meta in metas {
        if meta.table_name() == table {
            return Some((meta, offset));
        }
        offset += meta.column_count();
    }
    None
}

impl Iterator for QueryResult {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
