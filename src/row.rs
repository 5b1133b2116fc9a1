/// GridView Row Store
///
/// A RowStore is an immutable snapshot of the dataset a view session works
/// on. Rows keep their source order, which is also the default (unsorted)
/// view order. The store is never mutated in place; a new snapshot replaces
/// the old one wholesale.
///
/// # Examples
///
/// ```
/// use gridview::{CellValue, Row, RowStore};
///
/// let store = RowStore::new(vec![
///     Row::new(7, vec![CellValue::from("Alice"), CellValue::from(30)]),
///     Row::new(3, vec![CellValue::from("Bob"), CellValue::from(25)]),
/// ]).unwrap();
///
/// assert_eq!(store.len(), 2);
/// assert_eq!(store.width(), 2);
/// assert_eq!(store.row(1).unwrap().id, 3);
/// ```
use crate::column::CellValue;
use crate::error::{Result, ViewError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single row: a stable identifier plus its cells, indexed by column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: u32,
    pub cells: Vec<CellValue>,
}

impl Row {
    pub fn new(id: u32, cells: Vec<CellValue>) -> Self {
        Row { id, cells }
    }

    /// Returns the cell at `column`, or None if the row is too short.
    #[inline]
    pub fn cell(&self, column: usize) -> Option<&CellValue> {
        self.cells.get(column)
    }
}

/// Immutable dataset snapshot.
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    rows: Vec<Row>,
    width: usize,
}

impl RowStore {
    /// Builds a snapshot, checking that every row has the same number of
    /// cells and that ids are unique.
    pub fn new(rows: Vec<Row>) -> Result<Self> {
        let width = rows.first().map(|r| r.cells.len()).unwrap_or(0);
        let mut seen = HashSet::with_capacity(rows.len());

        for row in &rows {
            if row.cells.len() != width {
                return Err(ViewError::RaggedRow {
                    id: row.id,
                    expected: width,
                    found: row.cells.len(),
                });
            }
            if !seen.insert(row.id) {
                return Err(ViewError::DuplicateRowId(row.id));
            }
        }

        Ok(RowStore { rows, width })
    }

    /// An empty snapshot, the state of a freshly started session.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns every row carries.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Row at source position `index`.
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Row identifiers in source order.
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.iter().map(|r| r.id)
    }
}

/// A view over a RowStore in either source order or a computed order.
#[derive(Debug, Clone, Copy)]
pub struct OrderedRows<'a> {
    rows: &'a [Row],
    order: Option<&'a [usize]>,
}

impl<'a> OrderedRows<'a> {
    /// Rows in source order.
    pub fn source(rows: &'a [Row]) -> Self {
        OrderedRows { rows, order: None }
    }

    /// Rows visited through `order`, a permutation of source positions.
    pub fn sorted(rows: &'a [Row], order: &'a [usize]) -> Self {
        OrderedRows {
            rows,
            order: Some(order),
        }
    }

    pub fn len(&self) -> usize {
        match self.order {
            Some(order) => order.len(),
            None => self.rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row at view position `index`. Panics if out of range.
    #[inline]
    pub fn get(&self, index: usize) -> &'a Row {
        match self.order {
            Some(order) => &self.rows[order[index]],
            None => &self.rows[index],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Row> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }
}
