/// GridView Sorting
///
/// A SortSpec is an ordered list of sort keys evaluated left to right as a
/// lexicographic tie-break chain. The stable sort engine orders a sequence
/// under such a chain as a bottom-up merge sort that polls a cooperative
/// checkpoint before every merge step, so a superseded sort stops after at
/// most one more step.
use crate::cancel::{Cancelled, Checkpoint};
use crate::column::CellValue;
use crate::error::{Result, ViewError};
use crate::row::Row;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort order specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order (smallest first)
    Ascending,
    /// Descending order (largest first)
    Descending,
}

/// A single sort key specifying a column and order.
///
/// A key without a direction is skipped by the comparator; it does not end
/// the tie-break chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub direction: Option<SortOrder>,
    pub column: usize,
}

impl SortKey {
    /// Create a new sort key with ascending order
    pub fn ascending(column: usize) -> Self {
        SortKey {
            direction: Some(SortOrder::Ascending),
            column,
        }
    }

    /// Create a new sort key with descending order
    pub fn descending(column: usize) -> Self {
        SortKey {
            direction: Some(SortOrder::Descending),
            column,
        }
    }

    /// A placeholder key that contributes nothing to the ordering
    pub fn unsorted(column: usize) -> Self {
        SortKey {
            direction: None,
            column,
        }
    }
}

/// Ordered sort keys; the first key is primary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    pub fn new(keys: Vec<SortKey>) -> Self {
        SortSpec { keys }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// An empty spec means "keep source order".
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Canonical serialized form, used as the sort cache key.
    pub fn cache_key(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ViewError::Encode(e.to_string()))
    }

    /// Checks that every directed key names an existing column.
    pub fn validate(&self, width: usize) -> Result<()> {
        for key in &self.keys {
            if key.direction.is_some() && key.column >= width {
                return Err(ViewError::ColumnOutOfRange {
                    context: "sort",
                    column: key.column,
                    width,
                });
            }
        }
        Ok(())
    }

    /// Builds the total order this spec describes.
    ///
    /// Rows that tie on every key compare equal, leaving their relative
    /// order to the stability of the sort. Columns must have been checked
    /// with [`SortSpec::validate`]; a missing cell sorts as null.
    pub fn comparator(&self) -> impl Fn(&Row, &Row) -> Ordering + '_ {
        move |a: &Row, b: &Row| {
            for key in &self.keys {
                let order = match key.direction {
                    Some(order) => order,
                    None => continue,
                };
                let cmp = compare_cells(a, b, key.column);
                let cmp = match order {
                    SortOrder::Ascending => cmp,
                    SortOrder::Descending => cmp.reverse(),
                };
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            Ordering::Equal
        }
    }
}

fn compare_cells(a: &Row, b: &Row, column: usize) -> Ordering {
    match (a.cell(column), b.cell(column)) {
        (Some(x), Some(y)) => x.natural_cmp(y),
        (Some(x), None) => x.natural_cmp(&CellValue::Null),
        (None, Some(y)) => CellValue::Null.natural_cmp(y),
        (None, None) => Ordering::Equal,
    }
}

/// Stably sorts a copy of `items`.
///
/// Starts from insertion-sorted runs of `min_run` items and merges them
/// pairwise, doubling the width each pass. `checkpoint` is polled before
/// every run and every merge; if it reports cancellation the partially
/// sorted data is dropped and `Err(Cancelled)` is returned.
pub fn stable_sort<T, F, C>(
    items: &[T],
    min_run: usize,
    mut compare: F,
    checkpoint: &mut C,
) -> std::result::Result<Vec<T>, Cancelled>
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
    C: Checkpoint + ?Sized,
{
    let len = items.len();
    let mut src = items.to_vec();
    if len < 2 {
        return Ok(src);
    }

    let run = min_run.max(1);
    for start in (0..len).step_by(run) {
        if checkpoint.checkpoint() {
            return Err(Cancelled);
        }
        let end = (start + run).min(len);
        insertion_sort(&mut src[start..end], &mut compare);
    }

    let mut dst = src.clone();
    let mut width = run;
    while width < len {
        for start in (0..len).step_by(2 * width) {
            if checkpoint.checkpoint() {
                return Err(Cancelled);
            }
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            merge(&src[start..mid], &src[mid..end], &mut dst[start..end], &mut compare);
        }
        std::mem::swap(&mut src, &mut dst);
        width *= 2;
    }

    Ok(src)
}

fn insertion_sort<T, F>(run: &mut [T], compare: &mut F)
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
{
    for i in 1..run.len() {
        let mut j = i;
        while j > 0 && compare(&run[j - 1], &run[j]) == Ordering::Greater {
            run.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Merges two sorted slices into `out`, taking from `left` on ties.
fn merge<T, F>(left: &[T], right: &[T], out: &mut [T], compare: &mut F)
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
{
    let (mut i, mut j) = (0, 0);
    for slot in out.iter_mut() {
        let take_left = j >= right.len()
            || (i < left.len() && compare(&left[i], &right[j]) != Ordering::Greater);
        if take_left {
            *slot = left[i];
            i += 1;
        } else {
            *slot = right[j];
            j += 1;
        }
    }
}
