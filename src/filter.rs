/// GridView Filtering
///
/// A FilterSpec keeps a row only if, for every (column, query) pair, the
/// lower-cased string form of the row's cell contains the lower-cased
/// query. The filter engine scans rows in bounded chunks, yielding and
/// re-checking cancellation between chunks, and streams kept ids into the
/// shared ViewBuffer as it goes.
use crate::buffer::ViewBuffer;
use crate::cancel::{Cancelled, Checkpoint};
use crate::config::EngineConfig;
use crate::error::{Result, ViewError};
use crate::row::{OrderedRows, Row};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One filter entry; the query is stored already lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterTerm {
    column: usize,
    query: String,
}

impl FilterTerm {
    pub fn column(&self) -> usize {
        self.column
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Ordered set of filter terms, at most one per column.
///
/// On the wire this is a JSON object mapping column index to query, e.g.
/// `{"0": "app", "3": "x"}`. An empty spec lets every row through.
///
/// Keys are read as strings and parsed here: inside an internally tagged
/// message serde buffers the object, and buffered keys only come back as
/// strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<usize, String>")]
pub struct FilterSpec {
    terms: Vec<FilterTerm>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the query for `column`.
    pub fn with(mut self, column: usize, query: impl AsRef<str>) -> Self {
        self.set(column, query);
        self
    }

    /// Adds or replaces the query for `column`. The query is lower-cased
    /// here, once, rather than per row.
    pub fn set(&mut self, column: usize, query: impl AsRef<str>) {
        let query = query.as_ref().to_lowercase();
        match self.terms.binary_search_by_key(&column, |t| t.column) {
            Ok(pos) => self.terms[pos].query = query,
            Err(pos) => self.terms.insert(pos, FilterTerm { column, query }),
        }
    }

    pub fn terms(&self) -> &[FilterTerm] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Checks that every term names an existing column.
    pub fn validate(&self, width: usize) -> Result<()> {
        match self.terms.iter().find(|t| t.column >= width) {
            Some(term) => Err(ViewError::ColumnOutOfRange {
                context: "filter",
                column: term.column,
                width,
            }),
            None => Ok(()),
        }
    }

    /// True if `row` satisfies every term. `scratch` is reused between
    /// calls to avoid allocating per cell.
    pub fn matches(&self, row: &Row, scratch: &mut String) -> bool {
        self.terms.iter().all(|term| {
            if term.query.is_empty() {
                return true;
            }
            match row.cell(term.column) {
                Some(cell) => {
                    scratch.clear();
                    cell.write_filter_text(scratch);
                    scratch.contains(term.query.as_str())
                }
                None => false,
            }
        })
    }
}

impl<S: AsRef<str>> FromIterator<(usize, S)> for FilterSpec {
    fn from_iter<I: IntoIterator<Item = (usize, S)>>(iter: I) -> Self {
        let mut spec = FilterSpec::new();
        for (column, query) in iter {
            spec.set(column, query);
        }
        spec
    }
}

impl From<BTreeMap<usize, String>> for FilterSpec {
    fn from(map: BTreeMap<usize, String>) -> Self {
        map.into_iter().collect()
    }
}

impl TryFrom<BTreeMap<String, String>> for FilterSpec {
    type Error = ViewError;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self> {
        let mut spec = FilterSpec::new();
        for (key, query) in map {
            let column = key
                .trim()
                .parse::<usize>()
                .map_err(|_| ViewError::InvalidFilterColumn(key.clone()))?;
            spec.set(column, query);
        }
        Ok(spec)
    }
}

impl From<FilterSpec> for BTreeMap<usize, String> {
    fn from(spec: FilterSpec) -> Self {
        spec.terms.into_iter().map(|t| (t.column, t.query)).collect()
    }
}

/// Scans `rows` in chunks, writing the ids of matching rows into `buffer`
/// from offset 0 and returning how many were written.
///
/// Before each chunk the checkpoint is polled; once it reports cancellation
/// no further ids are written. `on_early_results` fires at most once, at
/// the start of a chunk, when the dataset and match count are large enough
/// that showing a partial prefix is worth it (see [`EngineConfig`]).
///
/// `buffer` must hold at least `rows.len()` ids.
pub fn filter_rows<C, E>(
    rows: OrderedRows<'_>,
    filter: &FilterSpec,
    buffer: &ViewBuffer,
    config: &EngineConfig,
    checkpoint: &mut C,
    mut on_early_results: E,
) -> std::result::Result<usize, Cancelled>
where
    C: Checkpoint + ?Sized,
    E: FnMut(usize),
{
    let total = rows.len();
    let chunk_size = config.chunk_size.max(1);
    let mut writer = buffer.writer();
    let mut sent_early_results = false;
    let mut scratch = String::new();

    for start in (0..total).step_by(chunk_size) {
        let end = (start + chunk_size).min(total);

        if checkpoint.checkpoint() {
            return Err(Cancelled);
        }

        if !sent_early_results
            && writer.len() > config.early_min_matches
            && total > config.early_min_rows
            && start > config.early_min_progress
        {
            debug!("early results: {} rows after scanning {}", writer.len(), start);
            on_early_results(writer.len());
            sent_early_results = true;
        }

        for index in start..end {
            let row = rows.get(index);
            if filter.matches(row, &mut scratch) {
                writer.push(row.id);
            }
        }
    }

    Ok(writer.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::NeverCancel;
    use crate::column::CellValue;
    use crate::row::RowStore;

    fn fruit_store() -> RowStore {
        RowStore::new(
            [(10, "Apple"), (11, "banana"), (12, "GRAPE"), (13, "avocado")]
                .into_iter()
                .map(|(id, name)| Row::new(id, vec![CellValue::from(name)]))
                .collect(),
        )
        .unwrap()
    }

    /// `count` rows with ids 0.., column 0 "keep" on 3 of every 5 rows and
    /// column 1 the row number.
    fn mostly_matching_store(count: u32) -> RowStore {
        RowStore::new(
            (0..count)
                .map(|i| {
                    let tag = if i % 5 < 3 { "Keep" } else { "drop" };
                    Row::new(i, vec![CellValue::from(tag), CellValue::from(i as i64)])
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_spec_lowercases_once_and_orders_terms() {
        let spec = FilterSpec::new().with(3, "ABC").with(1, "x").with(3, "Def");
        let columns: Vec<usize> = spec.terms().iter().map(|t| t.column()).collect();
        assert_eq!(columns, vec![1, 3]);
        assert_eq!(spec.terms()[1].query(), "def");
        assert_eq!(spec.len(), 2);
    }

    #[test]
    fn test_spec_json_object() {
        let spec: FilterSpec = serde_json::from_str(r#"{"2": "Foo", "0": "bar"}"#).unwrap();
        assert_eq!(spec, FilterSpec::new().with(0, "bar").with(2, "foo"));
        assert_eq!(serde_json::to_string(&spec).unwrap(), r#"{"0":"bar","2":"foo"}"#);
    }

    #[test]
    fn test_spec_json_rejects_non_numeric_key() {
        let err = serde_json::from_str::<FilterSpec>(r#"{"name": "bar"}"#).unwrap_err();
        assert!(err.to_string().contains("\"name\" is not a column index"));
    }

    #[test]
    fn test_spec_json_inside_tagged_enum() {
        #[derive(Debug, Deserialize)]
        #[serde(tag = "type")]
        enum Wrapped {
            Filter { filter: FilterSpec },
        }

        let Wrapped::Filter { filter } =
            serde_json::from_str(r#"{"type": "Filter", "filter": {"1": "Foo", "0": "bar"}}"#).unwrap();
        assert_eq!(filter, FilterSpec::new().with(0, "bar").with(1, "foo"));
    }

    #[test]
    fn test_matches_non_ascii_text() {
        let row = Row::new(1, vec![CellValue::from("ΟΔΟΣ"), CellValue::from("Straße")]);
        let mut scratch = String::new();

        assert!(FilterSpec::new().with(0, "ΟΔΟΣ").matches(&row, &mut scratch));
        assert!(FilterSpec::new().with(0, "οδ").matches(&row, &mut scratch));
        assert!(FilterSpec::new().with(1, "STRAßE").matches(&row, &mut scratch));
        assert!(!FilterSpec::new().with(0, "ΑΒ").matches(&row, &mut scratch));
    }

    #[test]
    fn test_matches_and_semantics() {
        let row = Row::new(1, vec![CellValue::from("Hello World"), CellValue::from(1234)]);
        let mut scratch = String::new();

        assert!(FilterSpec::new().matches(&row, &mut scratch));
        assert!(FilterSpec::new().with(0, "WORLD").matches(&row, &mut scratch));
        assert!(FilterSpec::new().with(0, "lo w").with(1, "23").matches(&row, &mut scratch));
        assert!(!FilterSpec::new().with(0, "lo w").with(1, "99").matches(&row, &mut scratch));
        assert!(FilterSpec::new().with(1, "").matches(&row, &mut scratch));
    }

    #[test]
    fn test_validate() {
        let spec = FilterSpec::new().with(0, "a").with(4, "b");
        assert!(spec.validate(5).is_ok());
        assert_eq!(
            spec.validate(4),
            Err(ViewError::ColumnOutOfRange {
                context: "filter",
                column: 4,
                width: 4
            })
        );
    }

    #[test]
    fn test_filter_fruit_scenario() {
        let store = fruit_store();
        let buffer = ViewBuffer::with_capacity(store.len());
        let run = |query: &str| {
            let num_rows = filter_rows(
                OrderedRows::source(store.rows()),
                &FilterSpec::new().with(0, query),
                &buffer,
                &EngineConfig::default(),
                &mut NeverCancel,
                |_| panic!("no early results on tiny datasets"),
            )
            .unwrap();
            buffer.prefix(num_rows)
        };

        // Containment, not prefix: every fruit here has an "a" somewhere.
        assert_eq!(run("a"), vec![10, 11, 12, 13]);
        assert_eq!(run("A"), vec![10, 11, 12, 13]);
        assert_eq!(run("av"), vec![13]);
        assert_eq!(run("APP"), vec![10]);
        assert_eq!(run("kiwi"), Vec::<u32>::new());
    }

    #[test]
    fn test_filter_respects_order() {
        let store = fruit_store();
        let buffer = ViewBuffer::with_capacity(store.len());
        let order = [3, 2, 1, 0];
        let num_rows = filter_rows(
            OrderedRows::sorted(store.rows(), &order),
            &FilterSpec::new().with(0, "AP"),
            &buffer,
            &EngineConfig::default(),
            &mut NeverCancel,
            |_| {},
        )
        .unwrap();

        assert_eq!(buffer.prefix(num_rows), vec![12, 10]);
    }

    #[test]
    fn test_filter_checks_once_per_chunk() {
        let store = mostly_matching_store(1000);
        let buffer = ViewBuffer::with_capacity(store.len());
        let config = EngineConfig {
            chunk_size: 100,
            ..EngineConfig::default()
        };
        let mut checks = 0;
        let mut count_checks = || {
            checks += 1;
            false
        };

        let num_rows = filter_rows(
            OrderedRows::source(store.rows()),
            &FilterSpec::new().with(0, "keep"),
            &buffer,
            &config,
            &mut count_checks,
            |_| {},
        )
        .unwrap();

        assert_eq!(num_rows, 600);
        assert_eq!(checks, 10);
    }

    #[test]
    fn test_filter_cancel_stops_writes() {
        let store = mostly_matching_store(1000);
        let buffer = ViewBuffer::with_capacity(store.len());
        let config = EngineConfig {
            chunk_size: 100,
            ..EngineConfig::default()
        };
        let mut checks = 0;
        let mut cancel_on_third_chunk = || {
            checks += 1;
            checks == 3
        };

        let result = filter_rows(
            OrderedRows::source(store.rows()),
            &FilterSpec::new().with(0, "keep"),
            &buffer,
            &config,
            &mut cancel_on_third_chunk,
            |_| {},
        );

        assert_eq!(result, Err(Cancelled));
        // Two chunks of 100 rows ran: 120 matches, the last being row 197.
        assert_eq!(buffer.load(119), Some(197));
        assert_eq!(buffer.load(120), Some(0));
    }

    #[test]
    fn test_early_results_fire_once_past_threshold() {
        let store = mostly_matching_store(100_000);
        let buffer = ViewBuffer::with_capacity(store.len());
        let mut early = Vec::new();
        let mut chunk_starts = 0usize;
        let mut checkpoint = || {
            chunk_starts += 1;
            false
        };

        let num_rows = filter_rows(
            OrderedRows::source(store.rows()),
            &FilterSpec::new().with(0, "keep"),
            &buffer,
            &EngineConfig::default(),
            &mut checkpoint,
            |n| early.push(n),
        )
        .unwrap();

        assert_eq!(num_rows, 60_000);
        assert_eq!(chunk_starts, 4);
        // Chunks start at 0, 30k, 60k, 90k; only the 60k start is past 30k
        // with matches already known.
        assert_eq!(early, vec![36_000]);
    }

    #[test]
    fn test_no_early_results_on_small_dataset() {
        let store = mostly_matching_store(70_000);
        let buffer = ViewBuffer::with_capacity(store.len());
        let mut fired = false;

        filter_rows(
            OrderedRows::source(store.rows()),
            &FilterSpec::new().with(0, "keep"),
            &buffer,
            &EngineConfig::default(),
            &mut NeverCancel,
            |_| fired = true,
        )
        .unwrap();

        assert!(!fired);
    }
}
