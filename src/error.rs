/// Error type for the view engine.
///
/// Cancellation is not an error: a superseded computation settles into
/// `ViewOutcome::Cancelled`. Errors here describe requests or datasets the
/// engine refuses to work with.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// A sort key or filter entry names a column the dataset does not have.
    #[error("{context} column {column} out of range (dataset has {width} columns)")]
    ColumnOutOfRange {
        context: &'static str,
        column: usize,
        width: usize,
    },

    /// The output buffer cannot hold every row of the current dataset.
    #[error("view buffer holds {capacity} ids but the dataset has {required} rows")]
    BufferTooSmall { capacity: usize, required: usize },

    /// A row does not have the same number of cells as the first row.
    #[error("row {id} has {found} cells, expected {expected}")]
    RaggedRow {
        id: u32,
        expected: usize,
        found: usize,
    },

    /// Two rows in one snapshot share an identifier.
    #[error("duplicate row id {0}")]
    DuplicateRowId(u32),

    /// A filter object key is not a column index.
    #[error("filter key {0:?} is not a column index")]
    InvalidFilterColumn(String),

    /// A sort spec could not be serialized into its cache key.
    #[error("could not encode sort spec: {0}")]
    Encode(String),

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidConfig { key: &'static str, value: String },

    /// The worker thread could not be started.
    #[error("failed to start view worker: {0}")]
    Spawn(String),

    /// The worker thread is gone and can no longer accept messages.
    #[error("view worker disconnected")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, ViewError>;
