/// GridView - Cancellable Sort/Filter Views for Large Tables
///
/// Computes, for an in-memory dataset, the ordered ids of the rows that
/// match a multi-column text filter under a multi-key sort, and streams them
/// into a preallocated buffer shared with the consumer. Computations run on
/// a single cooperative worker per session; a newer request supersedes the
/// one in flight at its next checkpoint, and only the newest request ever
/// reports `Done`.

pub mod buffer;
pub mod cache;
pub mod cancel;
pub mod column;
pub mod config;
pub mod error;
pub mod filter;
pub mod messages;
pub mod row;
pub mod session;
pub mod sort;
pub mod worker;

pub use buffer::{BufferWriter, ViewBuffer};
pub use cache::SortCache;
pub use cancel::{Cancelled, Checkpoint, NeverCancel};
pub use column::CellValue;
pub use config::EngineConfig;
pub use error::{Result, ViewError};
pub use filter::{filter_rows, FilterSpec, FilterTerm};
pub use messages::{ClientMessage, ControlMessage, ViewEvent, ViewRequest};
pub use row::{OrderedRows, Row, RowStore};
pub use session::{ControlSource, Detached, EventSink, SessionStats, ViewOutcome, ViewPhase, ViewSession};
pub use sort::{stable_sort, SortKey, SortOrder, SortSpec};
pub use worker::ViewWorker;
