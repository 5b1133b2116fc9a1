/// Message types exchanged with a view worker
use crate::buffer::ViewBuffer;
use crate::error::Result;
use crate::filter::FilterSpec;
use crate::row::{Row, RowStore};
use crate::sort::SortSpec;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

/// A request for one view computation.
///
/// `generation` is the request's cancellation token: the computation stays
/// authoritative only while no request with another generation has been
/// accepted by the session. The JSON form also accepts `version`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ViewRequest {
    #[serde(default)]
    pub sort: SortSpec,
    #[serde(default)]
    pub filter: FilterSpec,
    #[serde(alias = "version")]
    pub generation: u64,
}

impl ViewRequest {
    pub fn new(sort: SortSpec, filter: FilterSpec, generation: u64) -> Self {
        ViewRequest {
            sort,
            filter,
            generation,
        }
    }
}

/// Messages sent from the consumer to the worker
#[derive(Debug, Clone)]
pub enum ControlMessage {
    /// Replace the dataset. Invalidates the sort cache and supersedes any
    /// computation still running on the old snapshot.
    SetRows { rows: Arc<RowStore> },

    /// Start a computation, superseding whatever is in flight.
    ComputeView {
        buffer: ViewBuffer,
        request: ViewRequest,
    },

    /// Scroll position hand-off; acknowledged with `ScrollDone`.
    Scroll { position: f64 },

    /// Stop the worker loop.
    Shutdown,
}

/// Messages sent from the worker to the consumer
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// A valid partial prefix, sent at most once per computation.
    EarlyResults { generation: u64, num_rows: usize },

    /// The computation finished; the first `num_rows` buffer slots are valid.
    Done { generation: u64, num_rows: usize },

    /// The computation was superseded; nothing in the buffer may be trusted.
    Cancelled { generation: u64 },

    /// The request was refused before any buffer write.
    Rejected { generation: u64, message: String },

    ScrollDone { position: f64 },
}

impl ViewEvent {
    /// Generation the event belongs to, if any.
    pub fn generation(&self) -> Option<u64> {
        match self {
            ViewEvent::EarlyResults { generation, .. }
            | ViewEvent::Done { generation, .. }
            | ViewEvent::Cancelled { generation }
            | ViewEvent::Rejected { generation, .. } => Some(*generation),
            ViewEvent::ScrollDone { .. } => None,
        }
    }

    /// True for `Done`, `Cancelled` and `Rejected`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ViewEvent::Done { .. } | ViewEvent::Cancelled { .. } | ViewEvent::Rejected { .. }
        )
    }

    /// JSON form for forwarding to a UI thread.
    ///
    /// Early results travel as a `compute-view-done` event flagged with
    /// `skipRefreshThumb`, so consumers can render the partial prefix with
    /// the same code path as a final result.
    pub fn to_json(&self) -> JsonValue {
        match self {
            ViewEvent::EarlyResults {
                generation,
                num_rows,
            } => json!({
                "type": "compute-view-done",
                "generation": generation,
                "numRows": num_rows,
                "skipRefreshThumb": true,
            }),
            ViewEvent::Done {
                generation,
                num_rows,
            } => json!({
                "type": "compute-view-done",
                "generation": generation,
                "numRows": num_rows,
            }),
            ViewEvent::Cancelled { generation } => json!({
                "type": "compute-view-cancelled",
                "generation": generation,
            }),
            ViewEvent::Rejected {
                generation,
                message,
            } => json!({
                "type": "compute-view-rejected",
                "generation": generation,
                "message": message,
            }),
            ViewEvent::ScrollDone { position } => json!({
                "type": "scroll-done",
                "scrollPosition": position,
            }),
        }
    }
}

/// JSON messages from a UI thread. The output buffer is shared memory and
/// never travels on the wire, so it is attached on conversion.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    SetRows {
        rows: Vec<Row>,
    },

    #[serde(rename_all = "camelCase")]
    ComputeView {
        view_config: ViewRequest,
    },

    #[serde(rename_all = "camelCase")]
    Scroll {
        scroll_position: f64,
    },
}

impl ClientMessage {
    pub fn into_control(self, buffer: &ViewBuffer) -> Result<ControlMessage> {
        Ok(match self {
            ClientMessage::SetRows { rows } => ControlMessage::SetRows {
                rows: Arc::new(RowStore::new(rows)?),
            },
            ClientMessage::ComputeView { view_config } => ControlMessage::ComputeView {
                buffer: buffer.clone(),
                request: view_config,
            },
            ClientMessage::Scroll { scroll_position } => ControlMessage::Scroll {
                position: scroll_position,
            },
        })
    }
}
