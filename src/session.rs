/// GridView Session - the view orchestrator
///
/// A ViewSession owns everything one consumer's views are computed from:
/// the current RowStore snapshot, the sort cache and the current
/// generation. It sequences sort then filter for each request and settles
/// every request into exactly one terminal outcome.
///
/// # Cooperative scheduling
///
/// Work runs on a single context. At each checkpoint (before every sort
/// merge step, after sorting, before every filter chunk, after filtering)
/// the session drains pending control messages from its [`ControlSource`]
/// and then checks whether the running computation is still current. A
/// newer `ComputeView` is queued behind the running one after recording its
/// generation, so the running one cancels at that same checkpoint.
///
/// # Examples
///
/// ```
/// use gridview::{
///     CellValue, Detached, FilterSpec, Row, RowStore, SortKey, SortSpec, ViewBuffer,
///     ViewOutcome, ViewRequest, ViewSession,
/// };
///
/// let rows = RowStore::new(vec![
///     Row::new(1, vec![CellValue::from("pear")]),
///     Row::new(2, vec![CellValue::from("apple")]),
///     Row::new(3, vec![CellValue::from("plum")]),
/// ]).unwrap();
///
/// let mut session = ViewSession::default();
/// session.set_rows(rows);
///
/// let buffer = ViewBuffer::with_capacity(3);
/// let request = ViewRequest::new(
///     SortSpec::new(vec![SortKey::ascending(0)]),
///     FilterSpec::new().with(0, "P"),
///     1,
/// );
///
/// let outcome = session.compute_view(&buffer, &request, &mut Detached, &Detached);
/// assert_eq!(outcome, ViewOutcome::Done(3));
/// assert_eq!(buffer.prefix(3), vec![2, 1, 3]);
/// ```
use crate::buffer::ViewBuffer;
use crate::cache::SortCache;
use crate::cancel::{Cancelled, Checkpoint};
use crate::config::EngineConfig;
use crate::error::{Result, ViewError};
use crate::filter::filter_rows;
use crate::messages::{ControlMessage, ViewEvent, ViewRequest};
use crate::row::{OrderedRows, RowStore};
use crate::sort::stable_sort;
use log::{debug, info, warn};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;

/// Where a session reads control messages from.
pub trait ControlSource {
    /// Next pending message without blocking.
    fn try_next(&mut self) -> Option<ControlMessage>;

    /// Next message, blocking until one arrives. None once the source is
    /// closed.
    fn next_blocking(&mut self) -> Option<ControlMessage>;
}

impl ControlSource for Receiver<ControlMessage> {
    fn try_next(&mut self) -> Option<ControlMessage> {
        self.try_recv().ok()
    }

    fn next_blocking(&mut self) -> Option<ControlMessage> {
        self.recv().ok()
    }
}

impl ControlSource for VecDeque<ControlMessage> {
    fn try_next(&mut self) -> Option<ControlMessage> {
        self.pop_front()
    }

    fn next_blocking(&mut self) -> Option<ControlMessage> {
        self.pop_front()
    }
}

/// Where a session posts outbound events.
pub trait EventSink {
    fn emit(&self, event: ViewEvent);
}

impl EventSink for Sender<ViewEvent> {
    fn emit(&self, event: ViewEvent) {
        // A consumer that hung up no longer cares about its views.
        let _ = self.send(event);
    }
}

impl EventSink for RefCell<Vec<ViewEvent>> {
    fn emit(&self, event: ViewEvent) {
        self.borrow_mut().push(event);
    }
}

/// Control source with nothing to deliver and a sink that drops every
/// event, for computing views synchronously.
#[derive(Debug, Default, Clone, Copy)]
pub struct Detached;

impl ControlSource for Detached {
    fn try_next(&mut self) -> Option<ControlMessage> {
        None
    }

    fn next_blocking(&mut self) -> Option<ControlMessage> {
        None
    }
}

impl EventSink for Detached {
    fn emit(&self, _event: ViewEvent) {}
}

/// Terminal outcome of one view computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome {
    /// The first `n` buffer slots hold the view.
    Done(usize),
    /// Superseded by a newer request or a dataset replacement.
    Cancelled,
    /// Refused before any work; the buffer was not touched.
    Rejected(ViewError),
}

/// Where the session is in the current computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    Idle,
    Sorting,
    Filtering,
    /// No filter: the ordered ids are copied straight into the buffer.
    WritingAll,
    Done,
    Cancelled,
}

/// Counters a consumer or test can inspect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Sorts that ran to completion.
    pub sorts: u64,
    /// Requests served from the sort cache.
    pub cache_hits: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub rejected: u64,
}

/// A request accepted during a checkpoint, waiting for the running one to
/// settle. `epoch` is the dataset epoch at acceptance.
#[derive(Debug)]
struct PendingView {
    buffer: ViewBuffer,
    request: ViewRequest,
    epoch: u64,
}

pub struct ViewSession {
    rows: Arc<RowStore>,
    cache: SortCache,
    config: EngineConfig,
    /// Generation of the most recently accepted request.
    generation: u64,
    /// Bumped on every dataset replacement.
    epoch: u64,
    pending: VecDeque<PendingView>,
    phase: ViewPhase,
    stats: SessionStats,
    shutdown: bool,
}

impl Default for ViewSession {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ViewSession {
    pub fn new(config: EngineConfig) -> Self {
        ViewSession {
            rows: Arc::new(RowStore::empty()),
            cache: SortCache::new(),
            config,
            generation: 0,
            epoch: 0,
            pending: VecDeque::new(),
            phase: ViewPhase::Idle,
            stats: SessionStats::default(),
            shutdown: false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rows(&self) -> &Arc<RowStore> {
        &self.rows
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> ViewPhase {
        self.phase
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// True if the sort cache currently holds an order.
    pub fn has_cached_sort(&self) -> bool {
        !self.cache.is_empty()
    }

    /// Replaces the dataset and drops the cached sort order. Any computation
    /// still running on the previous snapshot will cancel at its next
    /// checkpoint.
    pub fn set_rows(&mut self, rows: impl Into<Arc<RowStore>>) {
        self.rows = rows.into();
        self.cache.invalidate();
        self.epoch += 1;
        debug!("rows replaced: {} rows, epoch {}", self.rows.len(), self.epoch);
    }

    /// Records `generation` as the authoritative one.
    fn accept_generation(&mut self, generation: u64) {
        if generation < self.generation {
            warn!(
                "view generation {} is older than current generation {}",
                generation, self.generation
            );
        }
        self.generation = generation;
    }

    /// Handles a message that arrived while a computation was running.
    fn accept<S: EventSink + ?Sized>(&mut self, message: ControlMessage, sink: &S) {
        match message {
            ControlMessage::SetRows { rows } => self.set_rows(rows),
            ControlMessage::ComputeView { buffer, request } => {
                self.accept_generation(request.generation);
                self.pending.push_back(PendingView {
                    buffer,
                    request,
                    epoch: self.epoch,
                });
            }
            ControlMessage::Scroll { position } => sink.emit(ViewEvent::ScrollDone { position }),
            ControlMessage::Shutdown => self.shutdown = true,
        }
    }

    fn is_current(&self, generation: u64, epoch: u64) -> bool {
        !self.shutdown && self.generation == generation && self.epoch == epoch
    }

    fn checkpoint<'a, I, S>(
        &'a mut self,
        generation: u64,
        epoch: u64,
        inbox: &'a mut I,
        sink: &'a S,
    ) -> SessionCheckpoint<'a, I, S>
    where
        I: ControlSource + ?Sized,
        S: EventSink + ?Sized,
    {
        SessionCheckpoint {
            session: self,
            inbox,
            sink,
            generation,
            epoch,
        }
    }

    /// Starts a computation for `request`, making its generation current,
    /// and runs it to a terminal outcome.
    ///
    /// Messages drained from `inbox` at checkpoints are applied as they
    /// arrive; newer requests among them are queued and settled, with their
    /// terminal events, by the next [`handle`] or [`run`]. Early results go
    /// to `sink`; the terminal outcome of this request is returned, not
    /// emitted.
    ///
    /// [`handle`]: ViewSession::handle
    /// [`run`]: ViewSession::run
    pub fn compute_view<I, S>(
        &mut self,
        buffer: &ViewBuffer,
        request: &ViewRequest,
        inbox: &mut I,
        sink: &S,
    ) -> ViewOutcome
    where
        I: ControlSource + ?Sized,
        S: EventSink + ?Sized,
    {
        self.accept_generation(request.generation);
        let epoch = self.epoch;
        self.run_view(buffer, request, epoch, inbox, sink)
    }

    fn run_view<I, S>(
        &mut self,
        buffer: &ViewBuffer,
        request: &ViewRequest,
        epoch: u64,
        inbox: &mut I,
        sink: &S,
    ) -> ViewOutcome
    where
        I: ControlSource + ?Sized,
        S: EventSink + ?Sized,
    {
        let generation = request.generation;
        let outcome = if !self.is_current(generation, epoch) {
            Ok(Err(Cancelled))
        } else {
            self.validate(buffer, request)
                .map(|()| self.execute(buffer, request, epoch, inbox, sink))
        };

        match outcome {
            Ok(Ok(num_rows)) => {
                self.phase = ViewPhase::Done;
                self.stats.completed += 1;
                ViewOutcome::Done(num_rows)
            }
            Ok(Err(Cancelled)) => {
                info!("cancelled computation of view {} (current {})", generation, self.generation);
                self.phase = ViewPhase::Cancelled;
                self.stats.cancelled += 1;
                ViewOutcome::Cancelled
            }
            Err(err) => {
                warn!("rejected view {}: {}", generation, err);
                self.phase = ViewPhase::Idle;
                self.stats.rejected += 1;
                ViewOutcome::Rejected(err)
            }
        }
    }

    fn validate(&self, buffer: &ViewBuffer, request: &ViewRequest) -> Result<()> {
        let width = self.rows.width();
        request.sort.validate(width)?;
        request.filter.validate(width)?;
        if buffer.capacity() < self.rows.len() {
            return Err(ViewError::BufferTooSmall {
                capacity: buffer.capacity(),
                required: self.rows.len(),
            });
        }
        Ok(())
    }

    /// Sort (or reuse the cached order), then filter or copy into `buffer`.
    fn execute<I, S>(
        &mut self,
        buffer: &ViewBuffer,
        request: &ViewRequest,
        epoch: u64,
        inbox: &mut I,
        sink: &S,
    ) -> std::result::Result<usize, Cancelled>
    where
        I: ControlSource + ?Sized,
        S: EventSink + ?Sized,
    {
        let generation = request.generation;
        let rows = Arc::clone(&self.rows);
        let config = self.config.clone();

        let order = self.ordered_positions(&rows, request, epoch, inbox, sink)?;

        if self.checkpoint(generation, epoch, inbox, sink).checkpoint() {
            return Err(Cancelled);
        }

        let view = match &order {
            Some(order) => OrderedRows::sorted(rows.rows(), order),
            None => OrderedRows::source(rows.rows()),
        };

        let num_rows = if request.filter.is_empty() {
            self.phase = ViewPhase::WritingAll;
            let start = Instant::now();
            let mut writer = buffer.writer();
            for row in view.iter() {
                writer.push(row.id);
            }
            debug!("returning early after sort, wrote buffer in {:?}", start.elapsed());
            writer.len()
        } else {
            self.phase = ViewPhase::Filtering;
            let start = Instant::now();
            let on_early_results = |num_rows| {
                info!("early results {} for view {}", num_rows, generation);
                sink.emit(ViewEvent::EarlyResults {
                    generation,
                    num_rows,
                });
            };
            let num_rows = filter_rows(
                view,
                &request.filter,
                buffer,
                &config,
                &mut self.checkpoint(generation, epoch, inbox, sink),
                on_early_results,
            )?;
            info!(
                "filtering happened, num rows: {} in {:?}",
                num_rows,
                start.elapsed()
            );
            num_rows
        };

        if self.checkpoint(generation, epoch, inbox, sink).checkpoint() {
            return Err(Cancelled);
        }
        Ok(num_rows)
    }

    /// The row order for `request`: None for source order, the cached order
    /// on a key match, otherwise a fresh stable sort that is then cached.
    fn ordered_positions<I, S>(
        &mut self,
        rows: &RowStore,
        request: &ViewRequest,
        epoch: u64,
        inbox: &mut I,
        sink: &S,
    ) -> std::result::Result<Option<Arc<[usize]>>, Cancelled>
    where
        I: ControlSource + ?Sized,
        S: EventSink + ?Sized,
    {
        if request.sort.is_empty() {
            return Ok(None);
        }

        // Serializing a SortSpec cannot fail in practice; if it ever does,
        // sort without touching the cache.
        let key = request.sort.cache_key().ok();
        if let Some(order) = key.as_deref().and_then(|k| self.cache.get(k)) {
            debug!("sort cache hit for view {}", request.generation);
            self.stats.cache_hits += 1;
            return Ok(Some(order));
        }

        self.phase = ViewPhase::Sorting;
        let start = Instant::now();
        let positions: Vec<usize> = (0..rows.len()).collect();
        let compare = request.sort.comparator();
        let data = rows.rows();
        let min_run = self.config.min_run;
        let sorted = stable_sort(
            &positions,
            min_run,
            |&a, &b| compare(&data[a], &data[b]),
            &mut self.checkpoint(request.generation, epoch, inbox, sink),
        )?;
        info!("sorting {} rows took {:?}", rows.len(), start.elapsed());

        self.stats.sorts += 1;
        let sorted: Arc<[usize]> = sorted.into();
        if let Some(key) = key {
            self.cache.insert(key, Arc::clone(&sorted));
        }
        Ok(Some(sorted))
    }

    /// Handles one control message to completion, emitting the terminal
    /// event of any computation it runs.
    pub fn handle<I, S>(&mut self, message: ControlMessage, inbox: &mut I, sink: &S)
    where
        I: ControlSource + ?Sized,
        S: EventSink + ?Sized,
    {
        match message {
            ControlMessage::ComputeView { buffer, request } => {
                let outcome = self.compute_view(&buffer, &request, inbox, sink);
                emit_outcome(sink, request.generation, outcome);
            }
            other => self.accept(other, sink),
        }
        self.drain_pending(inbox, sink);
    }

    /// Runs requests queued during checkpoints, oldest first. Superseded
    /// ones settle as cancelled without doing any work.
    fn drain_pending<I, S>(&mut self, inbox: &mut I, sink: &S)
    where
        I: ControlSource + ?Sized,
        S: EventSink + ?Sized,
    {
        while let Some(job) = self.pending.pop_front() {
            let outcome = self.run_view(&job.buffer, &job.request, job.epoch, inbox, sink);
            emit_outcome(sink, job.request.generation, outcome);
        }
    }

    /// Settles requests left queued by an earlier [`compute_view`], then
    /// processes messages until the source closes or a `Shutdown` arrives.
    ///
    /// [`compute_view`]: ViewSession::compute_view
    pub fn run<I, S>(&mut self, inbox: &mut I, sink: &S)
    where
        I: ControlSource + ?Sized,
        S: EventSink + ?Sized,
    {
        self.drain_pending(inbox, sink);
        while !self.shutdown {
            match inbox.next_blocking() {
                Some(message) => self.handle(message, inbox, sink),
                None => break,
            }
        }
        debug!("view session stopped: {:?}", self.stats);
    }
}

fn emit_outcome<S: EventSink + ?Sized>(sink: &S, generation: u64, outcome: ViewOutcome) {
    let event = match outcome {
        ViewOutcome::Done(num_rows) => ViewEvent::Done {
            generation,
            num_rows,
        },
        ViewOutcome::Cancelled => ViewEvent::Cancelled { generation },
        ViewOutcome::Rejected(err) => ViewEvent::Rejected {
            generation,
            message: err.to_string(),
        },
    };
    sink.emit(event);
}

/// Checkpoint bound to one computation of a session.
struct SessionCheckpoint<'a, I: ?Sized, S: ?Sized> {
    session: &'a mut ViewSession,
    inbox: &'a mut I,
    sink: &'a S,
    generation: u64,
    epoch: u64,
}

impl<I, S> Checkpoint for SessionCheckpoint<'_, I, S>
where
    I: ControlSource + ?Sized,
    S: EventSink + ?Sized,
{
    fn yield_now(&mut self) {
        while let Some(message) = self.inbox.try_next() {
            self.session.accept(message, self.sink);
        }
    }

    fn should_cancel(&mut self) -> bool {
        !self.session.is_current(self.generation, self.epoch)
    }
}
