/// View worker thread
///
/// A ViewWorker runs one ViewSession on a dedicated thread. The consumer
/// talks to it through a control channel and reads outcomes from an event
/// channel; the only memory both sides touch is the ViewBuffer.
use crate::buffer::ViewBuffer;
use crate::config::EngineConfig;
use crate::error::{Result, ViewError};
use crate::filter::FilterSpec;
use crate::messages::{ControlMessage, ViewEvent, ViewRequest};
use crate::row::RowStore;
use crate::session::ViewSession;
use crate::sort::SortSpec;
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct ViewWorker {
    control: Sender<ControlMessage>,
    events: Receiver<ViewEvent>,
    next_generation: AtomicU64,
    handle: Option<JoinHandle<()>>,
}

impl ViewWorker {
    /// Starts a worker thread with its own empty session.
    pub fn spawn(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let (control, mut inbox) = channel::<ControlMessage>();
        let (outbox, events) = channel::<ViewEvent>();

        let handle = thread::Builder::new()
            .name("gridview-worker".to_string())
            .spawn(move || {
                debug!("view worker started");
                let mut session = ViewSession::new(config);
                session.run(&mut inbox, &outbox);
            })
            .map_err(|e| ViewError::Spawn(e.to_string()))?;

        Ok(ViewWorker {
            control,
            events,
            next_generation: AtomicU64::new(0),
            handle: Some(handle),
        })
    }

    fn send(&self, message: ControlMessage) -> Result<()> {
        self.control.send(message).map_err(|_| ViewError::Disconnected)
    }

    /// Replaces the worker's dataset.
    pub fn set_rows(&self, rows: impl Into<Arc<RowStore>>) -> Result<()> {
        self.send(ControlMessage::SetRows { rows: rows.into() })
    }

    /// Submits a request with a caller-chosen generation.
    pub fn compute_view(&self, buffer: &ViewBuffer, request: ViewRequest) -> Result<()> {
        self.next_generation
            .fetch_max(request.generation, Ordering::AcqRel);
        self.send(ControlMessage::ComputeView {
            buffer: buffer.clone(),
            request,
        })
    }

    /// Submits a request tagged with the next generation and returns that
    /// generation.
    pub fn compute(&self, buffer: &ViewBuffer, sort: SortSpec, filter: FilterSpec) -> Result<u64> {
        let generation = self.next_generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.compute_view(buffer, ViewRequest::new(sort, filter, generation))?;
        Ok(generation)
    }

    pub fn scroll(&self, position: f64) -> Result<()> {
        self.send(ControlMessage::Scroll { position })
    }

    /// Outbound events, in the order the worker produced them.
    pub fn events(&self) -> &Receiver<ViewEvent> {
        &self.events
    }

    /// Waits for the terminal event of `generation`, skipping everything
    /// else. Returns None on timeout.
    pub fn wait_for(&self, generation: u64, timeout: Duration) -> Result<Option<ViewEvent>> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(event) if event.is_terminal() && event.generation() == Some(generation) => {
                    return Ok(Some(event))
                }
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(ViewError::Disconnected),
            }
        }
    }

    /// Stops the worker and waits for its thread to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.control.send(ControlMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ViewWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::CellValue;
    use crate::row::Row;
    use crate::sort::SortKey;

    const TIMEOUT: Duration = Duration::from_secs(30);

    fn rows(count: u32) -> RowStore {
        RowStore::new(
            (0..count)
                .map(|i| {
                    let name = if i % 5 < 3 { "Alpha" } else { "Beta" };
                    Row::new(i, vec![CellValue::from(name), CellValue::from((i % 11) as i64)])
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_worker_round_trip() {
        let worker = ViewWorker::spawn(EngineConfig::default()).unwrap();
        let buffer = ViewBuffer::with_capacity(10);
        worker.set_rows(rows(10)).unwrap();

        let generation = worker
            .compute(&buffer, SortSpec::new(vec![SortKey::descending(1)]), FilterSpec::new().with(0, "alp"))
            .unwrap();
        assert_eq!(generation, 1);

        let event = worker.wait_for(generation, TIMEOUT).unwrap();
        assert_eq!(
            event,
            Some(ViewEvent::Done {
                generation: 1,
                num_rows: 6
            })
        );
        // Alpha rows are 0,1,2,5,6,7; column 1 is i % 11, so descending by i.
        assert_eq!(buffer.prefix(6), vec![7, 6, 5, 2, 1, 0]);
        worker.shutdown();
    }

    #[test]
    fn test_worker_scroll_ack() {
        let worker = ViewWorker::spawn(EngineConfig::default()).unwrap();
        worker.scroll(12.0).unwrap();
        assert_eq!(
            worker.events().recv_timeout(TIMEOUT).unwrap(),
            ViewEvent::ScrollDone { position: 12.0 }
        );
    }

    #[test]
    fn test_worker_cancellation_race() {
        let worker = ViewWorker::spawn(EngineConfig::default()).unwrap();
        let buffer = ViewBuffer::with_capacity(100_000);
        worker.set_rows(rows(100_000)).unwrap();

        let filter = FilterSpec::new().with(0, "alpha");
        let first = worker.compute(&buffer, SortSpec::new(vec![SortKey::ascending(1)]), filter.clone()).unwrap();
        let second = worker.compute(&buffer, SortSpec::default(), filter).unwrap();
        assert_eq!((first, second), (1, 2));

        let done = worker.wait_for(second, TIMEOUT).unwrap();
        assert_eq!(
            done,
            Some(ViewEvent::Done {
                generation: 2,
                num_rows: 60_000
            })
        );

        // Generation 1 ends exactly once. It may have finished before the
        // second request arrived; if not, it reports nothing but Cancelled.
        worker.shutdown();
    }

    #[test]
    fn test_worker_superseded_never_done_after_newer_starts() {
        let worker = ViewWorker::spawn(EngineConfig::default()).unwrap();
        let buffer = ViewBuffer::with_capacity(100_000);
        worker.set_rows(rows(100_000)).unwrap();

        let filter = FilterSpec::new().with(0, "alpha");
        for _ in 0..5 {
            worker.compute(&buffer, SortSpec::new(vec![SortKey::descending(1)]), filter.clone()).unwrap();
        }
        let last = worker.compute(&buffer, SortSpec::default(), filter).unwrap();

        let mut seen = Vec::new();
        loop {
            let event = worker.events().recv_timeout(TIMEOUT).unwrap();
            let finished = event.is_terminal() && event.generation() == Some(last);
            seen.push(event);
            if finished {
                break;
            }
        }

        // Every earlier generation settles exactly once, in order, and no
        // event of an older generation follows the first event of a newer one.
        let terminal: Vec<u64> = seen.iter().filter(|e| e.is_terminal()).filter_map(|e| e.generation()).collect();
        assert_eq!(terminal, (1..=last).collect::<Vec<_>>());
        let generations: Vec<u64> = seen.iter().filter_map(|e| e.generation()).collect();
        assert!(generations.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(
            seen.last(),
            Some(&ViewEvent::Done {
                generation: last,
                num_rows: 60_000
            })
        );
    }

    #[test]
    fn test_spawn_rejects_bad_config() {
        let config = EngineConfig {
            chunk_size: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(ViewWorker::spawn(config), Err(ViewError::InvalidConfig { .. })));
    }
}
