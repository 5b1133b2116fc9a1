/// Shared output buffer.
///
/// A ViewBuffer is a fixed-capacity array of row ids shared between the view
/// worker and its consumer. The worker writes matching ids forward from
/// offset 0 through a [`BufferWriter`]; the consumer reads only the prefix
/// whose length was reported with the latest `Done` event of the current
/// generation. Every element write is a single atomic store, so a reader
/// never observes a torn id. Entries past the reported prefix are stale.
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct ViewBuffer {
    slots: Arc<[AtomicU32]>,
}

impl ViewBuffer {
    /// Allocates a zeroed buffer. Capacity must cover the largest dataset
    /// the session will hold.
    pub fn with_capacity(capacity: usize) -> Self {
        let slots: Arc<[AtomicU32]> = (0..capacity).map(|_| AtomicU32::new(0)).collect();
        ViewBuffer { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Starts a forward-only write pass at offset 0.
    pub fn writer(&self) -> BufferWriter<'_> {
        BufferWriter {
            slots: &self.slots,
            offset: 0,
        }
    }

    /// Reads one slot.
    pub fn load(&self, offset: usize) -> Option<u32> {
        self.slots.get(offset).map(|slot| slot.load(Ordering::Acquire))
    }

    /// Copies the first `num_rows` ids, clamped to the capacity.
    pub fn prefix(&self, num_rows: usize) -> Vec<u32> {
        self.slots[..num_rows.min(self.slots.len())]
            .iter()
            .map(|slot| slot.load(Ordering::Acquire))
            .collect()
    }

    /// True if both handles share the same allocation.
    pub fn same_buffer(&self, other: &ViewBuffer) -> bool {
        Arc::ptr_eq(&self.slots, &other.slots)
    }
}

impl fmt::Debug for ViewBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewBuffer")
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Appends ids at strictly increasing offsets.
///
/// Callers check the capacity up front; pushing past it is a bug and panics.
pub struct BufferWriter<'a> {
    slots: &'a [AtomicU32],
    offset: usize,
}

impl BufferWriter<'_> {
    #[inline]
    pub fn push(&mut self, id: u32) {
        self.slots[self.offset].store(id, Ordering::Release);
        self.offset += 1;
    }

    /// Number of ids written so far.
    pub fn len(&self) -> usize {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset == 0
    }
}
