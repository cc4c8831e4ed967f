use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Fixed-capacity single-producer/single-consumer queue.
///
/// Slots are preallocated from a template at construction and items are
/// copied in and out with `clone_from`, so moving `Vec` blocks of a fixed
/// length through the queue never allocates. Create it, then [`split`] it into
/// a [`Producer`] and a [`Consumer`] for the two threads.
///
/// [`split`]: LockFreeRingBuffer::split
pub struct LockFreeRingBuffer<T> {
    slots: Box<[UnsafeCell<T>]>,
    /// Total number of pushes, only advanced by the producer
    write: AtomicUsize,
    /// Total number of pops, only advanced by the consumer
    read: AtomicUsize,
}

// Each slot is touched by exactly one side at a time: the producer only writes
// slots in `[write, read + capacity)`, the consumer only reads `[read, write)`.
// The cursor stores are Release and the opposite loads Acquire, which orders a
// slot access before the other side sees the cursor move past it.
unsafe impl<T: Send> Sync for LockFreeRingBuffer<T> {}

impl<T: Clone> LockFreeRingBuffer<T> {
    /// Preallocate `capacity` slots, each a clone of `template`
    pub fn new(capacity: usize, template: &T) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");

        Self {
            slots: (0..capacity)
                .map(|_| UnsafeCell::new(template.clone()))
                .collect(),
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        }
    }

    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        let shared = Arc::new(self);
        (
            Producer {
                shared: shared.clone(),
            },
            Consumer { shared },
        )
    }
}

impl<T> LockFreeRingBuffer<T> {
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn len(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }
}

/// Writing half. Never blocks: a push into a full queue is refused.
pub struct Producer<T> {
    shared: Arc<LockFreeRingBuffer<T>>,
}

impl<T: Clone> Producer<T> {
    /// Copy `item` into the next free slot. Returns `false` and leaves the
    /// queue untouched when it is full.
    pub fn push(&mut self, item: &T) -> bool {
        let shared = &*self.shared;
        let write = shared.write.load(Ordering::Relaxed);
        let read = shared.read.load(Ordering::Acquire);
        if write.wrapping_sub(read) >= shared.capacity() {
            return false;
        }

        let slot = &shared.slots[write % shared.capacity()];
        // SAFETY: the slot is outside `[read, write)`, so the consumer cannot be
        // looking at it until the store below publishes it
        unsafe { (*slot.get()).clone_from(item) };
        shared.write.store(write.wrapping_add(1), Ordering::Release);
        true
    }
}

impl<T> Producer<T> {
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reading half. Never blocks: a pop from an empty queue is refused.
pub struct Consumer<T> {
    shared: Arc<LockFreeRingBuffer<T>>,
}

impl<T: Clone> Consumer<T> {
    /// Copy the oldest item into `out`. Returns `false` and leaves `out`
    /// untouched when the queue is empty.
    pub fn pop(&mut self, out: &mut T) -> bool {
        let shared = &*self.shared;
        let read = shared.read.load(Ordering::Relaxed);
        let write = shared.write.load(Ordering::Acquire);
        if read == write {
            return false;
        }

        let slot = &shared.slots[read % shared.capacity()];
        // SAFETY: the slot is inside `[read, write)`, the producer will not
        // reuse it until the store below hands it back
        unsafe { out.clone_from(&*slot.get()) };
        shared.read.store(read.wrapping_add(1), Ordering::Release);
        true
    }

    /// Drop everything currently queued
    pub fn clear(&mut self) {
        let write = self.shared.write.load(Ordering::Acquire);
        self.shared.read.store(write, Ordering::Release);
    }
}

impl<T> Consumer<T> {
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }

    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
