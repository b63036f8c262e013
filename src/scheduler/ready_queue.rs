use crossbeam::queue::SegQueue;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free multi-producer queue of released nodes, bounded by `capacity`.
///
/// Workers push successors they release; the coordinator pops them for
/// dispatch.
pub struct ReadyQueue<T> {
    queue: SegQueue<T>,
    capacity: usize,
    size: AtomicUsize,
}

impl<T> ReadyQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: SegQueue::new(),
            capacity,
            size: AtomicUsize::new(0),
        }
    }

    /// Push an item. Returns the item back when the queue is full.
    pub fn push(&self, item: T) -> Result<(), T> {
        let reserved = self
            .size
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |size| {
                (size < self.capacity).then_some(size + 1)
            });
        match reserved {
            Ok(_) => {
                self.queue.push(item);
                Ok(())
            }
            Err(_) => Err(item),
        }
    }

    pub fn pop(&self) -> Option<T> {
        let item = self.queue.pop()?;
        self.size.fetch_sub(1, Ordering::AcqRel);
        Some(item)
    }

    /// Pop everything currently queued.
    pub fn drain(&self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.len());
        while let Some(item) = self.pop() {
            items.push(item);
        }
        items
    }

    pub fn len(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }
}
