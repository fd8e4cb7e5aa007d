//! Time-ordered, thread-safe event queue.
//!
//! Producers on any thread push events through [`EventQueue::enqueue`] or a
//! cloned [`EventSender`]; the driver polls [`EventQueue::drain_due`] once per
//! timestep.
//!
//! # Ordering
//!
//! Events are delivered by `(timestamp, enqueue sequence)`. The sequence number
//! is taken under the same lock as the insertion, so ties are broken by the
//! order in which `enqueue` calls completed.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::event::Event;

/// Errors reported to producers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueError {
    #[error("Event queue is closed")]
    Closed,

    #[error("Event queue is full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("Invalid event timestamp: {time}")]
    InvalidTimestamp { time: f64 },
}

struct Entry {
    seq: u64,
    event: Event,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the max-heap pops the earliest (time, seq) first.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .event
            .time
            .total_cmp(&self.event.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct State {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
    closed: bool,
}

struct Shared {
    state: Mutex<State>,
    capacity: Option<usize>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, event: Event) -> Result<(), QueueError> {
        if !event.time.is_finite() || event.time < 0.0 {
            return Err(QueueError::InvalidTimestamp { time: event.time });
        }
        let mut state = self.lock();
        if state.closed {
            return Err(QueueError::Closed);
        }
        if let Some(capacity) = self.capacity
            && state.heap.len() >= capacity
        {
            return Err(QueueError::Full { capacity });
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Entry { seq, event });
        Ok(())
    }

    fn close(&self) {
        self.lock().closed = true;
    }
}

/// Consumer side of the queue, owned by the simulation driver.
pub struct EventQueue {
    shared: Arc<Shared>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    /// Unbounded queue.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Queue that rejects enqueues beyond `capacity` pending events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "EventQueue capacity must be at least 1");
        Self::build(Some(capacity))
    }

    fn build(capacity: Option<usize>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                capacity,
            }),
        }
    }

    /// Producer handle that can be cloned and moved to other threads.
    pub fn sender(&self) -> EventSender {
        EventSender {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn enqueue(&self, event: Event) -> Result<(), QueueError> {
        self.shared.enqueue(event)
    }

    /// Remove and return every event with `time <= up_to`, earliest first.
    ///
    /// Never waits: returns an empty vector when nothing is due.
    pub fn drain_due(&self, up_to: f64) -> Vec<Event> {
        let mut state = self.shared.lock();
        let mut due = Vec::new();
        while state
            .heap
            .peek()
            .is_some_and(|entry| entry.event.time <= up_to)
        {
            if let Some(entry) = state.heap.pop() {
                due.push(entry.event);
            }
        }
        due
    }

    /// Timestamp of the earliest pending event.
    pub fn next_due(&self) -> Option<f64> {
        self.shared.lock().heap.peek().map(|e| e.event.time)
    }

    pub fn len(&self) -> usize {
        self.shared.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reject all further enqueues. Pending events can still be drained.
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

/// Cloneable producer handle.
#[derive(Clone)]
pub struct EventSender {
    shared: Arc<Shared>,
}

impl EventSender {
    pub fn enqueue(&self, event: Event) -> Result<(), QueueError> {
        self.shared.enqueue(event)
    }

    pub fn close(&self) {
        self.shared.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(time: f64, value: f64) -> Event {
        Event::signal(time, "ch", value)
    }

    fn values(events: &[Event]) -> Vec<f64> {
        events
            .iter()
            .map(|e| match &e.payload {
                crate::event::EventPayload::ExternalSignal { value, .. } => *value,
                _ => f64::NAN,
            })
            .collect()
    }

    #[test]
    fn drain_returns_only_due_events_in_order() {
        let q = EventQueue::new();
        q.enqueue(signal(0.3, 3.0)).unwrap();
        q.enqueue(signal(0.1, 1.0)).unwrap();
        q.enqueue(signal(0.2, 2.0)).unwrap();

        let due = q.drain_due(0.2);
        assert_eq!(values(&due), vec![1.0, 2.0]);
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_due(), Some(0.3));
    }

    #[test]
    fn ties_break_by_enqueue_order() {
        let q = EventQueue::new();
        for v in 0..5 {
            q.enqueue(signal(0.5, v as f64)).unwrap();
        }
        assert_eq!(values(&q.drain_due(0.5)), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn drain_with_nothing_due_is_empty() {
        let q = EventQueue::new();
        q.enqueue(signal(1.0, 1.0)).unwrap();
        assert!(q.drain_due(0.5).is_empty());
        assert!(q.drain_due(0.99).is_empty());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn events_are_delivered_at_most_once() {
        let q = EventQueue::new();
        q.enqueue(signal(0.0, 1.0)).unwrap();
        assert_eq!(q.drain_due(1.0).len(), 1);
        assert!(q.drain_due(1.0).is_empty());
    }

    #[test]
    fn closed_queue_rejects_producers() {
        let q = EventQueue::new();
        let tx = q.sender();
        q.enqueue(signal(0.0, 1.0)).unwrap();
        tx.close();
        assert!(q.is_closed());
        assert_eq!(tx.enqueue(signal(0.1, 2.0)), Err(QueueError::Closed));
        assert_eq!(q.drain_due(1.0).len(), 1);
    }

    #[test]
    fn bounded_queue_reports_full() {
        let q = EventQueue::with_capacity(1);
        q.enqueue(signal(0.0, 1.0)).unwrap();
        assert_eq!(
            q.enqueue(signal(0.0, 2.0)),
            Err(QueueError::Full { capacity: 1 })
        );
        q.drain_due(0.0);
        assert!(q.enqueue(signal(0.0, 3.0)).is_ok());
    }

    #[test]
    fn invalid_timestamps_rejected() {
        let q = EventQueue::new();
        assert!(matches!(
            q.enqueue(signal(f64::NAN, 0.0)),
            Err(QueueError::InvalidTimestamp { .. })
        ));
        assert!(q.enqueue(signal(-1.0, 0.0)).is_err());
    }
}
