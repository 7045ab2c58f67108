//! Thread-safe event feeds.
//!
//! Two queues feed the engine: the watcher pushes [`ChangeEvent`]s into a
//! [`ChangeQueue`] (deduplicated, threshold-or-timeout drained) and the
//! remote notification channel pushes [`RemoteEvent`]s into a plain
//! [`EventQueue`]. Pushing never takes the store-wide lock; closing a
//! queue is the cooperative shutdown signal its consumer observes at every
//! blocking wait.

use driftsync_proto::ChangeEvent;
use parking_lot::{Condvar, Mutex};
use std::collections::{BTreeSet, VecDeque};
use std::time::{Duration, Instant};

/// Outcome of a batcher drain.
#[derive(Debug, PartialEq, Eq)]
pub enum Drained {
    /// Everything queued at wake time, possibly empty on a timeout wake.
    Batch(Vec<ChangeEvent>),
    /// The queue was closed; the consumer should exit.
    Closed,
}

struct ChangeState {
    queue: VecDeque<ChangeEvent>,
    /// Mirrors `queue` by (kind, path, entity) to collapse duplicates.
    pending: BTreeSet<ChangeEvent>,
    closed: bool,
}

/// Deduplicating feed of local change events.
pub struct ChangeQueue {
    state: Mutex<ChangeState>,
    wake: Condvar,
}

impl ChangeQueue {
    /// Creates an open, empty queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChangeState {
                queue: VecDeque::new(),
                pending: BTreeSet::new(),
                closed: false,
            }),
            wake: Condvar::new(),
        }
    }

    /// Queues an event. A duplicate of an event already queued collapses
    /// into the existing instance; pushes to a closed queue are dropped.
    /// Returns true if the event was actually queued.
    pub fn push(&self, event: ChangeEvent) -> bool {
        let mut state = self.state.lock();
        if state.closed || !state.pending.insert(event.clone()) {
            return false;
        }
        state.queue.push_back(event);
        self.wake.notify_all();
        true
    }

    /// Blocks until the queue depth reaches `threshold` or `wait` elapses,
    /// whichever comes first, then drains the entire queue atomically.
    pub fn drain_wait(&self, threshold: usize, wait: Duration) -> Drained {
        let deadline = Instant::now() + wait;
        let mut state = self.state.lock();
        while state.queue.len() < threshold && !state.closed {
            if self.wake.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        if state.closed && state.queue.is_empty() {
            return Drained::Closed;
        }
        let events: Vec<ChangeEvent> = state.queue.drain(..).collect();
        for event in &events {
            state.pending.remove(event);
        }
        Drained::Batch(events)
    }

    /// Closes the queue, waking the consumer. Already-queued events are
    /// still delivered before the consumer observes the close.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.wake.notify_all();
    }

    /// Current queue depth.
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ChangeQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a single-event poll.
#[derive(Debug, PartialEq, Eq)]
pub enum Polled<T> {
    /// The next queued event.
    Event(T),
    /// Nothing arrived within the wait.
    TimedOut,
    /// The queue was closed and drained; the consumer should exit.
    Closed,
}

struct EventState<T> {
    queue: VecDeque<T>,
    closed: bool,
}

/// Plain FIFO feed with a timed blocking pop.
pub struct EventQueue<T> {
    state: Mutex<EventState<T>>,
    wake: Condvar,
}

impl<T> EventQueue<T> {
    /// Creates an open, empty queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EventState {
                queue: VecDeque::new(),
                closed: false,
            }),
            wake: Condvar::new(),
        }
    }

    /// Queues an event; dropped if the queue is closed.
    pub fn push(&self, event: T) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.queue.push_back(event);
        self.wake.notify_all();
    }

    /// Pops the next event, waiting up to `wait` for one to arrive.
    pub fn pop_wait(&self, wait: Duration) -> Polled<T> {
        let deadline = Instant::now() + wait;
        let mut state = self.state.lock();
        loop {
            if let Some(event) = state.queue.pop_front() {
                return Polled::Event(event);
            }
            if state.closed {
                return Polled::Closed;
            }
            if self.wake.wait_until(&mut state, deadline).timed_out() {
                return Polled::TimedOut;
            }
        }
    }

    /// Closes the queue, waking the consumer.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.wake.notify_all();
    }

    /// Current queue depth.
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
