//! Queued progress reports.
//!
//! Sensors that fire "in the same frame" push [`ProgressEvent`]s into a queue
//! owned by the host loop, which later drains it into the sequencer. This
//! keeps every report serialized through the one owner of the sequencer.

use core::convert::Infallible;
use core::time::Duration;

use heapless::Deque;

/// Default depth for [`ProgressQueue`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Inbound call waiting to be applied to the sequencer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProgressEvent {
    InstantAction,
    Action,
    ActionUndo,
    TimerStart,
    TimerStop,
    Tick(Duration),
    CompleteStep,
}

/// Error surfaced when an event cannot be enqueued.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum EnqueueError<E = Infallible> {
    /// Queue has reached its maximum capacity.
    #[error("progress queue is full")]
    QueueFull,
    /// Queue has been disconnected from its consumer.
    #[error("progress queue is disconnected")]
    Disconnected,
    /// Transport-specific failure.
    #[error("progress queue failed: {0}")]
    Other(E),
}

impl<E> EnqueueError<E> {
    /// Maps the inner error type.
    pub fn map_other<F, M>(self, mapper: M) -> EnqueueError<F>
    where
        M: FnOnce(E) -> F,
    {
        match self {
            EnqueueError::QueueFull => EnqueueError::QueueFull,
            EnqueueError::Disconnected => EnqueueError::Disconnected,
            EnqueueError::Other(err) => EnqueueError::Other(mapper(err)),
        }
    }
}

/// Error surfaced when dequeueing fails.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DequeueError<E = Infallible> {
    /// Queue has been disconnected from its producers.
    #[error("progress queue is disconnected")]
    Disconnected,
    /// Transport-specific failure.
    #[error("progress queue failed: {0}")]
    Other(E),
}

impl<E> DequeueError<E> {
    /// Maps the inner error type.
    pub fn map_other<F, M>(self, mapper: M) -> DequeueError<F>
    where
        M: FnOnce(E) -> F,
    {
        match self {
            DequeueError::Disconnected => DequeueError::Disconnected,
            DequeueError::Other(err) => DequeueError::Other(mapper(err)),
        }
    }
}

/// Implemented by anything sensors can push progress events into.
pub trait ProgressQueueProducer {
    /// Transport-specific error type.
    type Error;

    /// Attempts to enqueue an event without blocking.
    fn try_enqueue(&mut self, event: ProgressEvent) -> Result<(), EnqueueError<Self::Error>>;

    /// Returns the queue capacity if it is known.
    fn capacity(&self) -> Option<usize> {
        None
    }

    /// Returns the current queue depth if it can be observed.
    fn len(&self) -> Option<usize> {
        None
    }

    /// Returns `true` when the queue reports that it holds no events.
    fn is_empty(&self) -> Option<bool> {
        self.len().map(|current| current == 0)
    }

    /// Remaining slots, when both capacity and length are known.
    fn remaining(&self) -> Option<usize> {
        match (self.capacity(), self.len()) {
            (Some(capacity), Some(len)) => Some(capacity.saturating_sub(len)),
            _ => None,
        }
    }

    /// Returns `true` when the queue reports that it is full.
    fn is_full(&self) -> Option<bool> {
        self.remaining().map(|slots| slots == 0)
    }
}

/// Implemented by the host side that drains events into the sequencer.
pub trait ProgressQueueConsumer {
    /// Transport-specific error type.
    type Error;

    /// Returns `Ok(Some(event))` when an event was waiting, `Ok(None)` when
    /// the queue is empty.
    fn try_dequeue(&mut self) -> Result<Option<ProgressEvent>, DequeueError<Self::Error>>;
}

/// Bounded FIFO of progress events backed by a ring buffer.
#[derive(Clone, Debug)]
pub struct ProgressQueue<const N: usize = DEFAULT_QUEUE_CAPACITY> {
    events: Deque<ProgressEvent, N>,
}

impl<const N: usize> ProgressQueue<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            events: Deque::new(),
        }
    }

    /// Drops every pending event.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Pending events in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &ProgressEvent> {
        self.events.iter()
    }
}

impl<const N: usize> Default for ProgressQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ProgressQueueProducer for ProgressQueue<N> {
    type Error = Infallible;

    fn try_enqueue(&mut self, event: ProgressEvent) -> Result<(), EnqueueError<Self::Error>> {
        self.events
            .push_back(event)
            .map_err(|_| EnqueueError::QueueFull)
    }

    fn capacity(&self) -> Option<usize> {
        Some(N)
    }

    fn len(&self) -> Option<usize> {
        Some(self.events.len())
    }
}

impl<const N: usize> ProgressQueueConsumer for ProgressQueue<N> {
    type Error = Infallible;

    fn try_dequeue(&mut self) -> Result<Option<ProgressEvent>, DequeueError<Self::Error>> {
        Ok(self.events.pop_front())
    }
}
