//! Event channel backed by crossbeam-channel.
//!
//! Workers and the orchestrator share clones of one [`EventSender`]; the
//! CLI (or any other front end) drains the matching [`EventReceiver`].

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::Event;

/// Publishing half of an event channel. Cheap to clone.
#[derive(Clone, Default)]
pub struct EventSender {
    inner: Option<Sender<Event>>,
}

impl EventSender {
    /// Publish an event.
    ///
    /// Events sent after the receiver is gone, or through a
    /// [`null_sender`], are dropped: progress reporting is optional and
    /// never fails a run.
    pub fn send(&self, event: Event) {
        if let Some(inner) = &self.inner {
            let _ = inner.send(event);
        }
    }

    /// False for a [`null_sender`].
    pub fn is_connected(&self) -> bool {
        self.inner.is_some()
    }
}

/// Subscribing half of an event channel.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Wait for the next event; `None` once every sender is gone.
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Blocking iterator that ends when every sender is dropped.
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Constructors for connected sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Unbounded channel: the pipeline never waits for the listener.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        Self::pair(sender, receiver)
    }

    /// Bounded channel: a slow listener throttles the pipeline once
    /// `capacity` events are pending.
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        let (sender, receiver) = bounded(capacity);
        Self::pair(sender, receiver)
    }

    fn pair(sender: Sender<Event>, receiver: Receiver<Event>) -> (EventSender, EventReceiver) {
        (
            EventSender {
                inner: Some(sender),
            },
            EventReceiver { inner: receiver },
        )
    }
}

/// A sender with no listener, for runs without progress reporting.
pub fn null_sender() -> EventSender {
    EventSender::default()
}
