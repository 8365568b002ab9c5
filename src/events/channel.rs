//! Progress plumbing between the pipeline workers and whoever renders it.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::Event;

/// Write end handed to the pipeline.
///
/// Every rayon worker gets a clone. Reporting is fire and forget: a run
/// with nobody listening behaves exactly like one with a progress bar.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Wrap a crossbeam sender the caller already owns
    pub fn new(sender: Sender<Event>) -> Self {
        Self { inner: sender }
    }

    /// Report `event`, discarding it if the read end was dropped
    pub fn send(&self, event: Event) {
        self.inner.send(event).ok();
    }
}

/// Read end kept by the front end
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Wait for the next event. `None` once every sender is dropped.
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Next queued event, if one is waiting
    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Blocking iterator that ends when the run drops its senders
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

fn pair((sender, receiver): (Sender<Event>, Receiver<Event>)) -> (EventSender, EventReceiver) {
    (EventSender::new(sender), EventReceiver { inner: receiver })
}

/// Constructors for connected sender and receiver pairs
pub struct EventChannel;

impl EventChannel {
    /// Queue without a limit; the pipeline never waits on the listener
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (EventSender, EventReceiver) {
        pair(unbounded())
    }

    /// Queue holding at most `capacity` events. Workers block while it is
    /// full, so a slow listener throttles the run.
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        pair(bounded(capacity))
    }
}

/// Sender whose events go nowhere
pub fn null_sender() -> EventSender {
    EventChannel::new().0
}
