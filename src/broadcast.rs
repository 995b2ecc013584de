use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::Tap;

/// Fan-out of classified taps. Every subscriber gets its own channel and sees every tap.
#[derive(Default)]
pub(crate) struct TapBroadcast {
    subscribers: Mutex<Vec<Sender<Tap>>>,
}

impl TapBroadcast {
    pub(crate) fn subscribe(&self) -> Receiver<Tap> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(sender);
        receiver
    }

    /// Send `tap` to every live subscriber, forgetting those that hung up.
    pub(crate) fn publish(&self, tap: Tap) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(tap).is_ok());
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Drop all senders so every subscriber's iterator ends.
    pub(crate) fn close(&self) {
        self.subscribers.lock().clear();
    }
}
