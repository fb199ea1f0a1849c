//! Store-and-forward buffer for outbound messages.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::model::message::Message;

/// Ordered, thread-safe storage for messages awaiting publication.
///
/// Each operation is individually atomic; no composite guarantees are made
/// across calls. The default implementation is volatile — implementations
/// backed by durable storage must keep the same ordering semantics.
pub trait OutboundMessageQueue: Send + Sync {
    /// Stores a message at the back of the queue. Returns `false` when the
    /// backend refused it.
    fn put(&self, message: Message) -> bool;

    /// Pops the oldest message, if any.
    fn get(&self) -> Option<Message>;

    /// Removes the first message equal to `message`. Returns whether one was
    /// removed.
    fn remove(&self, message: &Message) -> bool;

    /// Messages whose topic contains `device_key`, oldest first. Does not
    /// remove them from storage.
    fn messages_for_device(&self, device_key: &str) -> Vec<Message>;

    fn size(&self) -> usize;
}

impl<Q: OutboundMessageQueue + ?Sized> OutboundMessageQueue for Arc<Q> {
    fn put(&self, message: Message) -> bool {
        (**self).put(message)
    }

    fn get(&self) -> Option<Message> {
        (**self).get()
    }

    fn remove(&self, message: &Message) -> bool {
        (**self).remove(message)
    }

    fn messages_for_device(&self, device_key: &str) -> Vec<Message> {
        (**self).messages_for_device(device_key)
    }

    fn size(&self) -> usize {
        (**self).size()
    }
}

/// In-memory queue used when no custom persistence is supplied.
#[derive(Debug, Default)]
pub struct OutboundMessageDeque {
    queue: Mutex<VecDeque<Message>>,
}

impl OutboundMessageDeque {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutboundMessageQueue for OutboundMessageDeque {
    fn put(&self, message: Message) -> bool {
        self.queue.lock().push_back(message);
        true
    }

    fn get(&self) -> Option<Message> {
        self.queue.lock().pop_front()
    }

    fn remove(&self, message: &Message) -> bool {
        let mut queue = self.queue.lock();
        match queue.iter().position(|stored| stored == message) {
            Some(index) => {
                queue.remove(index);
                true
            }
            None => false,
        }
    }

    fn messages_for_device(&self, device_key: &str) -> Vec<Message> {
        self.queue
            .lock()
            .iter()
            .filter(|message| message.topic.contains(device_key))
            .cloned()
            .collect()
    }

    fn size(&self) -> usize {
        self.queue.lock().len()
    }
}
