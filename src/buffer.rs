use std::collections::VecDeque;

use parking_lot::Mutex;
use rusoto_logs::InputLogEvent;

/// FIFO queue of events awaiting upload.
///
/// Appends arrive from any thread; the flush task drains ordered batches. The
/// mutex is held only for the queue operation itself, so neither side blocks
/// on the other for longer than a push or a drain.
pub struct EventBuffer {
    events: Mutex<VecDeque<InputLogEvent>>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
        }
    }

    pub fn append(&self, event: InputLogEvent) {
        self.events.lock().push_back(event);
    }

    /// Removes and returns up to `max_size` oldest events in append order.
    pub fn take_batch(&self, max_size: usize) -> Vec<InputLogEvent> {
        let mut events = self.events.lock();
        let count = max_size.min(events.len());
        events.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns current unix timestamp in milliseconds
pub(crate) fn timestamp() -> i64 {
    use std::convert::TryFrom;
    use std::time::SystemTime;
    match SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => i64::try_from(duration.as_millis()).unwrap(),
        Err(err) => -i64::try_from(err.duration().as_millis()).unwrap(),
    }
}
