use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

/// A one-shot reply channel attached to a request message.
///
/// Request/reply messages (`IncrementBarrierThreshold`, `GetScore`,
/// `KillCortex`, ...) carry a `Reply<T>` so the actor answering the request
/// can hand a single value back to whoever is waiting, without the caller
/// needing its own mailbox.
///
/// # Examples
/// ```
/// use cortexevo_rt::Reply;
/// use std::time::Duration;
///
/// let (reply, waiter) = Reply::new();
/// reply.send(42);
/// assert_eq!(waiter.wait(Duration::from_millis(100)).unwrap(), 42);
/// ```
pub struct Reply<T> {
    tx: Sender<T>,
}

/// The receiving half of a [`Reply`], held by the requester.
pub struct ReplyWaiter<T> {
    rx: crossbeam_channel::Receiver<T>,
}

impl<T> Reply<T> {
    /// Creates a linked `(Reply, ReplyWaiter)` pair.
    pub fn new() -> (Self, ReplyWaiter<T>) {
        let (tx, rx) = bounded(1);
        (Self { tx }, ReplyWaiter { rx })
    }

    /// Answers the request. No-op if the waiter has already given up.
    pub fn send(self, value: T) {
        let _ = self.tx.send(value);
    }
}

impl<T> ReplyWaiter<T> {
    /// Blocks until a reply arrives, indefinitely.
    pub fn wait_forever(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Blocks until a reply arrives or `timeout` elapses, returning `None`
    /// on either a timeout or a disconnected sender (the replying actor
    /// died before answering).
    pub fn wait(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Some(value),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_value() {
        let (reply, waiter) = Reply::new();
        reply.send("hi");
        assert_eq!(waiter.wait_forever(), Some("hi"));
    }

    #[test]
    fn times_out_when_unanswered() {
        let (_reply, waiter) = Reply::<u8>::new();
        assert_eq!(waiter.wait(Duration::from_millis(20)), None);
    }
}
