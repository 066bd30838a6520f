use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};

/// A FIFO mailbox for messages of type `T`.
///
/// Cloning a [`Mailbox`] clones the sending half only; every clone posts into
/// the same underlying queue, which is how an actor's handle is shared
/// between every node that holds an outbound edge to it.
///
/// # Examples
/// ```
/// use cortexevo_rt::Mailbox;
///
/// let (mailbox, inbox) = Mailbox::<u32>::new();
/// mailbox.post(7);
/// assert_eq!(inbox.recv().unwrap(), 7);
/// ```
#[derive(Clone)]
pub struct Mailbox<T> {
    tx: Sender<T>,
}

impl<T> Mailbox<T> {
    /// Creates a new unbounded mailbox, returning the sending handle and the
    /// receiving end an actor loop drains.
    pub fn new() -> (Self, Receiver<T>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    /// Posts a message into the mailbox.
    ///
    /// Silently drops the message if the owning actor has already
    /// terminated; callers that care about that case use [`ActorHandle::join`]
    /// to observe when an actor thread has exited.
    pub fn post(&self, message: T) {
        let _ = self.tx.send(message);
    }
}

/// A running actor thread paired with the [`Mailbox`] used to reach it.
pub struct ActorHandle<T> {
    mailbox: Mailbox<T>,
    thread: Option<JoinHandle<()>>,
}

impl<T> ActorHandle<T> {
    /// Returns a cloned handle to the actor's mailbox.
    pub fn mailbox(&self) -> Mailbox<T> {
        self.mailbox.clone()
    }

    /// Posts a message directly through the handle.
    pub fn post(&self, message: T) {
        self.mailbox.post(message);
    }

    /// Blocks until the actor's thread has exited, e.g. after it has
    /// processed a kill message and broken out of its receive loop.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Spawns an actor: an OS thread that repeatedly blocks on `rx.recv()` and
/// hands each message to `handler`, until the mailbox's sender side is
/// dropped or `handler` asks to stop by returning `false`.
///
/// This is the single-threaded-actor-per-node model described by the
/// substrate: message handling inside one actor is always strictly
/// sequential because only this one thread ever calls `handler`.
pub fn spawn_actor<T, F>(mut handler: F) -> ActorHandle<T>
where
    T: Send + 'static,
    F: FnMut(T) -> bool + Send + 'static,
{
    let (mailbox, rx) = Mailbox::new();
    let thread = std::thread::spawn(move || run_loop(&rx, &mut handler));
    ActorHandle {
        mailbox,
        thread: Some(thread),
    }
}

fn run_loop<T, F>(rx: &Receiver<T>, handler: &mut F)
where
    F: FnMut(T) -> bool,
{
    while let Ok(message) = rx.recv() {
        if !handler(message) {
            break;
        }
    }
}
