//! Per-user delivery queues
//!
//! A delivery queue is a bounded FIFO split in two halves. The caller keeps
//! the [`Inbox`] and hands the [`DeliveryQueue`] to the broker on
//! registration. `DeliveryQueue` is not `Clone`, so the registry holds the
//! only sending half: once unregistration lets go of it the queue closes and
//! the inbox reports end-of-stream after draining what was already buffered.
//!
//! What happens when a queue is full is decided by [`DeliveryPolicy`]. The
//! push runs on the broker's single dispatch task, so a waiting push delays
//! delivery to every other user as well. It does not hold up registration.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TryRecvError, TrySendError};

use crate::broker::message::Message;

/// Full-queue behaviour for pushes into delivery queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// Wait until the consumer makes room. Stalls the dispatch loop.
    #[default]
    Block,
    /// Wait at most this long, then drop the message.
    Timeout(Duration),
    /// Drop the incoming message right away.
    DropNewest,
}

/// Outcome of a single push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    Delivered,
    /// Dropped by the policy because the queue stayed full.
    Dropped,
    /// The inbox was dropped by its consumer.
    Disconnected,
    /// The user was unregistered while the push was waiting.
    Unregistered,
}

/// Create a bounded delivery queue.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn delivery_queue(capacity: usize) -> (DeliveryQueue, Inbox) {
    let (tx, rx) = mpsc::channel(capacity);
    (DeliveryQueue { tx }, Inbox { rx })
}

/// Sending half, owned by the registry once registered.
#[derive(Debug)]
pub struct DeliveryQueue {
    tx: mpsc::Sender<Message>,
}

impl DeliveryQueue {
    pub async fn push(&self, msg: Message, policy: DeliveryPolicy) -> Push {
        match policy {
            DeliveryPolicy::Block => match self.tx.send(msg).await {
                Ok(()) => Push::Delivered,
                Err(_) => Push::Disconnected,
            },
            DeliveryPolicy::Timeout(wait) => match self.tx.send_timeout(msg, wait).await {
                Ok(()) => Push::Delivered,
                Err(SendTimeoutError::Timeout(_)) => Push::Dropped,
                Err(SendTimeoutError::Closed(_)) => Push::Disconnected,
            },
            DeliveryPolicy::DropNewest => match self.tx.try_send(msg) {
                Ok(()) => Push::Delivered,
                Err(TrySendError::Full(_)) => Push::Dropped,
                Err(TrySendError::Closed(_)) => Push::Disconnected,
            },
        }
    }

    /// True once the consumer has dropped its inbox.
    pub fn is_disconnected(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, kept by the consumer.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::Receiver<Message>,
}

impl Inbox {
    /// Next message, or `None` once the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Message, TryRecvError> {
        self.rx.try_recv()
    }

    /// Number of buffered messages.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// True once the sending half is gone. Buffered messages may remain.
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }
}
