//! Broker engine
//!
//! This module contains the in-process chat broker responsible for:
//! - accepting messages through a bounded input queue
//! - routing each message to one user (unicast) or every user (broadcast)
//! - shutting down when the shared cancellation token fires
//!
//! Concurrency and usage notes:
//! - Share the broker behind an `Arc` and spawn exactly one task running
//!   [`Broker::run`]. Any number of tasks may call `send_message`,
//!   `register_user` and `unregister_user` concurrently.
//! - Routing happens on that single dispatch task. A push into a full
//!   delivery queue under `DeliveryPolicy::Block` stalls delivery for every
//!   user until the slow consumer catches up. Pick `Timeout` or `DropNewest`
//!   when consumers can't be trusted to keep up.
//! - Delivery is at-most-once and unacknowledged. Unicast to an unknown user
//!   is dropped without telling the sender.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::broker::message::Message;
use crate::broker::queue::{DeliveryPolicy, DeliveryQueue, Inbox, Push, delivery_queue};
use crate::broker::registry::{Registration, Registry, ReregisterPolicy, UserId};
use crate::user::ValidatedUser;
use crate::utils::error::BrokerError;

pub const DEFAULT_INPUT_CAPACITY: usize = 100;

/// What happens to messages still sitting in the input queue when the
/// cancellation token fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPolicy {
    /// Drop them. Counted in `BrokerStats::discarded`.
    #[default]
    Discard,
    /// Route them before closing.
    Drain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerConfig {
    pub input_capacity: usize,
    pub delivery: DeliveryPolicy,
    pub reregister: ReregisterPolicy,
    pub shutdown: ShutdownPolicy,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            input_capacity: DEFAULT_INPUT_CAPACITY,
            delivery: DeliveryPolicy::Block,
            reregister: ReregisterPolicy::Ignore,
            shutdown: ShutdownPolicy::Discard,
        }
    }
}

/// Lifecycle of a broker. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    Running,
    ShuttingDown,
    Closed,
}

/// Point-in-time copy of the broker's delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerStats {
    /// Copies pushed into delivery queues.
    pub delivered: u64,
    /// Copies dropped by the delivery policy.
    pub dropped: u64,
    /// Pushes into a queue whose inbox was gone.
    pub disconnected: u64,
    /// Pushes abandoned because the user unregistered while they waited.
    pub unregistered: u64,
    /// Unicast messages for users that weren't registered.
    pub unroutable: u64,
    /// Input discarded at shutdown.
    pub discarded: u64,
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    dropped: AtomicU64,
    disconnected: AtomicU64,
    unregistered: AtomicU64,
    unroutable: AtomicU64,
    discarded: AtomicU64,
}

#[derive(Debug)]
pub struct Broker {
    id: Uuid,
    config: BrokerConfig,
    cancel: CancellationToken,
    input: mpsc::Sender<Message>,
    // taken by the dispatch loop on start
    pending: Mutex<Option<mpsc::Receiver<Message>>>,
    registry: Registry,
    state: watch::Sender<BrokerState>,
    counters: Counters,
}

impl Broker {
    /// Broker with the default configuration, in state `Running`.
    pub fn new(cancel: CancellationToken) -> Self {
        Self::build(cancel, BrokerConfig::default())
    }

    pub fn with_config(
        cancel: CancellationToken,
        config: BrokerConfig,
    ) -> Result<Self, BrokerError> {
        if config.input_capacity == 0 {
            return Err(BrokerError::InvalidCapacity);
        }
        Ok(Self::build(cancel, config))
    }

    fn build(cancel: CancellationToken, config: BrokerConfig) -> Self {
        let (input, pending) = mpsc::channel(config.input_capacity);
        let (state, _) = watch::channel(BrokerState::Running);
        Self {
            id: Uuid::new_v4(),
            config,
            cancel,
            input,
            pending: Mutex::new(Some(pending)),
            registry: Registry::new(config.reregister),
            state,
            counters: Counters::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn state(&self) -> BrokerState {
        *self.state.borrow()
    }

    /// Resolves once the broker has reached `Closed`.
    pub async fn closed(&self) {
        let mut state = self.state.subscribe();
        let _ = state.wait_for(|s| *s == BrokerState::Closed).await;
    }

    /// The dispatch loop. Runs until the cancellation token fires, then
    /// shuts down per the configured `ShutdownPolicy` and returns.
    ///
    /// Only the first call does anything; later calls return immediately.
    pub async fn run(&self) {
        let taken = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut input) = taken else {
            warn!(broker = %self.id, "dispatch loop already started");
            return;
        };

        info!(broker = %self.id, "dispatch loop started");

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                next = input.recv() => match next {
                    Some(msg) => self.dispatch(msg).await,
                    None => break,
                },
            }
        }

        self.shutdown(input).await;
    }

    async fn shutdown(&self, mut input: mpsc::Receiver<Message>) {
        self.state.send_replace(BrokerState::ShuttingDown);
        // rejects every later enqueue; what's buffered stays readable
        input.close();

        match self.config.shutdown {
            ShutdownPolicy::Discard => {
                let mut discarded = 0;
                while input.try_recv().is_ok() {
                    discarded += 1;
                }
                if discarded > 0 {
                    self.counters
                        .discarded
                        .fetch_add(discarded, Ordering::Relaxed);
                    warn!(
                        broker = %self.id,
                        discarded,
                        "pending messages discarded on shutdown"
                    );
                }
            }
            ShutdownPolicy::Drain => {
                while let Some(msg) = input.recv().await {
                    self.dispatch(msg).await;
                }
            }
        }

        self.state.send_replace(BrokerState::Closed);
        info!(broker = %self.id, "broker closed");
    }

    async fn dispatch(&self, msg: Message) {
        if msg.broadcast {
            let users = self.registry.snapshot().await;
            debug!(
                broker = %self.id,
                sender = %msg.sender,
                recipients = users.len(),
                "broadcasting message"
            );
            for (id, entry) in users {
                let outcome = entry.push(msg.clone(), self.config.delivery).await;
                self.record(&id, outcome);
            }
            return;
        }

        match self.registry.lookup(&msg.recipient).await {
            Some(entry) => {
                let recipient = msg.recipient.clone();
                let outcome = entry.push(msg, self.config.delivery).await;
                self.record(&recipient, outcome);
            }
            None => {
                self.counters.unroutable.fetch_add(1, Ordering::Relaxed);
                debug!(
                    broker = %self.id,
                    sender = %msg.sender,
                    recipient = %msg.recipient,
                    "recipient not registered, message dropped"
                );
            }
        }
    }

    fn record(&self, user: &str, outcome: Push) {
        match outcome {
            Push::Delivered => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Push::Dropped => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(broker = %self.id, user, "delivery queue full, message dropped");
            }
            Push::Disconnected => {
                self.counters.disconnected.fetch_add(1, Ordering::Relaxed);
                debug!(broker = %self.id, user, "inbox gone, message dropped");
            }
            Push::Unregistered => {
                self.counters.unregistered.fetch_add(1, Ordering::Relaxed);
                debug!(broker = %self.id, user, "user unregistered mid-delivery, message dropped");
            }
        }
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.cancel.is_cancelled() || self.state() != BrokerState::Running {
            return Err(BrokerError::Closed);
        }
        Ok(())
    }

    /// Enqueue a message for dispatch, waiting for room in the input queue.
    ///
    /// Returns once the message is accepted; delivery happens later on the
    /// dispatch task. Fails with `BrokerError::Closed` once the cancellation
    /// token has fired, including while waiting for room.
    pub async fn send_message(&self, mut msg: Message) -> Result<(), BrokerError> {
        self.ensure_open()?;
        msg.stamp_if_unset();

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(BrokerError::Closed),
            sent = self.input.send(msg) => sent.map_err(|_| BrokerError::Closed),
        }
    }

    /// Like `send_message` but fails with `BrokerError::InputFull` instead
    /// of waiting.
    pub fn try_send_message(&self, mut msg: Message) -> Result<(), BrokerError> {
        self.ensure_open()?;
        msg.stamp_if_unset();

        self.input.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => BrokerError::InputFull,
            mpsc::error::TrySendError::Closed(_) => BrokerError::Closed,
        })
    }

    /// Register `queue` as the delivery queue for `id`.
    ///
    /// A new id is always added. For an id that is already present the
    /// configured `ReregisterPolicy` applies; the default keeps the
    /// existing queue and drops `queue`.
    pub async fn register_user(
        &self,
        id: impl Into<UserId>,
        queue: DeliveryQueue,
    ) -> Result<Registration, BrokerError> {
        let id = id.into();
        let registration = self.registry.register(id.clone(), queue).await;

        match &registration {
            Ok(Registration::Added) => info!(broker = %self.id, user = %id, "user registered"),
            Ok(Registration::Retained) => {
                debug!(broker = %self.id, user = %id, "user already registered, keeping queue");
            }
            Ok(Registration::Replaced) => {
                info!(broker = %self.id, user = %id, "user re-registered, queue replaced");
            }
            Err(e) => warn!(broker = %self.id, user = %id, "registration rejected: {e}"),
        }

        registration
    }

    /// Remove `id` and close its delivery queue. No-op for unknown ids.
    pub async fn unregister_user(&self, id: &str) -> bool {
        let removed = self.registry.unregister(id).await;
        if removed {
            info!(broker = %self.id, user = id, "user unregistered");
        }
        removed
    }

    /// Create a delivery queue for a validated user and register it.
    ///
    /// Unlike `register_user`, an id that is already present is an error
    /// under every policy except `Replace`, since the returned inbox would
    /// otherwise be closed from the start.
    pub async fn connect(
        &self,
        user: &ValidatedUser,
        capacity: usize,
    ) -> Result<Inbox, BrokerError> {
        if capacity == 0 {
            return Err(BrokerError::InvalidCapacity);
        }

        let (queue, inbox) = delivery_queue(capacity);
        match self.register_user(user.id(), queue).await? {
            Registration::Added | Registration::Replaced => Ok(inbox),
            Registration::Retained => {
                Err(BrokerError::AlreadyRegistered(user.id().to_string()))
            }
        }
    }

    pub async fn is_registered(&self, id: &str) -> bool {
        self.registry.contains(id).await
    }

    pub async fn user_count(&self) -> usize {
        self.registry.len().await
    }

    /// Registered ids, sorted.
    pub async fn registered_users(&self) -> Vec<UserId> {
        self.registry.ids().await
    }

    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            disconnected: self.counters.disconnected.load(Ordering::Relaxed),
            unregistered: self.counters.unregistered.load(Ordering::Relaxed),
            unroutable: self.counters.unroutable.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
        }
    }
}
