//! User registry
//!
//! Maps a user id to that user's [`DeliveryQueue`]. The map sits behind a
//! `tokio::sync::RwLock`: dispatch-time lookups and broadcast fan-out take
//! the shared lock, `register`/`unregister` take the exclusive one, so a
//! reader never sees a half-applied change.
//!
//! Dispatch only holds the shared lock long enough to clone the entries it
//! needs; pushes run after it is released. Each entry carries a close token
//! that `unregister` (and a `Replace` re-registration) cancels, which aborts
//! any push still waiting on that entry. The queue closes once the last
//! clone of the entry is dropped.
//!
//! At most one entry exists per id. What a second registration under a
//! present id does is decided by [`ReregisterPolicy`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::broker::message::Message;
use crate::broker::queue::{DeliveryPolicy, DeliveryQueue, Push};
use crate::utils::error::BrokerError;

pub type UserId = String;

/// Handling of `register` for an id that is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReregisterPolicy {
    /// Keep the existing queue, drop the new one.
    #[default]
    Ignore,
    /// Swap in the new queue; the old one is closed.
    Replace,
    /// Fail with `BrokerError::AlreadyRegistered`.
    Reject,
}

/// Result of a successful `register`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    /// Id was present; the existing queue was kept and the new one dropped.
    Retained,
    /// Id was present; the old queue was closed and replaced.
    Replaced,
}

/// A registered queue plus the token that marks it unregistered.
#[derive(Debug)]
pub(crate) struct Entry {
    queue: DeliveryQueue,
    closed: CancellationToken,
}

impl Entry {
    fn new(queue: DeliveryQueue) -> Arc<Self> {
        Arc::new(Self {
            queue,
            closed: CancellationToken::new(),
        })
    }

    /// Push unless the entry gets unregistered first.
    pub(crate) async fn push(&self, msg: Message, policy: DeliveryPolicy) -> Push {
        tokio::select! {
            biased;
            () = self.closed.cancelled() => Push::Unregistered,
            outcome = self.queue.push(msg, policy) => outcome,
        }
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    users: RwLock<HashMap<UserId, Arc<Entry>>>,
    policy: ReregisterPolicy,
}

impl Registry {
    pub fn new(policy: ReregisterPolicy) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            policy,
        }
    }

    pub async fn register(
        &self,
        id: UserId,
        queue: DeliveryQueue,
    ) -> Result<Registration, BrokerError> {
        let mut users = self.users.write().await;

        if !users.contains_key(&id) {
            users.insert(id, Entry::new(queue));
            return Ok(Registration::Added);
        }

        match self.policy {
            ReregisterPolicy::Ignore => Ok(Registration::Retained),
            ReregisterPolicy::Replace => {
                if let Some(old) = users.insert(id, Entry::new(queue)) {
                    old.closed.cancel();
                }
                Ok(Registration::Replaced)
            }
            ReregisterPolicy::Reject => Err(BrokerError::AlreadyRegistered(id)),
        }
    }

    /// Remove `id` and close its queue. Returns false for unknown ids.
    ///
    /// A push in flight for `id` is abandoned; the queue closes as soon as
    /// that push lets go of the entry.
    pub async fn unregister(&self, id: &str) -> bool {
        let removed = self.users.write().await.remove(id);
        match removed {
            Some(entry) => {
                entry.closed.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.users.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Registered ids, sorted.
    pub async fn ids(&self) -> Vec<UserId> {
        let mut ids: Vec<_> = self.users.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub(crate) async fn lookup(&self, id: &str) -> Option<Arc<Entry>> {
        self.users.read().await.get(id).cloned()
    }

    /// Every entry registered right now.
    pub(crate) async fn snapshot(&self) -> Vec<(UserId, Arc<Entry>)> {
        self.users
            .read()
            .await
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect()
    }
}
