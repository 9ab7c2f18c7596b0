//! # chatcore
//!
//! `chatcore` is an in-process chat message broker built on tokio. Producers
//! hand messages to a [`Broker`](broker::Broker); a single dispatch task
//! routes each one to a single registered user or fans it out to all of
//! them, until a shared cancellation token shuts the broker down.
//!
//! ## Core Modules
//!
//! - `broker`: messages, delivery queues, the user registry and the dispatch engine.
//! - `user`: validation of user records before they connect to the broker.
//! - `config`: loading broker and logging settings from file and environment.
//! - `utils`: error types and logging setup.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chatcore::broker::{Broker, Message, delivery_queue};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), chatcore::utils::error::BrokerError> {
//! let cancel = CancellationToken::new();
//! let broker = Arc::new(Broker::new(cancel.clone()));
//! tokio::spawn({
//!     let broker = broker.clone();
//!     async move { broker.run().await }
//! });
//!
//! let (queue, mut inbox) = delivery_queue(16);
//! broker.register_user("bob", queue).await?;
//! broker.send_message(Message::direct("sys", "bob", "hi")).await?;
//! let received = inbox.recv().await;
//!
//! cancel.cancel();
//! broker.closed().await;
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod config;
pub mod user;
pub mod utils;

#[cfg(test)]
mod tests;
