//! The `error` module defines the error types used within `chatcore`.
//!
//! Broker operations report [`BrokerError`]; the user validation
//! collaborator reports [`UserError`]. Configuration loading keeps the
//! `config` crate's own `ConfigError`.

use thiserror::Error;

use crate::broker::registry::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The cancellation signal has fired or the broker has reached `Closed`.
    #[error("broker is closed")]
    Closed,

    #[error("broker input queue is full")]
    InputFull,

    /// Only returned under `ReregisterPolicy::Reject`.
    #[error("user `{0}` is already registered")]
    AlreadyRegistered(UserId),

    #[error("queue capacity must be greater than zero")]
    InvalidCapacity,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("invalid name")]
    InvalidName,

    #[error("invalid email")]
    InvalidEmail,

    #[error("invalid id")]
    InvalidId,
}
