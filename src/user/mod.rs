//! The `user` module is the validation boundary in front of the broker.
//!
//! Callers turn a raw [`User`] record into a [`ValidatedUser`] before
//! connecting it to the broker. The broker itself never inspects names or
//! emails.

pub mod identity;
pub use identity::{User, ValidatedUser};

#[cfg(test)]
mod tests;
