//! Message definitions for the broker
//!
//! `Message` is the value routed between registered users. It is immutable
//! once handed to the broker; every recipient gets its own clone.
//!
//! Notes on fields:
//! - `sender`: id of the producing user; never used for routing
//! - `recipient`: target id for unicast; ignored when `broadcast` is set
//! - `content`: the chat text
//! - `broadcast`: fan out to every registered user
//! - `timestamp`: milliseconds since UNIX epoch; `0` means unset and the
//!   broker stamps it on enqueue

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub recipient: String,
    pub content: String,
    pub broadcast: bool,
    pub timestamp: i64,
}

impl Message {
    /// A unicast message addressed to `recipient`.
    pub fn direct(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            content: content.into(),
            broadcast: false,
            timestamp: 0,
        }
    }

    /// A message for every registered user. The recipient is left empty.
    pub fn broadcast(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            recipient: String::new(),
            content: content.into(),
            broadcast: true,
            timestamp: 0,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub(crate) fn stamp_if_unset(&mut self) {
        if self.timestamp == 0 {
            self.timestamp = chrono::Utc::now().timestamp_millis();
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
