use serde::Deserialize;

use crate::broker::engine::{DEFAULT_INPUT_CAPACITY, ShutdownPolicy};
use crate::broker::registry::ReregisterPolicy;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub logging: LoggingSettings,
}

/// Which `DeliveryPolicy` to build. `timeout` also reads
/// `delivery_timeout_ms`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Block,
    Timeout,
    DropNewest,
}

/// Configuration settings for the broker.
///
/// Queue sizes plus the full-queue, re-registration and shutdown policies.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    pub input_capacity: usize,
    pub delivery_capacity: usize,
    pub delivery_policy: DeliveryMode,
    pub delivery_timeout_ms: u64,
    pub reregister: ReregisterPolicy,
    pub shutdown: ShutdownPolicy,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub input_capacity: Option<usize>,
    pub delivery_capacity: Option<usize>,
    pub delivery_policy: Option<DeliveryMode>,
    pub delivery_timeout_ms: Option<u64>,
    pub reregister: Option<ReregisterPolicy>,
    pub shutdown: Option<ShutdownPolicy>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

/// Provides default values for `Settings`.
///
/// The broker defaults reproduce the plain blocking router: unlimited
/// waits on full queues, re-registration ignored, pending input discarded.
impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings {
                input_capacity: DEFAULT_INPUT_CAPACITY,
                delivery_capacity: 100,
                delivery_policy: DeliveryMode::Block,
                delivery_timeout_ms: 250,
                reregister: ReregisterPolicy::Ignore,
                shutdown: ShutdownPolicy::Discard,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}
