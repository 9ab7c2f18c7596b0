mod settings;

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};

use crate::broker::engine::BrokerConfig;
use crate::broker::queue::DeliveryPolicy;
use settings::PartialSettings;

pub use settings::{BrokerSettings, DeliveryMode, LoggingSettings, Settings};

const DEFAULT_CONFIG_FILE: &str = "config/default";
const ENV_PREFIX: &str = "CHATCORE";

/// Loads the configuration from `config/default` (any supported format,
/// optional) and `CHATCORE__SECTION__KEY` environment variables, merged
/// over the defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(DEFAULT_CONFIG_FILE)
}

/// Same as [`load_config`] with an explicit file stem.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(merge(partial, Settings::default()))
}

fn merge(partial: PartialSettings, default: Settings) -> Settings {
    let broker = partial.broker;
    let logging = partial.logging;

    Settings {
        broker: BrokerSettings {
            input_capacity: broker
                .as_ref()
                .and_then(|b| b.input_capacity)
                .unwrap_or(default.broker.input_capacity),
            delivery_capacity: broker
                .as_ref()
                .and_then(|b| b.delivery_capacity)
                .unwrap_or(default.broker.delivery_capacity),
            delivery_policy: broker
                .as_ref()
                .and_then(|b| b.delivery_policy)
                .unwrap_or(default.broker.delivery_policy),
            delivery_timeout_ms: broker
                .as_ref()
                .and_then(|b| b.delivery_timeout_ms)
                .unwrap_or(default.broker.delivery_timeout_ms),
            reregister: broker
                .as_ref()
                .and_then(|b| b.reregister)
                .unwrap_or(default.broker.reregister),
            shutdown: broker
                .as_ref()
                .and_then(|b| b.shutdown)
                .unwrap_or(default.broker.shutdown),
        },
        logging: LoggingSettings {
            level: logging
                .and_then(|l| l.level)
                .unwrap_or(default.logging.level),
        },
    }
}

impl BrokerSettings {
    pub fn delivery_policy(&self) -> DeliveryPolicy {
        match self.delivery_policy {
            DeliveryMode::Block => DeliveryPolicy::Block,
            DeliveryMode::Timeout => {
                DeliveryPolicy::Timeout(Duration::from_millis(self.delivery_timeout_ms))
            }
            DeliveryMode::DropNewest => DeliveryPolicy::DropNewest,
        }
    }

    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            input_capacity: self.input_capacity,
            delivery: self.delivery_policy(),
            reregister: self.reregister,
            shutdown: self.shutdown,
        }
    }
}

#[cfg(test)]
mod tests;
