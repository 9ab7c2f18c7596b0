pub mod engine;
pub mod message;
pub mod queue;
pub mod registry;

pub use engine::{Broker, BrokerConfig, BrokerState, BrokerStats, ShutdownPolicy};
pub use message::Message;
pub use queue::{DeliveryPolicy, DeliveryQueue, Inbox, Push, delivery_queue};
pub use registry::{Registration, ReregisterPolicy, UserId};
