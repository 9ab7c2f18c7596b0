//! The `utils` module provides shared definitions used across `chatcore`:
//! error types and logging setup.

pub mod error;
pub mod logging;

#[cfg(test)]
mod tests {
    use super::error::{BrokerError, UserError};
    use super::logging;

    #[test]
    fn logging_init_accepts_levels() {
        // Should not panic
        logging::init("info");
        logging::init("debug");
        logging::init("warn");
    }

    #[test]
    fn parse_level_falls_back_to_info() {
        assert_eq!(logging::parse_level("WARNING"), tracing::Level::WARN);
        assert_eq!(logging::parse_level("trace"), tracing::Level::TRACE);
        assert_eq!(logging::parse_level("verbose"), tracing::Level::INFO);
    }

    #[test]
    fn error_messages() {
        assert_eq!(BrokerError::Closed.to_string(), "broker is closed");
        assert_eq!(
            BrokerError::AlreadyRegistered("alice".to_string()).to_string(),
            "user `alice` is already registered"
        );
        assert_eq!(UserError::InvalidEmail.to_string(), "invalid email");
    }
}
