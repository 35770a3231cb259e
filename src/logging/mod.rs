pub mod subscriber;

pub use subscriber::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;

    #[test]
    fn test_unsupported_format_rejected() {
        let config = LoggingConfig {
            level: "info".to_string(),
            format: "xml".to_string(),
        };
        let err = setup_tracing(&config).unwrap_err();
        assert!(err.to_string().contains("Unsupported log format"));
    }

    #[test]
    fn test_level_directive_parsed() {
        let config = LoggingConfig {
            level: "pdp_bench=debug,warn".to_string(),
            format: "json".to_string(),
        };
        assert!(subscriber::env_filter(&config).is_ok());
    }
}
