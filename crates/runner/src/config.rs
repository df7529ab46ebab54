//! Runner configuration loaded from environment variables.

/// Runner configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `ORCHESTRATOR_CHANNEL` — channel the participants emit to (default: `"orchestrator"`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub orchestrator_channel: String,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            orchestrator_channel: std::env::var("ORCHESTRATOR_CHANNEL")
                .unwrap_or_else(|_| "orchestrator".to_string()),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            orchestrator_channel: "orchestrator".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.orchestrator_channel, "orchestrator");
        assert_eq!(config.log_level, "info");
    }
}
