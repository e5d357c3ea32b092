//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the script gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// IP allow-list.
    pub access: AccessConfig,

    /// API key authentication.
    pub auth: AuthConfig,

    /// Script directory and execution settings.
    pub scripts: ScriptsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    /// Must exceed `scripts.run_timeout_secs`.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 330 }
    }
}

/// Token bucket parameters for one endpoint class.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct BucketConfig {
    /// Maximum tokens a client can hold (burst size).
    pub capacity: u32,

    /// Tokens refilled per second.
    pub refill_per_second: f64,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Bucket for the script execution endpoint.
    pub execution: BucketConfig,

    /// Bucket for every other endpoint.
    pub standard: BucketConfig,

    /// How often idle buckets are swept, in seconds (0 = never).
    pub eviction_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            execution: BucketConfig {
                capacity: 10,
                refill_per_second: 5.0,
            },
            standard: BucketConfig {
                capacity: 50,
                refill_per_second: 10.0,
            },
            eviction_interval_secs: 60,
        }
    }
}

/// IP allow-list configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Single addresses ("10.0.0.5") or CIDR ranges ("10.100.0.0/16").
    pub allowed_ips: Vec<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            allowed_ips: vec!["127.0.0.1".to_string(), "::1".to_string()],
        }
    }
}

/// API key authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Request header carrying the key.
    pub header_name: String,

    /// Accepted keys, matched verbatim.
    pub api_keys: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            header_name: "X-API-Key".to_string(),
            api_keys: Vec::new(),
        }
    }
}

/// Script discovery and execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Directory holding the executable targets.
    pub directory: String,

    /// File extension (without dot) listed by the registry. Empty lists every file.
    pub extension: String,

    /// Program used to launch a target. Empty executes the file directly.
    pub interpreter: String,

    /// Flag passed to a target to obtain its help text.
    pub help_flag: String,

    /// Help text extraction timeout in seconds.
    pub help_timeout_secs: u64,

    /// Dispatch timeout in seconds.
    pub run_timeout_secs: u64,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            directory: "scripts".to_string(),
            extension: "py".to_string(),
            interpreter: "python3".to_string(),
            help_flag: "--help".to_string(),
            help_timeout_secs: 5,
            run_timeout_secs: 300,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [auth]
            api_keys = ["k1"]
            "#,
        )
        .unwrap();

        assert_eq!(config.auth.header_name, "X-API-Key");
        assert_eq!(config.rate_limit.execution.capacity, 10);
        assert_eq!(config.rate_limit.standard.refill_per_second, 10.0);
        assert_eq!(config.scripts.run_timeout_secs, 300);
        assert_eq!(config.access.allowed_ips, vec!["127.0.0.1", "::1"]);
    }

    #[test]
    fn test_full_toml() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "10.223.106.19:8000"

            [rate_limit.execution]
            capacity = 3
            refill_per_second = 0.5

            [access]
            allowed_ips = ["10.100.0.0/16", "10.100.3.0/24"]

            [scripts]
            directory = "/srv/scripts"
            interpreter = ""
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "10.223.106.19:8000");
        assert_eq!(config.rate_limit.execution.capacity, 3);
        assert_eq!(config.rate_limit.standard.capacity, 50);
        assert_eq!(config.access.allowed_ips.len(), 2);
        assert!(config.scripts.interpreter.is_empty());
        assert_eq!(config.scripts.extension, "py");
    }
}
