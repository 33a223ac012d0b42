//! Shared configuration for the I2C bridge daemon.
//!
//! Values are layered by [`ortho_config`]: built-in defaults, then an optional
//! TOML file (`--config-path` or `I2CBRIDGE_CONFIG_PATH`), then
//! `I2CBRIDGE_*` environment variables, then command-line flags.

mod defaults;
mod device;
mod logging;
mod socket;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_DEVICE_TEMPLATE, DEFAULT_LOG_FILTER, DEFAULT_REPLY_TAG, DEFAULT_TCP_HOST,
    DEFAULT_TCP_PORT, default_device_template, default_log_filter_string,
    default_log_format, default_reply_tag, default_socket_endpoint,
};
pub use device::{BUS_PLACEHOLDER, DeviceTemplate, DeviceTemplateError};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "I2CBRIDGE")]
pub struct Config {
    /// Endpoint the single peer connects to.
    #[ortho_config(default = default_socket_endpoint())]
    #[serde(default = "default_socket_endpoint")]
    pub listen_socket: SocketEndpoint,
    /// Tracing filter expression.
    #[ortho_config(default = default_log_filter_string())]
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Log rendering.
    #[ortho_config(default = default_log_format())]
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Template mapping bus identifiers to device nodes.
    #[ortho_config(default = default_device_template())]
    #[serde(default = "default_device_template")]
    pub device_template: DeviceTemplate,
    /// Tag placed at the head of every reply.
    #[ortho_config(default = default_reply_tag())]
    #[serde(default = "default_reply_tag")]
    pub reply_tag: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            device_template: default_device_template(),
            reply_tag: default_reply_tag(),
        }
    }
}

impl Config {
    /// Endpoint the daemon listens on.
    #[must_use]
    pub fn listen_socket(&self) -> &SocketEndpoint {
        &self.listen_socket
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log rendering.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Template mapping bus identifiers to device nodes.
    #[must_use]
    pub fn device_template(&self) -> &DeviceTemplate {
        &self.device_template
    }

    /// Tag placed at the head of every reply.
    #[must_use]
    pub fn reply_tag(&self) -> &str {
        self.reply_tag.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_node() {
        let config = Config::default();
        assert_eq!(config.listen_socket(), &SocketEndpoint::tcp("127.0.0.1", 4200));
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.device_template().expand(3), "/dev/i2c-3");
        assert_eq!(config.reply_tag(), "i2cbridge");
    }
}
