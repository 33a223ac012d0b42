use crate::device::DeviceTemplate;
use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Port the bridge listens on when nothing else is configured.
pub const DEFAULT_TCP_PORT: u16 = 4200;

/// Host the bridge binds when nothing else is configured.
pub const DEFAULT_TCP_HOST: &str = "127.0.0.1";

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default location of Linux i2c-dev character devices.
pub const DEFAULT_DEVICE_TEMPLATE: &str = "/dev/i2c-{bus}";

/// Tag placed at the head of every reply.
pub const DEFAULT_REPLY_TAG: &str = "i2cbridge";

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the daemon.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Computes the default listen endpoint.
pub fn default_socket_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp(DEFAULT_TCP_HOST, DEFAULT_TCP_PORT)
}

/// Default device template pointing at `/dev/i2c-N`.
pub fn default_device_template() -> DeviceTemplate {
    DeviceTemplate::default()
}

/// Owned default reply tag.
pub fn default_reply_tag() -> String {
    DEFAULT_REPLY_TAG.to_owned()
}
