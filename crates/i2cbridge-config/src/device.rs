//! Mapping from bus identifiers to device nodes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder substituted with the decimal bus identifier.
pub const BUS_PLACEHOLDER: &str = "{bus}";

/// Template describing where the device node for a bus lives, such as
/// `/dev/i2c-{bus}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceTemplate(String);

impl DeviceTemplate {
    /// Returns the device path for `bus`.
    #[must_use]
    pub fn expand(&self, bus: u32) -> String {
        self.0.replace(BUS_PLACEHOLDER, &bus.to_string())
    }

    /// Returns the raw template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for DeviceTemplate {
    fn default() -> Self {
        Self(crate::defaults::DEFAULT_DEVICE_TEMPLATE.to_owned())
    }
}

impl fmt::Display for DeviceTemplate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl FromStr for DeviceTemplate {
    type Err = DeviceTemplateError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.trim().is_empty() {
            return Err(DeviceTemplateError::Empty);
        }
        if !input.contains(BUS_PLACEHOLDER) {
            return Err(DeviceTemplateError::MissingPlaceholder(input.to_owned()));
        }
        Ok(Self(input.to_owned()))
    }
}

impl TryFrom<String> for DeviceTemplate {
    type Error = DeviceTemplateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceTemplate> for String {
    fn from(template: DeviceTemplate) -> Self {
        template.0
    }
}

/// Errors raised when a device template is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceTemplateError {
    /// The template was blank.
    #[error("device template must not be empty")]
    Empty,
    /// The template cannot distinguish buses.
    #[error("device template '{0}' does not contain the {{bus}} placeholder")]
    MissingPlaceholder(String),
}
