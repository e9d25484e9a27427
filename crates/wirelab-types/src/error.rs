//! Parse and validation errors for wirelab value types.

use thiserror::Error;

/// Errors produced while parsing or validating topology values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// MAC address string could not be parsed.
    #[error("invalid MAC address: {0}")]
    InvalidMacAddress(String),

    /// Interface name exceeds the kernel's 15-character limit.
    #[error("interface '{0}' name exceeds maximum length of 15 characters")]
    IfaceNameTooLong(String),

    /// Interface name is empty.
    #[error("interface name must not be empty")]
    IfaceNameEmpty,

    /// `eth0` is reserved for the runtime-assigned management interface.
    #[error("eth0 interface can't be used in the endpoint definition as it is assigned by the runtime: '{0}'")]
    IfaceNameReserved(String),

    /// Stage name is not one of the known deployment stages.
    #[error("unknown deployment stage '{0}', expected one of: create, create-links, configure, healthy, exit")]
    UnknownStage(String),

    /// Endpoint string is not of the `node:iface` form.
    #[error("malformed endpoint definition: '{0}', expected 'node:iface'")]
    MalformedEndpoint(String),
}
