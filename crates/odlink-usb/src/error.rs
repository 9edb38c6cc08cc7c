//! Session error taxonomy

use odlink_core::{EndpointId, ValueError};
use thiserror::Error;

use crate::codec::CodecError;
use crate::transport::TransportError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The session is disconnected or has no schema loaded
    #[error("Device is not connected")]
    NotConnected,
    #[error("Endpoint '{0}' was not found in the cache")]
    EndpointNotFound(String),
    #[error("Timeout reading endpoint {endpoint} as {type_name} (crc=0x{checksum:04X})")]
    Timeout {
        endpoint: EndpointId,
        type_name: &'static str,
        checksum: u16,
    },
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),
    #[error("Schema could not be parsed")]
    SchemaParse,
    #[error("Cannot claim USB interface {interface}")]
    ClaimFailed {
        interface: u8,
        #[source]
        source: TransportError,
    },
    #[error("Cannot {operation} endpoint '{identifier}' ({kind})")]
    Unsupported {
        operation: &'static str,
        identifier: String,
        kind: String,
    },
    #[error("Invalid value for '{identifier}': {source}")]
    InvalidValue {
        identifier: String,
        #[source]
        source: ValueError,
    },
    #[error("Frame error: {0}")]
    Codec(#[from] CodecError),
}
