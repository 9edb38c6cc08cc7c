//! Bulk transport abstraction
//!
//! The session never touches USB directly. Anything that can claim an
//! interface and move bytes over a bulk endpoint pair can back it.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Cannot claim USB interface {interface}: {reason}")]
    Claim { interface: u8, reason: String },
    #[error("Bulk transfer failed: {0}")]
    Transfer(String),
    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
    #[error("Transport is closed")]
    Closed,
}

/// Raw bulk I/O keyed by endpoint address
pub trait Transport: Send {
    fn claim_interface(&mut self, interface: u8) -> Result<(), TransportError>;

    /// Write one frame, returning the number of bytes accepted
    fn bulk_write(&mut self, data: &[u8], endpoint: u8) -> Result<usize, TransportError>;

    /// Read at most `max_len` bytes. An empty buffer means nothing arrived
    /// within the transport's own poll interval; an error is a failure of
    /// the link itself.
    fn bulk_read(&mut self, max_len: usize, endpoint: u8) -> Result<Vec<u8>, TransportError>;

    /// Release the device. Called at most once per session.
    fn close(&mut self);
}
