//! Transaction engine
//!
//! One request is in flight at a time. Every request takes the next
//! sequence number; reads then poll the transport until a response with a
//! matching sequence and acceptable length shows up or the deadline passes.
//! Writes are fire-and-forget once the frame is on the wire.

use odlink_core::{EndpointId, PROTOCOL_VERSION};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::codec::{wire_len, Request, Response, RESPONSE_HEADER_LEN, SEQUENCE_MODULUS};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::transport::{Transport, TransportError};

/// Endpoint serving the schema text
pub const SCHEMA_ENDPOINT: EndpointId = 0;

/// Monotonic sequence numbers, wrapping modulo 4096
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceCounter {
    last: u16,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter whose next value follows `last`
    pub fn starting_after(last: u16) -> Self {
        Self {
            last: last % SEQUENCE_MODULUS,
        }
    }

    pub fn next(&mut self) -> u16 {
        self.last = (self.last + 1) % SEQUENCE_MODULUS;
        self.last
    }

    /// Most recently issued sequence number
    pub fn last(&self) -> u16 {
        self.last
    }
}

/// Acceptable response payload length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Expect {
    /// Typed reads: anything else is an unrelated response
    Exactly(usize),
    /// Chunked transfers: shorter (even empty) payloads are valid
    AtMost(usize),
}

impl Expect {
    fn max_len(&self) -> usize {
        match self {
            Self::Exactly(len) | Self::AtMost(len) => *len,
        }
    }

    fn accepts(&self, len: usize) -> bool {
        match self {
            Self::Exactly(expected) => len == *expected,
            Self::AtMost(max) => len <= *max,
        }
    }
}

pub(crate) struct Engine {
    transport: Option<Box<dyn Transport>>,
    config: SessionConfig,
    sequence: SequenceCounter,
    connected: bool,
}

impl Engine {
    pub(crate) fn new(transport: Box<dyn Transport>, config: SessionConfig) -> Self {
        Self {
            transport: Some(transport),
            config,
            sequence: SequenceCounter::new(),
            connected: false,
        }
    }

    pub(crate) fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected && self.transport.is_some()
    }

    pub(crate) fn transport_present(&self) -> bool {
        self.transport.is_some()
    }

    /// Mark the link usable again. Has no effect once the transport has
    /// been closed.
    pub(crate) fn mark_connected(&mut self) {
        self.connected = self.transport.is_some();
    }

    /// Drop the link and release the transport
    pub(crate) fn disconnect(&mut self) {
        self.connected = false;
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            info!("Device disconnected, transport closed");
        }
    }

    /// Read `expect` bytes from an endpoint
    pub(crate) fn read(
        &mut self,
        endpoint: EndpointId,
        expect: Expect,
        payload: &[u8],
        checksum: u16,
        type_name: &'static str,
    ) -> Result<Vec<u8>, SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }

        let request = Request::read(
            self.sequence.next(),
            endpoint,
            wire_len(expect.max_len())?,
            payload.to_vec(),
            checksum,
        )?;
        self.send(&request)?;

        let deadline = Instant::now() + self.config.timeout();
        while Instant::now() < deadline {
            match self.poll_response(expect.max_len())? {
                Some(response)
                    if response.answers(request.sequence) && expect.accepts(response.payload.len()) =>
                {
                    trace!(
                        endpoint = endpoint,
                        seq = request.sequence,
                        len = response.payload.len(),
                        "Matched response"
                    );
                    return Ok(response.payload);
                }
                Some(response) => {
                    trace!(
                        expected_seq = request.sequence,
                        seq = response.sequence,
                        len = response.payload.len(),
                        "Discarding unrelated response"
                    );
                }
                None => std::thread::yield_now(),
            }
        }

        warn!(
            endpoint = endpoint,
            type_name = type_name,
            crc = %format!("0x{:04X}", checksum),
            "Timeout: failed to read endpoint"
        );
        Err(SessionError::Timeout {
            endpoint,
            type_name,
            checksum,
        })
    }

    /// Write a payload to an endpoint without waiting for a response
    pub(crate) fn write(&mut self, endpoint: EndpointId, payload: &[u8], checksum: u16) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }

        let request = Request::write(
            self.sequence.next(),
            endpoint,
            wire_len(payload.len())?,
            payload.to_vec(),
            checksum,
        )?;
        self.send(&request)
    }

    /// Pull the complete schema text from endpoint 0, chunk by chunk. Each
    /// request carries the byte offset; an empty chunk ends the transfer.
    /// A transfer that outgrows `max_schema_bytes` fails as unparseable.
    pub(crate) fn fetch_schema(&mut self) -> Result<Vec<u8>, SessionError> {
        let chunk_size = usize::from(self.config.schema_chunk_size);
        let limit = self.config.max_schema_bytes;
        let mut schema = Vec::new();
        let mut offset: u32 = 0;

        loop {
            let chunk = self.read(
                SCHEMA_ENDPOINT,
                Expect::AtMost(chunk_size),
                &offset.to_le_bytes(),
                PROTOCOL_VERSION,
                "schema",
            )?;
            if chunk.is_empty() {
                break;
            }
            offset += chunk.len() as u32;
            schema.extend_from_slice(&chunk);
            if schema.len() > limit {
                warn!(bytes = schema.len(), limit = limit, "Schema transfer exceeds size limit");
                return Err(SessionError::SchemaParse);
            }
        }

        debug!(bytes = schema.len(), "Schema transfer complete");
        Ok(schema)
    }

    /// Put one frame on the wire, retrying the transport write. When every
    /// attempt fails the device is considered gone.
    fn send(&mut self, request: &Request) -> Result<(), SessionError> {
        let frame = request.encode();
        trace!(
            seq = request.sequence,
            endpoint = request.endpoint(),
            read = request.is_read(),
            expected = request.expected_size,
            payload_len = request.payload.len(),
            "Sending request"
        );

        let attempts = self.config.write_attempts.max(1);
        let endpoint = self.config.write_endpoint;
        let mut last_error = TransportError::Closed;

        if let Some(transport) = self.transport.as_mut() {
            for attempt in 1..=attempts {
                match transport.bulk_write(&frame, endpoint) {
                    Ok(written) if written == frame.len() => return Ok(()),
                    Ok(written) => {
                        last_error = TransportError::ShortWrite {
                            written,
                            expected: frame.len(),
                        }
                    }
                    Err(e) => last_error = e,
                }
                debug!(attempt = attempt, error = %last_error, "Bulk write attempt failed");
            }
        }

        warn!(
            endpoint = request.endpoint(),
            crc = %format!("0x{:04X}", request.checksum),
            error = %last_error,
            "Failed to send request, disconnecting"
        );
        self.disconnect();
        Err(SessionError::Transport(last_error))
    }

    /// One transport read. A failed read drops the device immediately.
    fn poll_response(&mut self, expected_len: usize) -> Result<Option<Response>, SessionError> {
        let endpoint = self.config.read_endpoint;
        let transport = self.transport.as_mut().ok_or(SessionError::NotConnected)?;

        match transport.bulk_read(expected_len + RESPONSE_HEADER_LEN, endpoint) {
            Ok(buf) => Ok(Response::decode(&buf)),
            Err(e) => {
                warn!(error = %e, "Bulk read failed, disconnecting");
                self.disconnect();
                Err(SessionError::Transport(e))
            }
        }
    }
}
