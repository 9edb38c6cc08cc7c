//! Request and response frames
//!
//! Request layout, all fields little-endian:
//! ```text
//! [0:2)          sequence number
//! [2:4)          endpoint address (bit 15 set for reads)
//! [4:6)          expected response size
//! [6:6+n)        payload
//! [6+n:8+n)      checksum
//! ```
//! A response is the echoed sequence number followed by the payload. The
//! device may set the direction bit in the echo, so it is masked before
//! comparing.

use odlink_core::{EndpointId, MAX_ENDPOINT_ID};
use thiserror::Error;

/// Direction bit of the address word; set for reads
pub const READ_FLAG: u16 = 0x8000;

/// Mask applied to echoed sequence numbers
pub const SEQUENCE_MASK: u16 = 0x7fff;

/// Sequence numbers wrap at this value
pub const SEQUENCE_MODULUS: u16 = 4096;

/// Header and trailer bytes around the request payload
pub const FRAME_OVERHEAD: usize = 8;

/// Bytes preceding the payload in a response
pub const RESPONSE_HEADER_LEN: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Frame too short: {0} bytes")]
    TooShort(usize),
    #[error("Payload of {0} bytes does not fit a frame")]
    PayloadTooLarge(usize),
    #[error("Endpoint id {0} collides with the read flag")]
    EndpointOutOfRange(EndpointId),
}

/// A request frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub sequence: u16,
    /// Endpoint id combined with the direction bit
    pub address: u16,
    pub expected_size: u16,
    pub payload: Vec<u8>,
    pub checksum: u16,
}

impl Request {
    pub fn read(
        sequence: u16,
        endpoint: EndpointId,
        expected_size: u16,
        payload: Vec<u8>,
        checksum: u16,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            sequence,
            address: READ_FLAG | check_endpoint(endpoint)?,
            expected_size,
            payload,
            checksum,
        })
    }

    pub fn write(
        sequence: u16,
        endpoint: EndpointId,
        expected_size: u16,
        payload: Vec<u8>,
        checksum: u16,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            sequence,
            address: check_endpoint(endpoint)?,
            expected_size,
            payload,
            checksum,
        })
    }

    pub fn endpoint(&self) -> EndpointId {
        self.address & !READ_FLAG
    }

    pub fn is_read(&self) -> bool {
        self.address & READ_FLAG != 0
    }

    pub fn encoded_len(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&self.address.to_le_bytes());
        buf.extend_from_slice(&self.expected_size.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Inverse of [`Request::encode`]; everything between the header and
    /// the trailing checksum is payload.
    pub fn decode(frame: &[u8]) -> Result<Self, CodecError> {
        if frame.len() < FRAME_OVERHEAD {
            return Err(CodecError::TooShort(frame.len()));
        }
        let word = |at: usize| u16::from_le_bytes([frame[at], frame[at + 1]]);
        let trailer = frame.len() - 2;

        Ok(Self {
            sequence: word(0),
            address: word(2),
            expected_size: word(4),
            payload: frame[6..trailer].to_vec(),
            checksum: word(trailer),
        })
    }
}

/// A response frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Sequence number as echoed, direction bit possibly set
    pub sequence: u16,
    pub payload: Vec<u8>,
}

impl Response {
    /// Split a raw buffer. Buffers shorter than the header carry no response.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < RESPONSE_HEADER_LEN {
            return None;
        }
        Some(Self {
            sequence: u16::from_le_bytes([buf[0], buf[1]]),
            payload: buf[RESPONSE_HEADER_LEN..].to_vec(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RESPONSE_HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Whether this answers the request with `sequence`
    pub fn answers(&self, sequence: u16) -> bool {
        self.sequence & SEQUENCE_MASK == sequence
    }
}

fn check_endpoint(endpoint: EndpointId) -> Result<EndpointId, CodecError> {
    if endpoint > MAX_ENDPOINT_ID {
        return Err(CodecError::EndpointOutOfRange(endpoint));
    }
    Ok(endpoint)
}

/// Payload length as carried in the expected-size field
pub fn wire_len(len: usize) -> Result<u16, CodecError> {
    u16::try_from(len).map_err(|_| CodecError::PayloadTooLarge(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_frame_layout() {
        let frame = Request::read(5, 0x0102, 4, Vec::new(), 0xbeef).unwrap().encode();
        assert_eq!(frame, vec![0x05, 0x00, 0x02, 0x81, 0x04, 0x00, 0xef, 0xbe]);
    }

    #[test]
    fn test_write_frame_layout() {
        let request = Request::write(0x0fff, 17, 1, vec![0], 0x1234).unwrap();
        assert!(!request.is_read());
        assert_eq!(request.encoded_len(), 9);
        assert_eq!(
            request.encode(),
            vec![0xff, 0x0f, 0x11, 0x00, 0x01, 0x00, 0x00, 0x34, 0x12]
        );
    }

    #[test]
    fn test_decode_request_round_trip() {
        let request = Request::write(42, 300, 4, vec![1, 2, 3, 4], 0xa5a5).unwrap();
        let decoded = Request::decode(&request.encode()).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(decoded.endpoint(), 300);

        let read = Request::decode(&Request::read(1, 7, 8, vec![], 1).unwrap().encode()).unwrap();
        assert!(read.is_read());
        assert_eq!(read.endpoint(), 7);
        assert!(read.payload.is_empty());
    }

    #[test]
    fn test_decode_short_frames() {
        assert_eq!(Request::decode(&[0; 7]), Err(CodecError::TooShort(7)));
        assert_eq!(Response::decode(&[]), None);
        assert_eq!(Response::decode(&[0x01]), None);
    }

    #[test]
    fn test_response_masks_direction_bit() {
        let response = Response::decode(&[0x07, 0x80, 0xaa, 0xbb]).unwrap();
        assert_eq!(response.sequence, 0x8007);
        assert_eq!(response.payload, vec![0xaa, 0xbb]);
        assert!(response.answers(7));
        assert!(!response.answers(8));
    }

    #[test]
    fn test_endpoint_ids_with_read_flag_are_refused() {
        assert_eq!(
            Request::write(1, 0x8005, 1, vec![7], 0),
            Err(CodecError::EndpointOutOfRange(0x8005))
        );
        assert_eq!(
            Request::read(1, 0x8000, 1, vec![], 0),
            Err(CodecError::EndpointOutOfRange(0x8000))
        );
        assert_eq!(Request::write(1, 0x7fff, 1, vec![7], 0).unwrap().endpoint(), 0x7fff);
    }

    #[test]
    fn test_wire_len() {
        assert_eq!(wire_len(32), Ok(32));
        assert_eq!(wire_len(70_000), Err(CodecError::PayloadTooLarge(70_000)));
    }
}
