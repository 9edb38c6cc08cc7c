//! Simulated device for session tests.
//!
//! Decodes every request frame, answers reads from a value table and the
//! schema text, and records what it saw so tests can assert on the wire
//! traffic. Behaviour switches live in a shared [`DeviceLog`] that stays
//! reachable after the device has been boxed into a session.

#![allow(dead_code)]

use odlink_usb::{Request, Response, Session, SessionConfig, Transport, TransportError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

pub const SCHEMA: &str = r#"[
    {"name": "", "id": 0, "type": "json", "access": "r"},
    {"name": "vbus_voltage", "id": 1, "type": "float", "access": "r"},
    {"name": "serial_number", "id": 2, "type": "uint64", "access": "r"},
    {"name": "fw_version_major", "id": 3, "type": "uint8", "access": "r"},
    {"name": "fw_version_minor", "id": 4, "type": "uint8", "access": "r"},
    {"name": "fw_version_revision", "id": 5, "type": "uint8", "access": "r"},
    {"name": "fw_version_unreleased", "id": 6, "type": "uint8", "access": "r"},
    {"name": "axis0", "type": "object", "members": [
        {"name": "error", "id": 10, "type": "uint32", "access": "rw"},
        {"name": "requested_state", "id": 11, "type": "uint32", "access": "rw"},
        {"name": "current_state", "id": 12, "type": "uint32", "access": "r"},
        {"name": "motor", "type": "object", "members": [
            {"name": "error", "id": 13, "type": "uint32", "access": "rw"}
        ]},
        {"name": "encoder", "type": "object", "members": [
            {"name": "error", "id": 14, "type": "uint32", "access": "rw"},
            {"name": "pos_estimate", "id": 15, "type": "float", "access": "r"}
        ]},
        {"name": "controller", "type": "object", "members": [
            {"name": "error", "id": 16, "type": "uint32", "access": "rw"},
            {"name": "input_vel", "id": 18, "type": "float", "access": "rw"},
            {"name": "move_incremental", "id": 19, "type": "function",
             "inputs": [
                {"name": "displacement", "id": 20, "type": "float", "access": "rw"},
                {"name": "from_input_pos", "id": 21, "type": "bool", "access": "rw"}
             ],
             "outputs": []}
        ]},
        {"name": "clear_errors", "id": 17, "type": "function", "inputs": [], "outputs": []}
    ]},
    {"name": "axis1", "type": "object", "members": [
        {"name": "error", "id": 30, "type": "uint32", "access": "rw"},
        {"name": "motor", "type": "object", "members": [
            {"name": "error", "id": 31, "type": "uint32", "access": "rw"}
        ]},
        {"name": "encoder", "type": "object", "members": [
            {"name": "error", "id": 32, "type": "uint32", "access": "rw"}
        ]},
        {"name": "controller", "type": "object", "members": [
            {"name": "error", "id": 33, "type": "uint32", "access": "rw"}
        ]},
        {"name": "clear_errors", "id": 34, "type": "function", "inputs": [], "outputs": []}
    ]}
]"#;

/// Addressable endpoints in [`SCHEMA`]
pub const ADDRESSABLE_COUNT: usize = 23;

/// All nodes in [`SCHEMA`], objects included
pub const NODE_COUNT: usize = 31;

#[derive(Debug, Default)]
pub struct DeviceLog {
    pub claimed: Vec<u8>,
    pub write_attempts: usize,
    pub closes: usize,
    pub refuse_claim: bool,
    pub fail_writes: bool,
    pub fail_reads: bool,
    /// Serve the start of the schema whatever offset is requested
    pub ignore_schema_offset: bool,
    /// Endpoints whose reads are never answered
    pub silent: HashSet<u16>,
    /// Endpoints whose reads are preceded by a same-sequence response of
    /// the wrong size
    pub noisy: HashSet<u16>,
    /// Every request frame that reached the device
    pub requests: Vec<Request>,
    pub values: HashMap<u16, Vec<u8>>,
}

impl DeviceLog {
    pub fn schema_requests(&self) -> Vec<&Request> {
        self.requests.iter().filter(|r| r.endpoint() == 0).collect()
    }

    pub fn last_request(&self) -> Option<&Request> {
        self.requests.last()
    }
}

pub struct SimulatedDevice {
    schema: Vec<u8>,
    pending: VecDeque<Vec<u8>>,
    log: Arc<Mutex<DeviceLog>>,
}

impl SimulatedDevice {
    pub fn new(schema: &str) -> (Self, Arc<Mutex<DeviceLog>>) {
        let log = Arc::new(Mutex::new(DeviceLog::default()));
        let device = Self {
            schema: schema.as_bytes().to_vec(),
            pending: VecDeque::new(),
            log: log.clone(),
        };
        (device, log)
    }

    fn answer(&mut self, log: &DeviceLog, request: &Request) {
        // Device echoes the sequence with the direction bit set
        let sequence = request.sequence | 0x8000;
        let expected = request.expected_size as usize;
        let endpoint = request.endpoint();

        if !request.is_read() {
            self.respond(sequence, Vec::new());
            return;
        }

        if endpoint == 0 {
            let mut offset = [0u8; 4];
            offset.copy_from_slice(&request.payload[..4]);
            let start = if log.ignore_schema_offset {
                0
            } else {
                (u32::from_le_bytes(offset) as usize).min(self.schema.len())
            };
            let end = (start + expected).min(self.schema.len());
            let chunk = self.schema[start..end].to_vec();
            self.respond(sequence, chunk);
            return;
        }

        if log.silent.contains(&endpoint) {
            return;
        }
        if log.noisy.contains(&endpoint) {
            self.respond(sequence, vec![0xee; expected + 1]);
        }
        let value = log
            .values
            .get(&endpoint)
            .cloned()
            .unwrap_or_else(|| vec![0; expected]);
        self.respond(sequence, value);
    }

    fn respond(&mut self, sequence: u16, payload: Vec<u8>) {
        self.pending.push_back(Response { sequence, payload }.encode());
    }

    fn log(&self) -> MutexGuard<'_, DeviceLog> {
        self.log.lock().unwrap()
    }
}

impl Transport for SimulatedDevice {
    fn claim_interface(&mut self, interface: u8) -> Result<(), TransportError> {
        let mut log = self.log();
        if log.refuse_claim {
            return Err(TransportError::Claim {
                interface,
                reason: "busy".to_string(),
            });
        }
        log.claimed.push(interface);
        Ok(())
    }

    fn bulk_write(&mut self, data: &[u8], _endpoint: u8) -> Result<usize, TransportError> {
        let log_handle = self.log.clone();
        let mut log = log_handle.lock().unwrap();
        log.write_attempts += 1;
        if log.fail_writes {
            return Err(TransportError::Transfer("pipe stalled".to_string()));
        }

        let request = Request::decode(data).map_err(|e| TransportError::Transfer(e.to_string()))?;
        if !request.is_read() {
            log.values.insert(request.endpoint(), request.payload.clone());
        }
        self.answer(&log, &request);
        log.requests.push(request);
        Ok(data.len())
    }

    fn bulk_read(&mut self, _max_len: usize, _endpoint: u8) -> Result<Vec<u8>, TransportError> {
        if self.log().fail_reads {
            return Err(TransportError::Transfer("device gone".to_string()));
        }
        Ok(self.pending.pop_front().unwrap_or_default())
    }

    fn close(&mut self) {
        self.log().closes += 1;
    }
}

/// A session over [`SCHEMA`] with a few realistic values preloaded
pub fn connect() -> (Session, Arc<Mutex<DeviceLog>>) {
    connect_with(SCHEMA, SessionConfig::default())
}

pub fn connect_with(schema: &str, config: SessionConfig) -> (Session, Arc<Mutex<DeviceLog>>) {
    let (device, log) = SimulatedDevice::new(schema);
    {
        let mut log = log.lock().unwrap();
        log.values.insert(1, 24.0f32.to_le_bytes().to_vec());
        log.values.insert(2, 0x3868_3431_3539u64.to_le_bytes().to_vec());
        log.values.insert(3, vec![0]);
        log.values.insert(4, vec![5]);
        log.values.insert(5, vec![6]);
        log.values.insert(6, vec![0]);
    }
    let session = Session::new(Box::new(device), config).expect("claim succeeds");
    (session, log)
}
