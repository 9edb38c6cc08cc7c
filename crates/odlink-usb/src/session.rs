//! Device session
//!
//! A [`Session`] owns the transport, the connection state and the parsed
//! endpoint tree of one device. Every transaction runs under a single lock,
//! so callers on different threads are serialised and only one request is
//! ever in flight.

use odlink_core::{
    export_header, parse_schema, schema_checksum, Endpoint, EndpointId, EndpointKind, EndpointTree,
    ErrorRegister, ErrorRegisters, FirmwareVersion, ScalarValue, Value,
};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use crate::codec::CodecError;
use crate::config::SessionConfig;
use crate::engine::{Engine, Expect};
use crate::error::SessionError;
use crate::transport::Transport;

struct SessionState {
    engine: Engine,
    loaded: bool,
    checksum: u16,
    schema: String,
    device_index: u32,
    tree: EndpointTree,
    errors: ErrorRegisters,
}

impl SessionState {
    fn load(&mut self, device_index: u32) -> Result<(), SessionError> {
        self.loaded = false;
        self.engine.mark_connected();
        if !self.engine.is_connected() {
            return Err(SessionError::NotConnected);
        }

        let raw = match self.engine.fetch_schema() {
            Ok(raw) => raw,
            Err(SessionError::SchemaParse) => {
                self.fail_parse();
                return Err(SessionError::SchemaParse);
            }
            Err(e) => {
                warn!(error = %e, "Schema transfer failed");
                self.tree.clear();
                return Err(e);
            }
        };

        self.checksum = schema_checksum(&raw);
        match String::from_utf8(raw) {
            Ok(text) => self.schema = text,
            Err(e) => {
                error!(error = %e, "Schema is not valid UTF-8");
                self.fail_parse();
                return Err(SessionError::SchemaParse);
            }
        }

        self.rebuild(device_index)?;

        if !self.engine.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.loaded = true;
        info!(
            crc = %format!("0x{:04X}", self.checksum),
            endpoints = self.tree.directory().len(),
            device_index = device_index,
            "Schema loaded"
        );
        Ok(())
    }

    /// Rebuild tree and directory from the stored schema text
    fn rebuild(&mut self, device_index: u32) -> Result<(), SessionError> {
        self.tree.clear();
        self.device_index = device_index;

        match parse_schema(&self.schema, device_index) {
            Ok(tree) => {
                self.tree = tree;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Error while parsing schema");
                self.fail_parse();
                Err(SessionError::SchemaParse)
            }
        }
    }

    fn fail_parse(&mut self) {
        self.tree.clear();
        self.loaded = false;
        self.engine.disconnect();
    }

    fn is_live(&self) -> bool {
        self.loaded && self.engine.is_connected()
    }

    fn resolve(&self, identifier: &str) -> Result<&Endpoint, SessionError> {
        let found = if self.loaded {
            self.tree.resolve(identifier)
        } else {
            None
        };
        found.ok_or_else(|| {
            error!(identifier = identifier, "Endpoint was not found in the cache");
            SessionError::EndpointNotFound(identifier.to_string())
        })
    }

    fn resolve_id(&self, identifier: &str) -> Result<(EndpointId, EndpointKind), SessionError> {
        let endpoint = self.resolve(identifier)?;
        let id = endpoint
            .id
            .ok_or_else(|| SessionError::EndpointNotFound(identifier.to_string()))?;
        Ok((id, endpoint.kind))
    }

    fn read_raw(&mut self, endpoint: EndpointId, len: usize, type_name: &'static str) -> Result<Vec<u8>, SessionError> {
        if !self.is_live() {
            return Err(SessionError::NotConnected);
        }
        let checksum = self.checksum;
        self.engine
            .read(endpoint, Expect::Exactly(len), &[], checksum, type_name)
    }

    fn write_raw(&mut self, endpoint: EndpointId, payload: &[u8]) -> Result<(), SessionError> {
        if !self.is_live() {
            return Err(SessionError::NotConnected);
        }
        let checksum = self.checksum;
        self.engine.write(endpoint, payload, checksum).map_err(|e| {
            warn!(
                endpoint = endpoint,
                crc = %format!("0x{:04X}", checksum),
                error = %e,
                "Failed to write endpoint"
            );
            e
        })
    }
}

/// A connected device
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    /// Claim the configured interface and load the schema.
    ///
    /// Only a failed claim is fatal; a failed schema load leaves a session
    /// that reports itself unusable until [`Session::load`] succeeds.
    pub fn new(mut transport: Box<dyn Transport>, config: SessionConfig) -> Result<Self, SessionError> {
        let interface = config.interface;
        transport.claim_interface(interface).map_err(|source| {
            error!(interface = interface, error = %source, "Cannot claim USB interface");
            SessionError::ClaimFailed { interface, source }
        })?;

        let device_index = config.device_index;
        let session = Self {
            state: Mutex::new(SessionState {
                engine: Engine::new(transport, config),
                loaded: false,
                checksum: 0,
                schema: String::new(),
                device_index,
                tree: EndpointTree::new(),
                errors: ErrorRegisters::default(),
            }),
        };

        if let Err(e) = session.load(device_index) {
            warn!(error = %e, "Initial schema load failed");
        }
        Ok(session)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the schema again and rebuild the endpoint tree for `device_index`
    pub fn load(&self, device_index: u32) -> Result<(), SessionError> {
        self.lock().load(device_index)
    }

    /// Rebuild full paths for another device index without refetching
    pub fn set_device_index(&self, device_index: u32) -> Result<(), SessionError> {
        let mut state = self.lock();
        if !state.loaded {
            return Err(SessionError::NotConnected);
        }
        state.rebuild(device_index)
    }

    /// Connected, transport present and schema loaded
    pub fn is_usable(&self) -> bool {
        let state = self.lock();
        state.engine.is_connected() && state.engine.transport_present() && state.loaded
    }

    pub fn is_connected(&self) -> bool {
        self.lock().engine.is_connected()
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    /// Checksum of the loaded schema
    pub fn checksum(&self) -> u16 {
        self.lock().checksum
    }

    pub fn device_index(&self) -> u32 {
        self.lock().device_index
    }

    pub fn config(&self) -> SessionConfig {
        self.lock().engine.config().clone()
    }

    /// Raw schema text as received from the device
    pub fn schema_text(&self) -> String {
        self.lock().schema.clone()
    }

    /// Snapshot of the endpoint tree
    pub fn tree(&self) -> EndpointTree {
        self.lock().tree.clone()
    }

    /// Look up an addressable endpoint by identifier
    pub fn resolve(&self, identifier: &str) -> Result<Endpoint, SessionError> {
        self.lock().resolve(identifier).cloned()
    }

    /// Addressable endpoints in schema order
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let state = self.lock();
        if !state.loaded {
            return Vec::new();
        }
        state.tree.addressable().cloned().collect()
    }

    pub fn read_id<T: Value>(&self, endpoint: EndpointId) -> Result<T, SessionError> {
        let bytes = self.lock().read_raw(endpoint, T::SIZE, T::SCALAR.as_str())?;
        decode(&bytes)
    }

    pub fn read<T: Value>(&self, identifier: &str) -> Result<T, SessionError> {
        let mut state = self.lock();
        let (id, _) = state.resolve_id(identifier)?;
        let bytes = state.read_raw(id, T::SIZE, T::SCALAR.as_str())?;
        decode(&bytes)
    }

    pub fn write_id<T: Value>(&self, endpoint: EndpointId, value: T) -> Result<(), SessionError> {
        self.lock().write_raw(endpoint, &value.encode())
    }

    pub fn write<T: Value>(&self, identifier: &str, value: T) -> Result<(), SessionError> {
        let mut state = self.lock();
        let (id, _) = state.resolve_id(identifier)?;
        state.write_raw(id, &value.encode())
    }

    /// Trigger a remote function by id
    pub fn call_id(&self, endpoint: EndpointId) -> Result<(), SessionError> {
        self.lock().write_raw(endpoint, &[0])
    }

    /// Trigger a remote function, e.g. `axis0.clear_errors`
    pub fn call(&self, identifier: &str) -> Result<(), SessionError> {
        let mut state = self.lock();
        let (id, _) = state.resolve_id(identifier)?;
        state.write_raw(id, &[0])
    }

    /// Read a scalar endpoint using the type declared in the schema
    pub fn read_value(&self, identifier: &str) -> Result<ScalarValue, SessionError> {
        let mut state = self.lock();
        let (id, kind) = state.resolve_id(identifier)?;
        let Some(ty) = kind.scalar_type() else {
            return Err(SessionError::Unsupported {
                operation: "read",
                identifier: identifier.to_string(),
                kind: kind.to_string(),
            });
        };
        let bytes = state.read_raw(id, ty.width(), ty.as_str())?;
        ScalarValue::decode(ty, &bytes).map_err(|source| SessionError::InvalidValue {
            identifier: identifier.to_string(),
            source,
        })
    }

    /// Parse `text` with the endpoint's declared type and write it
    pub fn write_value(&self, identifier: &str, text: &str) -> Result<ScalarValue, SessionError> {
        let mut state = self.lock();
        let endpoint = state.resolve(identifier)?;
        let (Some(id), Some(ty)) = (endpoint.id, endpoint.kind.scalar_type()) else {
            return Err(SessionError::Unsupported {
                operation: "write",
                identifier: identifier.to_string(),
                kind: endpoint.kind.to_string(),
            });
        };
        if !endpoint.is_writable() {
            return Err(SessionError::Unsupported {
                operation: "write",
                identifier: identifier.to_string(),
                kind: format!("read-only {}", ty),
            });
        }

        let value = ScalarValue::parse(ty, text).map_err(|source| SessionError::InvalidValue {
            identifier: identifier.to_string(),
            source,
        })?;
        state.write_raw(id, &value.encode())?;
        Ok(value)
    }

    /// Refresh all error registers. Registers that fail to read keep their
    /// previous value.
    pub fn update_errors(&self) -> ErrorRegisters {
        let mut errors = self.lock().errors;
        for register in ErrorRegister::all() {
            match self.read::<u32>(&register.identifier()) {
                Ok(value) => errors.set(register, value),
                Err(e) => debug!(register = %register.identifier(), error = %e, "Error register not refreshed"),
            }
        }
        self.lock().errors = errors;
        errors
    }

    /// Error registers as of the last [`Session::update_errors`]
    pub fn errors(&self) -> ErrorRegisters {
        self.lock().errors
    }

    /// Whether any cached error register is non-zero
    pub fn has_error(&self) -> bool {
        self.lock().errors.any()
    }

    pub fn serial_number(&self) -> Result<u64, SessionError> {
        self.read::<u64>("serial_number")
    }

    pub fn vbus_voltage(&self) -> Result<f32, SessionError> {
        self.read::<f32>("vbus_voltage")
    }

    pub fn firmware_version(&self) -> Result<FirmwareVersion, SessionError> {
        Ok(FirmwareVersion {
            major: self.read::<u8>("fw_version_major")?,
            minor: self.read::<u8>("fw_version_minor")?,
            revision: self.read::<u8>("fw_version_revision")?,
            unreleased: self.read::<u8>("fw_version_unreleased")?,
        })
    }

    /// Generate the endpoint definitions header for this device
    pub fn export_endpoints(&self) -> Result<String, SessionError> {
        if !self.is_usable() {
            return Err(SessionError::NotConnected);
        }
        let firmware = self.firmware_version().unwrap_or_else(|e| {
            warn!(error = %e, "Firmware version unavailable, exporting as 0.0.0:0");
            FirmwareVersion::default()
        });

        let state = self.lock();
        if !state.loaded {
            return Err(SessionError::NotConnected);
        }
        Ok(export_header(&state.tree, state.checksum, &firmware))
    }
}

fn decode<T: Value>(bytes: &[u8]) -> Result<T, SessionError> {
    T::decode(bytes).ok_or(SessionError::Codec(CodecError::TooShort(bytes.len())))
}
