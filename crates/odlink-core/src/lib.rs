//! odlink Core - Endpoint types, schema parsing and code generation
//!
//! This crate holds everything about a device's capability tree that does
//! not need a live connection:
//! - Endpoint arena with a flat identifier directory
//! - Schema (JSON self-description) parsing and checksum
//! - Scalar value encoding for the fixed set of wire types
//! - Error register decoding and axis state names
//! - C header export for companion firmware libraries

pub mod axis;
pub mod checksum;
pub mod directory;
pub mod endpoint;
pub mod export;
pub mod faults;
pub mod schema;
pub mod tree;
pub mod value;

pub use axis::AxisState;
pub use checksum::{crc16, schema_checksum, PROTOCOL_VERSION};
pub use directory::EndpointDirectory;
pub use endpoint::{Endpoint, EndpointId, EndpointKind, NodeIndex, ScalarType, MAX_ENDPOINT_ID};
pub use export::{c_type_name, export_header, macro_name, FirmwareVersion};
pub use faults::{flag_hint, ErrorRegister, ErrorRegisters, ErrorSource};
pub use schema::{device_tag, parse_schema, SchemaError};
pub use tree::EndpointTree;
pub use value::{ScalarValue, Value, ValueError};
