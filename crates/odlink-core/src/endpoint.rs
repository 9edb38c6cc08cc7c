//! Endpoint types for a device's capability tree

use serde::{Deserialize, Serialize};
use std::fmt;

/// Device-assigned numeric endpoint address
pub type EndpointId = u16;

/// Highest usable id; bit 15 of the address word is the read flag
pub const MAX_ENDPOINT_ID: EndpointId = 0x7fff;

/// Scalar wire types a device can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int32,
    Float,
}

impl ScalarType {
    /// Map a schema type string onto a scalar type
    pub fn from_schema(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(Self::Bool),
            "uint8" => Some(Self::Uint8),
            "uint16" => Some(Self::Uint16),
            "uint32" => Some(Self::Uint32),
            "uint64" => Some(Self::Uint64),
            "int32" => Some(Self::Int32),
            "float" => Some(Self::Float),
            _ => None,
        }
    }

    /// Type name as it appears in the schema
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Int32 => "int32",
            Self::Float => "float",
        }
    }

    /// Encoded width in bytes
    pub fn width(&self) -> usize {
        match self {
            Self::Bool | Self::Uint8 => 1,
            Self::Uint16 => 2,
            Self::Uint32 | Self::Int32 | Self::Float => 4,
            Self::Uint64 => 8,
        }
    }

    /// C type name used in generated headers
    pub fn c_type(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Uint8 => "uint8_t",
            Self::Uint16 => "uint16_t",
            Self::Uint32 => "uint32_t",
            Self::Uint64 => "uint64_t",
            Self::Int32 => "int32_t",
            Self::Float => "float",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an endpoint is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// Grouping node with children and no value
    Object,
    /// Remote-callable function with ordered inputs and outputs
    Function,
    /// Readable (and possibly writable) value
    Scalar(ScalarType),
}

impl EndpointKind {
    /// Objects have no address; everything else lives in the directory
    pub fn is_addressable(&self) -> bool {
        !matches!(self, Self::Object)
    }

    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Self::Scalar(ty) => Some(*ty),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Function => "function",
            Self::Scalar(ty) => ty.as_str(),
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable index of a node inside an [`EndpointTree`](crate::EndpointTree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    pub fn get(&self) -> usize {
        self.0
    }
}

/// A node in the device's capability tree
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    /// Leaf name (e.g. "error")
    pub name: String,
    /// Dotted path from the tree root (e.g. "axis0.motor.error")
    pub identifier: String,
    /// Identifier prefixed with the device tag (e.g. "odrv0.axis0.motor.error")
    pub full_path: String,
    pub kind: EndpointKind,
    /// Numeric address, present for every non-object node
    pub id: Option<EndpointId>,
    pub readonly: bool,
    pub children: Vec<NodeIndex>,
    pub inputs: Vec<NodeIndex>,
    pub outputs: Vec<NodeIndex>,
}

impl Endpoint {
    pub fn is_function(&self) -> bool {
        matches!(self.kind, EndpointKind::Function)
    }

    /// Whether a value can be written to this endpoint
    pub fn is_writable(&self) -> bool {
        matches!(self.kind, EndpointKind::Scalar(_)) && !self.readonly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_type_round_trip_names() {
        for name in ["bool", "uint8", "uint16", "uint32", "uint64", "int32", "float"] {
            let ty = ScalarType::from_schema(name).unwrap();
            assert_eq!(ty.as_str(), name);
        }
        assert_eq!(ScalarType::from_schema("int64"), None);
        assert_eq!(ScalarType::from_schema("object"), None);
    }

    #[test]
    fn test_scalar_widths() {
        assert_eq!(ScalarType::Bool.width(), 1);
        assert_eq!(ScalarType::Uint16.width(), 2);
        assert_eq!(ScalarType::Float.width(), 4);
        assert_eq!(ScalarType::Uint64.width(), 8);
    }

    #[test]
    fn test_kind_addressable() {
        assert!(!EndpointKind::Object.is_addressable());
        assert!(EndpointKind::Function.is_addressable());
        assert!(EndpointKind::Scalar(ScalarType::Int32).is_addressable());
        assert_eq!(EndpointKind::Function.to_string(), "function");
        assert_eq!(EndpointKind::Scalar(ScalarType::Uint8).to_string(), "uint8");
    }
}
