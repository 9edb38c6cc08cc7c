//! Little-endian encoding of scalar endpoint values

use std::fmt;
use std::mem::size_of;
use thiserror::Error;

use crate::endpoint::ScalarType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("Cannot parse '{text}' as {ty}")]
    Parse { text: String, ty: ScalarType },
    #[error("Expected {expected} bytes for {ty}, got {actual}")]
    Width {
        ty: ScalarType,
        expected: usize,
        actual: usize,
    },
}

/// A Rust type that can be read from or written to an endpoint
pub trait Value: Copy + fmt::Debug + Send {
    /// Encoded width in bytes
    const SIZE: usize;
    /// Matching schema type
    const SCALAR: ScalarType;

    fn encode(self) -> Vec<u8>;

    /// Decode from exactly [`Self::SIZE`] bytes
    fn decode(bytes: &[u8]) -> Option<Self>;
}

impl Value for bool {
    const SIZE: usize = 1;
    const SCALAR: ScalarType = ScalarType::Bool;

    fn encode(self) -> Vec<u8> {
        vec![self as u8]
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [b] => Some(*b != 0),
            _ => None,
        }
    }
}

macro_rules! impl_numeric_value {
    ($($ty:ty => $scalar:ident),* $(,)?) => {
        $(
            impl Value for $ty {
                const SIZE: usize = size_of::<$ty>();
                const SCALAR: ScalarType = ScalarType::$scalar;

                fn encode(self) -> Vec<u8> {
                    self.to_le_bytes().to_vec()
                }

                fn decode(bytes: &[u8]) -> Option<Self> {
                    let raw: [u8; size_of::<$ty>()] = bytes.try_into().ok()?;
                    Some(<$ty>::from_le_bytes(raw))
                }
            }
        )*
    };
}

impl_numeric_value! {
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    i32 => Int32,
    f32 => Float,
}

/// A value tagged with its scalar type, for endpoints whose type is only
/// known from the schema
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Int32(i32),
    Float(f32),
}

impl ScalarValue {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Self::Bool(_) => ScalarType::Bool,
            Self::Uint8(_) => ScalarType::Uint8,
            Self::Uint16(_) => ScalarType::Uint16,
            Self::Uint32(_) => ScalarType::Uint32,
            Self::Uint64(_) => ScalarType::Uint64,
            Self::Int32(_) => ScalarType::Int32,
            Self::Float(_) => ScalarType::Float,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Self::Bool(v) => v.encode(),
            Self::Uint8(v) => v.encode(),
            Self::Uint16(v) => v.encode(),
            Self::Uint32(v) => v.encode(),
            Self::Uint64(v) => v.encode(),
            Self::Int32(v) => v.encode(),
            Self::Float(v) => v.encode(),
        }
    }

    pub fn decode(ty: ScalarType, bytes: &[u8]) -> Result<Self, ValueError> {
        let decoded = match ty {
            ScalarType::Bool => bool::decode(bytes).map(Self::Bool),
            ScalarType::Uint8 => u8::decode(bytes).map(Self::Uint8),
            ScalarType::Uint16 => u16::decode(bytes).map(Self::Uint16),
            ScalarType::Uint32 => u32::decode(bytes).map(Self::Uint32),
            ScalarType::Uint64 => u64::decode(bytes).map(Self::Uint64),
            ScalarType::Int32 => i32::decode(bytes).map(Self::Int32),
            ScalarType::Float => f32::decode(bytes).map(Self::Float),
        };
        decoded.ok_or(ValueError::Width {
            ty,
            expected: ty.width(),
            actual: bytes.len(),
        })
    }

    /// Parse user input for the given type. Integers accept a `0x` prefix,
    /// booleans accept `true`/`false`/`1`/`0`.
    pub fn parse(ty: ScalarType, text: &str) -> Result<Self, ValueError> {
        let trimmed = text.trim();
        let err = || ValueError::Parse {
            text: text.to_string(),
            ty,
        };
        let value = match ty {
            ScalarType::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Self::Bool(true),
                "false" | "0" => Self::Bool(false),
                _ => return Err(err()),
            },
            ScalarType::Uint8 => Self::Uint8(parse_unsigned(trimmed).ok_or_else(err)?),
            ScalarType::Uint16 => Self::Uint16(parse_unsigned(trimmed).ok_or_else(err)?),
            ScalarType::Uint32 => Self::Uint32(parse_unsigned(trimmed).ok_or_else(err)?),
            ScalarType::Uint64 => Self::Uint64(parse_unsigned(trimmed).ok_or_else(err)?),
            ScalarType::Int32 => Self::Int32(parse_signed(trimmed).ok_or_else(err)?),
            ScalarType::Float => Self::Float(trimmed.parse().map_err(|_| err())?),
        };
        Ok(value)
    }
}

fn parse_unsigned<T: TryFrom<u64>>(text: &str) -> Option<T> {
    let wide = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => text.parse::<u64>().ok()?,
    };
    T::try_from(wide).ok()
}

fn parse_signed(text: &str) -> Option<i32> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok().map(|v| v as i32),
        None => text.parse().ok(),
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Uint8(v) => write!(f, "{}", v),
            Self::Uint16(v) => write!(f, "{}", v),
            Self::Uint32(v) => write!(f, "{}", v),
            Self::Uint64(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{:.4}", v),
        }
    }
}
