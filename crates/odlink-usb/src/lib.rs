//! odlink USB - Request/response protocol over a USB bulk endpoint pair
//!
//! This crate turns a raw bulk transport into a device session:
//! - [`codec`] frames requests and splits responses
//! - [`engine`] correlates requests and responses, with timeouts and retries
//! - [`Session`] owns connection state and the parsed endpoint tree

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod session;
pub mod transport;

pub use codec::{CodecError, Request, Response};
pub use config::SessionConfig;
pub use engine::SequenceCounter;
pub use error::SessionError;
pub use session::Session;
pub use transport::{Transport, TransportError};
