//! # Error Types
//!
//! Error handling for the UDP-over-TCP framing protocol.
//!
//! This module defines every error variant produced while encoding, decoding and
//! relaying datagrams, from low-level stream failures to malformed frames.
//!
//! ## Error Categories
//! - **I/O Errors**: Failures of the underlying byte stream, passed through unchanged
//! - **Codec Errors**: Malformed addresses, out-of-range length fields, oversized frames
//! - **Caller Errors**: Short receive buffers, missing destination addresses
//! - **Connection Errors**: Preface mismatches, deadlines, closed adapters
//!
//! ## Example Usage
//! ```rust
//! use uot_protocol::error::{ProtocolError, Result};
//! use uot_protocol::core::address::Endpoint;
//! use tracing::{error, info};
//!
//! fn parse(target: &str) -> Result<Endpoint> {
//!     target.parse::<Endpoint>()
//! }
//!
//! match parse("example.com:53") {
//!     Ok(endpoint) => info!(%endpoint, "Parsed endpoint"),
//!     Err(e) => error!(error = %e, "Bad endpoint"),
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Address codec errors
    pub const ERR_UNKNOWN_ADDRESS_TYPE: &str = "Unknown address type";
    pub const ERR_DOMAIN_TOO_LONG: &str = "Domain name exceeds 255 bytes";
    pub const ERR_MISSING_PORT: &str = "Missing port in address";
    pub const ERR_INVALID_PORT: &str = "Invalid UDP port";
    pub const ERR_TRUNCATED_ADDRESS: &str = "Address bytes truncated";

    /// Frame errors
    pub const ERR_EMPTY_ADDRESS: &str = "Address length must be greater than 0";

    /// Connection errors
    pub const ERR_NO_LOCAL_ADDR: &str = "Underlying stream has no local address";
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";
}

/// Which part of a frame exceeded its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePart {
    Address,
    Payload,
}

impl std::fmt::Display for FramePart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FramePart::Address => f.write_str("address"),
            FramePart::Payload => f.write_str("payload"),
        }
    }
}

// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Frame {part} too large: {size} bytes (max {max})")]
    FrameTooLarge {
        part: FramePart,
        size: usize,
        max: usize,
    },

    #[error("Buffer too short: datagram is {needed} bytes, buffer holds {available}")]
    ShortBuffer { needed: usize, available: usize },

    #[error("Destination address is missing")]
    NilAddress,

    #[error("Invalid protocol preface")]
    InvalidHeader,

    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// True when the error came from the underlying stream rather than the codec.
    pub fn is_io(&self) -> bool {
        matches!(self, ProtocolError::Io(_))
    }

    /// True when the stream reached end-of-file while a frame was expected.
    pub fn is_eof(&self) -> bool {
        matches!(self, ProtocolError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
