//! # Core Protocol Components
//!
//! Low-level address and frame handling for UDP-over-TCP.
//!
//! This module provides the foundation of the protocol: the binary address
//! encoding, datagram framing, and a tokio codec over the same wire format.
//!
//! ## Components
//! - **Address**: IPv4 / IPv6 / domain endpoint codec
//! - **Frame**: length-prefixed datagram frames read from and written to streams
//! - **Codec**: Tokio codec for framing over byte streams
//!
//! ## Wire Format
//! ```text
//! [AddrLen(2)] [PayloadLen(2)] [Type(1)] [Host(N)] [Port(2)] [Payload(M)]
//! ```
//!
//! ## Security
//! - Length fields validated before allocation
//! - Zero-length addresses rejected
//! - Unknown address types rejected without reading past the frame

pub mod address;
pub mod codec;
pub mod frame;
