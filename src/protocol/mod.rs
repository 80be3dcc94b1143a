//! # Protocol Layer
//!
//! Connection-level pieces of UDP-over-TCP.
//!
//! ## Components
//! - **Preface**: 2-byte magic/version marker sent once per stream
//! - **Packet connection**: a stream presented as a send-to/receive-from datagram endpoint

pub mod packet_conn;
pub mod preface;

#[cfg(test)]
mod tests;

pub use packet_conn::UotPacketConn;
pub use preface::{read_preface, write_preface, MAGIC_BYTE, PREFACE, UOT_VERSION};
