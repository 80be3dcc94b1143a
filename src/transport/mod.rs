//! # Transport Layer
//!
//! Byte-stream connections the packet adapter can run over.
//!
//! ## Components
//! - **StreamConn**: the stream contract (`AsyncRead + AsyncWrite` plus a local address)
//! - **TCP**: dial/accept helpers that exchange the preface and return a ready adapter

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::TcpStream;

pub mod tcp;

/// A reliable, ordered byte stream
pub trait StreamConn: AsyncRead + AsyncWrite + Unpin + Send + 'static {
    /// Local address of the stream, if it has one
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl StreamConn for TcpStream {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpStream::local_addr(self)
    }
}

/// In-memory pipes have no socket address.
impl StreamConn for DuplexStream {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "in-memory stream has no local address",
        ))
    }
}
