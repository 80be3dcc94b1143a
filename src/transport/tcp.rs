//! TCP transport: dial or accept a stream and wrap it in a packet adapter.
//!
//! The client writes the preface right after connecting; the server reads and
//! verifies it before handing the adapter back.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, instrument, warn};

use crate::config::{ClientConfig, ServerConfig};
use crate::core::frame::FrameLimits;
use crate::error::{ProtocolError, Result};
use crate::protocol::packet_conn::UotPacketConn;
use crate::protocol::preface::{read_preface, write_preface};
use crate::utils::timeout::with_timeout;

/// Connect to a UoT server
#[instrument(skip(config, limits), fields(address = %config.address))]
pub async fn connect(config: &ClientConfig, limits: FrameLimits) -> Result<UotPacketConn<TcpStream>> {
    let mut stream = with_timeout(config.connect_timeout, async {
        TcpStream::connect(&config.address)
            .await
            .map_err(ProtocolError::from)
    })
    .await?;
    stream.set_nodelay(true)?;

    if config.send_preface {
        write_preface(&mut stream).await?;
    }

    info!(peer = %config.address, "UoT connection established");
    Ok(UotPacketConn::with_limits(stream, limits))
}

/// Bind a listener on the configured server address
#[instrument(skip(config), fields(address = %config.address))]
pub async fn bind(config: &ServerConfig) -> Result<TcpListener> {
    let listener = TcpListener::bind(&config.address).await?;
    info!(address = %listener.local_addr()?, "Listening for UoT connections");
    Ok(listener)
}

/// Accept one connection and verify its preface
#[instrument(skip(listener, config, limits))]
pub async fn accept(
    listener: &TcpListener,
    config: &ServerConfig,
    limits: FrameLimits,
) -> Result<(UotPacketConn<TcpStream>, SocketAddr)> {
    let (mut stream, peer) = listener.accept().await?;
    stream.set_nodelay(true)?;
    debug!(peer = %peer, "Accepted connection");

    if config.expect_preface {
        if let Err(e) = with_timeout(config.preface_timeout, read_preface(&mut stream)).await {
            warn!(peer = %peer, error = %e, "Rejecting connection with bad preface");
            return Err(e);
        }
    }

    Ok((UotPacketConn::with_limits(stream, limits), peer))
}
