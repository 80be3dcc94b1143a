//! Connection preface: a magic byte and a version byte sent once per stream.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{ProtocolError, Result};

/// Marker identifying a UDP-over-TCP stream
pub const MAGIC_BYTE: u8 = 0xEE;

/// Current framing version
pub const UOT_VERSION: u8 = 0x01;

/// Preface bytes as sent on the wire
pub const PREFACE: [u8; 2] = [MAGIC_BYTE, UOT_VERSION];

/// Write the preface. Callers decide when (and whether) a connection needs it.
pub async fn write_preface<W>(writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(&PREFACE).await?;
    writer.flush().await?;
    debug!(version = UOT_VERSION, "Preface written");
    Ok(())
}

/// Read and verify the peer's preface.
pub async fn read_preface<R>(reader: &mut R) -> Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut preface = [0u8; 2];
    reader.read_exact(&mut preface).await?;

    if preface[0] != MAGIC_BYTE {
        warn!(magic = preface[0], "Unexpected preface magic byte");
        return Err(ProtocolError::InvalidHeader);
    }
    if preface[1] != UOT_VERSION {
        warn!(version = preface[1], "Unsupported preface version");
        return Err(ProtocolError::UnsupportedVersion(preface[1]));
    }
    Ok(())
}
