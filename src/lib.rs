//! # uot-protocol
//!
//! UDP-over-TCP framing: carry UDP datagrams, each tagged with its destination
//! address, over any reliable ordered byte stream.
//!
//! ## Layers
//! - [`core`]: address codec, datagram frames and a tokio codec
//! - [`protocol`]: connection preface and the packet adapter
//! - [`transport`]: stream contract and TCP dial/accept helpers
//! - [`config`], [`error`], [`utils`]: configuration, errors, logging, timeouts, metrics
//!
//! ## Example
//! ```rust,no_run
//! use uot_protocol::config::UotConfig;
//! use uot_protocol::transport::tcp;
//!
//! # async fn run() -> uot_protocol::error::Result<()> {
//! let config = UotConfig::default();
//! let conn = tcp::connect(&config.client, config.frame.limits()).await?;
//!
//! let target = "1.1.1.1:53".parse()?;
//! conn.send_to(b"query", Some(&target)).await?;
//!
//! let mut buf = [0u8; 2048];
//! let (len, from) = conn.recv_from(&mut buf).await?;
//! println!("{len} bytes from {from}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use crate::core::address::{Endpoint, Host};
pub use crate::core::codec::DatagramCodec;
pub use crate::core::frame::{read_datagram, write_datagram, Datagram, FrameLimits};
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::{write_preface, UotPacketConn};
