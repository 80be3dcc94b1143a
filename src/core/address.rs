//! # Address Codec
//!
//! Compact binary encoding of a UDP endpoint (host + port).
//!
//! ## Wire Format
//! ```text
//! [Type(1)] [Host(variable)] [Port(2, big-endian)]
//!
//! Type 0x01: IPv4   -> 4 raw bytes
//! Type 0x04: IPv6   -> 16 raw bytes
//! Type 0x03: Domain -> [Length(1)] [Name(Length)]
//! ```
//!
//! Domain names are carried as raw bytes. The codec does not validate their
//! content; resolution rejects names that cannot be looked up.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{constants, ProtocolError, Result};

/// Address type tags
pub mod address_type {
    /// IPv4 address (4 bytes)
    pub const IPV4: u8 = 0x01;
    /// Domain name (length + name)
    pub const DOMAIN: u8 = 0x03;
    /// IPv6 address (16 bytes)
    pub const IPV6: u8 = 0x04;
}

/// Maximum domain name length (bounded by the 1-byte length prefix)
pub const MAX_DOMAIN_LEN: usize = 255;

/// Largest possible encoded address: type + length + 255-byte name + port
pub const MAX_ENCODED_ADDRESS_LEN: usize = 1 + 1 + MAX_DOMAIN_LEN + 2;

/// Host part of an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Host {
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    /// Raw domain name bytes, not necessarily valid UTF-8
    Domain(Vec<u8>),
}

impl Host {
    /// Pick the host form by address family, folding IPv4-mapped IPv6 into IPv4.
    pub fn from_ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Host::Ipv4(v4),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => Host::Ipv4(v4),
                None => Host::Ipv6(v6),
            },
        }
    }

    /// Address type tag written on the wire
    pub const fn address_type(&self) -> u8 {
        match self {
            Host::Ipv4(_) => address_type::IPV4,
            Host::Ipv6(_) => address_type::IPV6,
            Host::Domain(_) => address_type::DOMAIN,
        }
    }

    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            Host::Ipv4(ip) => Some(IpAddr::V4(*ip)),
            Host::Ipv6(ip) => Some(IpAddr::V6(*ip)),
            Host::Domain(_) => None,
        }
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Ipv4(ip) => write!(f, "{ip}"),
            Host::Ipv6(ip) => write!(f, "{ip}"),
            Host::Domain(name) => write!(f, "{}", String::from_utf8_lossy(name)),
        }
    }
}

/// A UDP peer: host and port
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: Host,
    port: u16,
}

impl Endpoint {
    pub fn new(host: Host, port: u16) -> Result<Self> {
        if let Host::Domain(name) = &host {
            if name.len() > MAX_DOMAIN_LEN {
                return Err(ProtocolError::InvalidAddress(format!(
                    "{}: {} bytes",
                    constants::ERR_DOMAIN_TOO_LONG,
                    name.len()
                )));
            }
        }
        Ok(Self { host, port })
    }

    /// Build a domain-name endpoint
    pub fn domain(name: impl Into<Vec<u8>>, port: u16) -> Result<Self> {
        Self::new(Host::Domain(name.into()), port)
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The socket address for IP hosts; `None` for domain names.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.host.ip().map(|ip| SocketAddr::new(ip, self.port))
    }

    /// Number of bytes produced by [`Endpoint::encode`]
    pub fn encoded_len(&self) -> usize {
        let host_len = match &self.host {
            Host::Ipv4(_) => 4,
            Host::Ipv6(_) => 16,
            Host::Domain(name) => 1 + name.len(),
        };
        1 + host_len + 2
    }

    /// Append the wire encoding to `buf`
    #[allow(clippy::cast_possible_truncation)] // domain length checked in `new`
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());
        buf.put_u8(self.host.address_type());
        match &self.host {
            Host::Ipv4(ip) => buf.put_slice(&ip.octets()),
            Host::Ipv6(ip) => buf.put_slice(&ip.octets()),
            Host::Domain(name) => {
                buf.put_u8(name.len() as u8);
                buf.put_slice(name);
            }
        }
        buf.put_u16(self.port);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Decode an address from the front of `data`.
    ///
    /// Returns the endpoint and the number of bytes consumed. Truncated input
    /// and unknown type tags are reported as `InvalidAddress`.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let truncated = || ProtocolError::InvalidAddress(constants::ERR_TRUNCATED_ADDRESS.into());

        let (&atyp, rest) = data.split_first().ok_or_else(truncated)?;
        let (host, host_len) = match atyp {
            address_type::IPV4 => {
                let octets: [u8; 4] = rest
                    .get(..4)
                    .and_then(|s| s.try_into().ok())
                    .ok_or_else(truncated)?;
                (Host::Ipv4(Ipv4Addr::from(octets)), 4)
            }
            address_type::IPV6 => {
                let octets: [u8; 16] = rest
                    .get(..16)
                    .and_then(|s| s.try_into().ok())
                    .ok_or_else(truncated)?;
                (Host::Ipv6(Ipv6Addr::from(octets)), 16)
            }
            address_type::DOMAIN => {
                let len = *rest.first().ok_or_else(truncated)? as usize;
                let name = rest.get(1..1 + len).ok_or_else(truncated)?;
                (Host::Domain(name.to_vec()), 1 + len)
            }
            other => {
                return Err(ProtocolError::InvalidAddress(format!(
                    "{}: 0x{other:02x}",
                    constants::ERR_UNKNOWN_ADDRESS_TYPE
                )))
            }
        };

        let port_bytes = rest.get(host_len..host_len + 2).ok_or_else(truncated)?;
        let port = u16::from_be_bytes([port_bytes[0], port_bytes[1]]);

        Ok((Self { host, port }, 1 + host_len + 2))
    }

    /// Read one encoded address from an async byte source.
    ///
    /// Stream underruns surface as `Io` errors (`UnexpectedEof`); an unknown
    /// type tag is `InvalidAddress`.
    pub async fn read_from<R>(reader: &mut R) -> Result<Self>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let atyp = reader.read_u8().await?;
        let host = match atyp {
            address_type::IPV4 => {
                let mut octets = [0u8; 4];
                reader.read_exact(&mut octets).await?;
                Host::Ipv4(Ipv4Addr::from(octets))
            }
            address_type::IPV6 => {
                let mut octets = [0u8; 16];
                reader.read_exact(&mut octets).await?;
                Host::Ipv6(Ipv6Addr::from(octets))
            }
            address_type::DOMAIN => {
                let len = reader.read_u8().await? as usize;
                let mut name = vec![0u8; len];
                reader.read_exact(&mut name).await?;
                Host::Domain(name)
            }
            other => {
                return Err(ProtocolError::InvalidAddress(format!(
                    "{}: 0x{other:02x}",
                    constants::ERR_UNKNOWN_ADDRESS_TYPE
                )))
            }
        };
        let port = reader.read_u16().await?;
        Ok(Self { host, port })
    }

    /// Resolve to a concrete socket address.
    ///
    /// IP hosts resolve without I/O. Domain names go through the system
    /// resolver; empty or non-UTF-8 names fail without a lookup.
    pub async fn resolve(&self) -> Result<SocketAddr> {
        let name = match &self.host {
            Host::Ipv4(_) | Host::Ipv6(_) => {
                return self
                    .socket_addr()
                    .ok_or_else(|| ProtocolError::InvalidAddress(self.to_string()))
            }
            Host::Domain(name) => name,
        };

        let name = std::str::from_utf8(name).map_err(|e| {
            ProtocolError::InvalidAddress(format!("domain is not valid UTF-8: {e}"))
        })?;
        if name.is_empty() {
            return Err(ProtocolError::InvalidAddress("empty domain name".into()));
        }

        tokio::net::lookup_host((name, self.port))
            .await
            .map_err(|e| ProtocolError::InvalidAddress(format!("resolve {self}: {e}")))?
            .next()
            .ok_or_else(|| ProtocolError::InvalidAddress(format!("no addresses for {self}")))
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self {
            host: Host::from_ip(addr.ip()),
            port: addr.port(),
        }
    }
}

impl FromStr for Endpoint {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        let (host, port) = split_host_port(s)?;
        let port = port.parse::<u16>().map_err(|_| {
            ProtocolError::InvalidAddress(format!("{}: {port:?}", constants::ERR_INVALID_PORT))
        })?;

        match host.parse::<IpAddr>() {
            Ok(ip) => Ok(Self {
                host: Host::from_ip(ip),
                port,
            }),
            Err(_) => Self::domain(host.as_bytes(), port),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Host::Ipv6(ip) => write!(f, "[{ip}]:{}", self.port),
            host => write!(f, "{host}:{}", self.port),
        }
    }
}

/// Split `host:port`, accepting a bracketed host for IPv6 literals.
fn split_host_port(s: &str) -> Result<(&str, &str)> {
    let invalid = |reason: &str| ProtocolError::InvalidAddress(format!("{reason}: {s:?}"));

    if let Some(rest) = s.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| invalid("missing ']' in address"))?;
        let port = tail
            .strip_prefix(':')
            .ok_or_else(|| invalid(constants::ERR_MISSING_PORT))?;
        return Ok((host, port));
    }

    let (host, port) = s
        .rsplit_once(':')
        .ok_or_else(|| invalid(constants::ERR_MISSING_PORT))?;
    if host.contains(':') {
        return Err(invalid("too many colons in address"));
    }
    Ok((host, port))
}
