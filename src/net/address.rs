/**
 * Transport address value type, an IP plus an optional port.
 *
 * Used directly as the key of the allocation registry, so equality and
 * ordering follow (ip, port).
 */
use std::{
    fmt,
    net::{IpAddr, SocketAddr},
    str::FromStr,
};

use thiserror::Error;

/// Address family byte used by STUN address attributes for IPv4
pub(crate) const FAMILY_IPV4: u8 = 0x01;

/// Address family byte used by STUN address attributes for IPv6
pub(crate) const FAMILY_IPV6: u8 = 0x02;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("'{0}' is not a valid IPv4 or IPv6 address")]
    InvalidIp(String),
    #[error("'{0}' is not a valid port")]
    InvalidPort(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    ip: IpAddr,
    port: Option<u16>,
}

impl Address {
    pub fn new(ip: IpAddr, port: Option<u16>) -> Self {
        Self { ip, port }
    }

    /**
     * Parse an address from its textual IP and an optional port. Fails unless
     * the IP parses as IPv4 or IPv6.
     */
    pub fn parse(ip: &str, port: Option<u16>) -> Result<Self, AddressError> {
        let ip = ip
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .map_err(|_| AddressError::InvalidIp(ip.to_string()))?;
        Ok(Self { ip, port })
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /**
     * The family byte written into STUN address attributes.
     */
    pub fn family(&self) -> u8 {
        match self.ip {
            IpAddr::V4(_) => FAMILY_IPV4,
            IpAddr::V6(_) => FAMILY_IPV6,
        }
    }

    /**
     * Network-order bytes of the IP, 4 bytes for IPv4 and 16 for IPv6.
     */
    pub fn ip_octets(&self) -> Vec<u8> {
        match self.ip {
            IpAddr::V4(ip) => ip.octets().to_vec(),
            IpAddr::V6(ip) => ip.octets().to_vec(),
        }
    }

    /**
     * Network-order bytes of the port. A missing port encodes as zero.
     */
    pub fn port_octets(&self) -> [u8; 2] {
        self.port.unwrap_or(0).to_be_bytes()
    }

    /**
     * The socket address to bind or send to. A missing port becomes 0, which
     * makes the OS pick an ephemeral port on bind.
     */
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port.unwrap_or(0))
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        // v4 peers reaching a dual-stack socket show up as v4-mapped v6
        let ip = match addr.ip() {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(IpAddr::V6(v6)),
            ip => ip,
        };
        Self {
            ip,
            port: Some(addr.port()),
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    /**
     * Accepts "ip", "ip:port", "[v6]" and "[v6]:port".
     */
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(addr.into());
        }
        if let Ok(ip) = s.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
            return Ok(Self { ip, port: None });
        }
        match s.rsplit_once(':') {
            Some((ip, port)) if !ip.contains(':') || ip.ends_with(']') => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| AddressError::InvalidPort(port.to_string()))?;
                Self::parse(ip, Some(port))
            }
            _ => Err(AddressError::InvalidIp(s.to_string())),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}", SocketAddr::new(self.ip, port)),
            None => write!(f, "{}", self.ip),
        }
    }
}
