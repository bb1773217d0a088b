//! Turning a requested target into a socket address.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use super::{select_address, CachedResolver, NameLookup, Network, ResolveError};

/// Kinds of target address a client may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    Ipv4,
    Domain,
    Ipv6,
}

impl AddressType {
    pub fn code(&self) -> u8 {
        match self {
            AddressType::Ipv4 => 0x01,
            AddressType::Domain => 0x03,
            AddressType::Ipv6 => 0x04,
        }
    }
}

impl TryFrom<u8> for AddressType {
    type Error = ResolveError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x01 => Ok(AddressType::Ipv4),
            0x03 => Ok(AddressType::Domain),
            0x04 => Ok(AddressType::Ipv6),
            other => Err(ResolveError::UnsupportedAddressType(other)),
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressType::Ipv4 => "IPv4",
            AddressType::Domain => "domain",
            AddressType::Ipv6 => "IPv6",
        };
        f.write_str(name)
    }
}

impl<L: NameLookup> CachedResolver<L> {
    /// Resolve a raw target to a single address to dial.
    ///
    /// IP literals are used as given; domain names go through the cache and
    /// the address selection policy.
    pub async fn resolve_target(
        &self,
        address_type: u8,
        raw: &[u8],
        port: u16,
    ) -> Result<SocketAddr, ResolveError> {
        let address_type = AddressType::try_from(address_type)?;
        let malformed = || ResolveError::MalformedAddress {
            address_type,
            len: raw.len(),
        };

        let ip = match address_type {
            AddressType::Ipv4 => {
                let octets: [u8; 4] = raw.try_into().map_err(|_| malformed())?;
                IpAddr::V4(Ipv4Addr::from(octets))
            }
            AddressType::Ipv6 => {
                let octets: [u8; 16] = raw.try_into().map_err(|_| malformed())?;
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            AddressType::Domain => {
                if raw.is_empty() {
                    return Err(malformed());
                }
                let host = std::str::from_utf8(raw).map_err(|_| ResolveError::InvalidDomain)?;
                let addrs = self.lookup_addresses(Network::Ip, host).await?;
                select_address(&addrs).ok_or_else(|| ResolveError::NoAddresses {
                    host: host.to_string(),
                })?
            }
        };

        Ok(SocketAddr::new(ip, port))
    }
}
