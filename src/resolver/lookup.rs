//! Underlying name lookup.

use std::fmt;
use std::future::Future;
use std::io;
use std::net::IpAddr;

/// Address families a lookup may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    /// Any family.
    Ip,
    /// IPv4 only.
    Ip4,
    /// IPv6 only.
    Ip6,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Ip => "ip",
            Network::Ip4 => "ip4",
            Network::Ip6 => "ip6",
        }
    }

    /// Whether `addr` belongs to this network.
    pub fn admits(&self, addr: &IpAddr) -> bool {
        match self {
            Network::Ip => true,
            Network::Ip4 => addr.is_ipv4(),
            Network::Ip6 => addr.is_ipv6(),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves a host name to IP addresses.
///
/// Implemented by [`SystemLookup`] in production and by fakes in tests.
pub trait NameLookup: Send + Sync + 'static {
    fn lookup_ip(
        &self,
        network: Network,
        host: &str,
    ) -> impl Future<Output = io::Result<Vec<IpAddr>>> + Send;
}

/// Lookup through the operating system resolver (`getaddrinfo`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLookup;

impl NameLookup for SystemLookup {
    async fn lookup_ip(&self, network: Network, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;

        let mut ips: Vec<IpAddr> = Vec::new();
        for addr in addrs {
            let ip = addr.ip();
            // getaddrinfo repeats an address once per socket type
            if network.admits(&ip) && !ips.contains(&ip) {
                ips.push(ip);
            }
        }
        Ok(ips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_filters_family() {
        let v4: IpAddr = "10.0.0.1".parse().unwrap();
        let v6: IpAddr = "::1".parse().unwrap();

        assert!(Network::Ip.admits(&v4) && Network::Ip.admits(&v6));
        assert!(Network::Ip4.admits(&v4) && !Network::Ip4.admits(&v6));
        assert!(!Network::Ip6.admits(&v4) && Network::Ip6.admits(&v6));
        assert_eq!(Network::Ip6.to_string(), "ip6");
    }

    #[tokio::test]
    async fn system_lookup_passes_literals_through() {
        let ips = SystemLookup.lookup_ip(Network::Ip, "127.0.0.1").await.unwrap();
        assert_eq!(ips, vec!["127.0.0.1".parse::<IpAddr>().unwrap()]);

        let none = SystemLookup.lookup_ip(Network::Ip6, "127.0.0.1").await.unwrap();
        assert!(none.is_empty());
    }
}
