//! Choosing one address to dial.

use std::net::IpAddr;

use rand::seq::SliceRandom;

/// Pick the address to dial: the first IPv4 address if there is one,
/// otherwise a uniformly random member of `addrs`.
pub fn select_address(addrs: &[IpAddr]) -> Option<IpAddr> {
    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.choose(&mut rand::thread_rng()))
        .copied()
}
