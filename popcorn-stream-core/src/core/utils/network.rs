use std::net::{IpAddr, Ipv4Addr};

use local_ip_address::local_ip;
use log::warn;

/// Retrieves a non-localhost (127.0.0.1) IP address from one of the machine's network interfaces.
/// When no network interface address could be found, the loopback address is returned instead.
pub fn ip_addr() -> IpAddr {
    local_ip().unwrap_or_else(|e| {
        warn!("Unable to retrieve the local ip address, {}", e);
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    })
}

/// Returns the address which should be advertised for the given bound address.
/// Unspecified addresses (`0.0.0.0` or `::`) are replaced by the local network address.
pub fn advertised_addr(bound: IpAddr) -> IpAddr {
    if bound.is_unspecified() {
        ip_addr()
    } else {
        bound
    }
}
