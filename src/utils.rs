use std::io;
use std::net::{IpAddr, SocketAddr};

use tokio::net::lookup_host;

/// Resolve a target to a single socket address, appending `default_port`
/// when none was given. Hosts that are already IP literals skip the lookup;
/// for everything else the first address in the DNS response wins.
pub async fn resolve_target(addr: &str, default_port: u16) -> io::Result<SocketAddr> {
    if let Ok(sock_addr) = addr.parse::<SocketAddr>() {
        return Ok(sock_addr);
    }

    if let Ok(ip) = addr.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    // host[:port]; a lone trailing ":port" is only split off when the rest
    // isn't itself an unbracketed v6 literal
    let (host, port) = match addr.rsplit_once(':') {
        Some((host, port_str)) if !host.contains(':') => match port_str.parse::<u16>() {
            Ok(port) => (host, port),
            Err(_) => (addr, default_port),
        },
        _ => (addr, default_port),
    };

    lookup_host((host, port)).await?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("host \"{host}\" didn't return any host addresses"),
        )
    })
}

/// Parse a "min-max" length range; a single number means min == max.
pub fn parse_num_range(range: &str) -> Result<(i64, i64), String> {
    let parts: Vec<&str> = range.split('-').collect();

    match parts[..] {
        [single] => {
            let n = parse_bound(single)?;
            Ok((n, n))
        }
        [min, max] => Ok((parse_bound(min)?, parse_bound(max)?)),
        _ => Err(format!(
            "number range too large: expected max of (2) numbers, got ({})",
            parts.len()
        )),
    }
}

fn parse_bound(s: &str) -> Result<i64, String> {
    s.trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid number \"{s}\": {e}"))
}
