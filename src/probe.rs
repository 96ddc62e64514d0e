use std::net::SocketAddr;

use colored::Colorize;
use log::info;

use crate::dialer::ConnType;
use crate::pool::ProxyPool;
use crate::rfb::Client;

/// One-shot connect → handshake → close, reporting the server's banner
/// version, the negotiated version, and the advertised auth types. The user
/// asked to look before leaping; if the target is unreachable there is
/// nothing to attack, so any failure here is fatal to the process.
pub async fn run(
    dest_addr: SocketAddr,
    conn_type: ConnType,
    proxy_pool: Option<&ProxyPool>,
    packet_debug: bool,
) -> Result<(), String> {
    info!("Performing initial probe.. 🛸");

    let mut client = Client::new(dest_addr, conn_type, packet_debug);

    if let Some(pool) = proxy_pool {
        let proxy = pool
            .get()
            .map_err(|e| format!("failed to get proxy from pool: {e}"))?;
        client.proxy = Some(proxy);
    }

    client
        .connect()
        .await
        .map_err(|e| format!("failed to connect to server: {e}"))?;
    client
        .handshake()
        .await
        .map_err(|e| format!("failed to perform connection handshake: {e}"))?;
    client.kill();

    println!();
    println!(
        " {} {}",
        "•".cyan(),
        format!("Server protocol ver: {}", client.server_proto_ver).cyan()
    );
    println!(
        " {} {}",
        "•".cyan(),
        format!("Negotiated protocol ver: {}", client.proto_ver).cyan()
    );
    println!(" {} {}", "•".cyan(), "Auth types:".cyan());
    for auth_type in &client.security_types {
        println!("   {} {}", ">".cyan(), format!("{auth_type}").cyan());
    }
    println!();

    Ok(())
}
