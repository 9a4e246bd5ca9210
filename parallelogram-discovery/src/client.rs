use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};

use parallelogram_core::{EngineConfig, WorkerRecord};
use tokio::net::UdpSocket;

use crate::error::{Error, Result};

const PROBE_PAYLOAD: &[u8] = b"job";

/// Sends one UDP multicast probe and collects `(address, load)` replies
/// until `config.discovery_window` elapses with no new arrival. Duplicates
/// from the same address overwrite prior entries, per §4.4. Returns an
/// empty list (not an error) when the window closes with no replies —
/// callers decide what an empty pool means.
///
/// Grounded in `helpers.py::_broadcast_client_thread`.
pub async fn discover(config: &EngineConfig) -> Result<Vec<WorkerRecord>> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    // Restricted to the same subnet, per §4.4.
    socket.set_multicast_ttl_v4(1)?;

    let group: SocketAddr = config.multicast_addr().into();
    socket.send_to(PROBE_PAYLOAD, group).await?;
    log::debug!("discovery: probe sent to {group}");

    let mut replies: HashMap<std::net::IpAddr, i32> = HashMap::new();
    let mut buf = [0u8; 64];

    loop {
        // Each iteration re-arms a fresh `discovery_window` timeout, so the
        // window effectively slides forward on every new reply.
        match tokio::time::timeout(config.discovery_window, socket.recv_from(&mut buf)).await {
            Ok(Ok((n, from))) => {
                match std::str::from_utf8(&buf[..n]).ok().and_then(|s| s.trim().parse::<i32>().ok()) {
                    Some(load) => {
                        log::trace!("discovery: reply from {} load={}", from.ip(), load);
                        replies.insert(from.ip(), load);
                    }
                    None => {
                        log::warn!("discovery: malformed reply from {}", from);
                    }
                }
            }
            Ok(Err(e)) => return Err(Error::from(e)),
            Err(_elapsed) => break,
        }
    }

    Ok(replies
        .into_iter()
        .map(|(address, projected_load)| WorkerRecord::new(address, projected_load))
        .collect())
}
