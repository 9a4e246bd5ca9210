use std::net::{Ipv4Addr, SocketAddr};

use parallelogram_core::EngineConfig;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::watch;

use crate::error::Result;

const PROBE_PAYLOAD: &[u8] = b"job";

/// Joins the multicast group and answers every `"job"` probe with this
/// worker's current load, until `close_rx` reports a close signal.
///
/// Grounded in `helpers.py::Broadcast_Server_Thread`, replacing its
/// `_abort`-flag-checked-next-iteration loop (which can't check the flag
/// while blocked in `recvfrom`) with `tokio::select!` racing the receive
/// against the close signal, the same idiom `webrtc-mdns`'s `DnsConn::start`
/// uses for its own close channel.
pub async fn run_responder(
    config: &EngineConfig,
    load_fn: impl Fn() -> usize + Send + Sync,
    mut close_rx: watch::Receiver<bool>,
) -> Result<()> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    let bind_addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, config.multicast_port).into();
    socket.bind(&bind_addr.into())?;

    let udp = UdpSocket::from_std(socket.into())?;
    udp.join_multicast_v4(
        Ipv4Addr::from(config.multicast_group_ip),
        Ipv4Addr::UNSPECIFIED,
    )?;
    log::info!(
        "discovery responder: joined {} on {}",
        config.multicast_addr(),
        bind_addr
    );

    let mut buf = [0u8; 64];
    loop {
        tokio::select! {
            res = udp.recv_from(&mut buf) => {
                let (n, from) = res?;
                if &buf[..n] == PROBE_PAYLOAD {
                    let load = load_fn();
                    log::trace!("discovery responder: probe from {from}, replying load={load}");
                    if let Err(e) = udp.send_to(load.to_string().as_bytes(), from).await {
                        log::warn!("discovery responder: failed to reply to {from}: {e}");
                    }
                }
            }
            _ = close_rx.changed() => {
                log::info!("discovery responder: close signal received");
                break;
            }
        }
    }

    Ok(())
}
