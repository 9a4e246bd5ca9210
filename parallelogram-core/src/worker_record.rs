use std::net::IpAddr;

/// A discovered worker's address and self-reported load, as of this
/// dispatch round. Never persisted — it lives only for the duration of one
/// `Dispatcher::dispatch` call. The TCP port a worker accepts chunks on is
/// not part of the record; it's the `port` argument threaded through the
/// whole call, identical for every worker in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerRecord {
    pub address: IpAddr,
    pub projected_load: i32,
}

impl WorkerRecord {
    pub fn new(address: IpAddr, projected_load: i32) -> Self {
        WorkerRecord {
            address,
            projected_load,
        }
    }
}
