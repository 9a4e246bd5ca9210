use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parallelogram_core::{chunk_data, codec, Chunk, EngineConfig, FnToken, HandlerRegistry, Operation, Request, Response, Result};
use serde_json::Value;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::scheduler;

/// What one `Dispatcher::dispatch` call produced: either `N` per-chunk
/// results shipped to remote workers, or one whole-input result computed
/// locally because no workers were reachable (§7's `NoWorkers` fallback).
pub enum DispatchOutcome {
    Remote(Vec<Vec<Value>>),
    Local(Vec<Value>),
}

/// The client half of the engine: discovers workers, chunks the input,
/// runs the fan-out/fan-in round loop with timeout doubling and
/// blacklisting, and reassembles results by chunk index (§4.7).
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    config: EngineConfig,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Dispatcher {
            registry,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(registry: Arc<HandlerRegistry>, config: EngineConfig) -> Self {
        Dispatcher { registry, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Runs one full dispatch: discover, chunk, round-loop until every slot
    /// is filled or the engine gives up and falls back to local execution.
    pub async fn dispatch(
        &self,
        op: Operation,
        fn_token: &FnToken,
        data: Vec<Value>,
        port: u16,
        mut timeout: Duration,
    ) -> Result<DispatchOutcome> {
        let mut candidates = discover(&self.config).await?;
        if candidates.is_empty() {
            log::info!("dispatch: no workers discovered, falling back to local execution");
            let result = self.registry.apply_local(op, fn_token, data)?;
            return Ok(DispatchOutcome::Local(result));
        }

        let chunks = chunk_data(data, self.config.chunk_size);
        let n = chunks.len();
        let slots: Arc<Mutex<Vec<Option<Vec<Value>>>>> = Arc::new(Mutex::new(vec![None; n]));

        while slots.lock().await.iter().any(Option::is_none) {
            let unfilled: Vec<usize> = {
                let guard = slots.lock().await;
                guard
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.is_none())
                    .map(|(i, _)| i)
                    .collect()
            };

            let assignment = match scheduler::assign(&mut candidates, unfilled.len()) {
                Ok(assignment) => assignment,
                Err(parallelogram_core::Error::NoWorkers) => {
                    log::warn!("dispatch: candidate pool exhausted, re-running discovery");
                    candidates = discover(&self.config).await?;
                    if candidates.is_empty() {
                        log::warn!(
                            "dispatch: no workers after re-discovery, falling back to local execution"
                        );
                        let whole_input = reconstruct(&chunks);
                        let result = self.registry.apply_local(op, fn_token, whole_input)?;
                        return Ok(DispatchOutcome::Local(result));
                    }
                    scheduler::assign(&mut candidates, unfilled.len())?
                }
                Err(e) => return Err(e),
            };

            self.run_round(op, fn_token, &chunks, &unfilled, &assignment, port, timeout, &slots)
                .await?;

            let failed_workers = {
                let guard = slots.lock().await;
                let mut failed: HashSet<IpAddr> = HashSet::new();
                for (pos, &i) in unfilled.iter().enumerate() {
                    if guard[i].is_none() {
                        failed.insert(assignment[pos]);
                    }
                }
                failed
            };
            if !failed_workers.is_empty() {
                log::warn!("dispatch: blacklisting {} worker(s) this round", failed_workers.len());
                candidates.retain(|w| !failed_workers.contains(&w.address));
            }

            timeout *= 2;
        }

        let result = {
            let mut guard = slots.lock().await;
            guard
                .iter_mut()
                .map(|slot| slot.take().expect("round loop only exits once every slot is filled"))
                .collect()
        };
        Ok(DispatchOutcome::Remote(result))
    }

    /// One fan-out/fan-in attempt across `unfilled` slots: opens a shared
    /// response listener on `port + 1`, sends one request per slot to its
    /// assigned worker, and accepts replies until `timeout` elapses with no
    /// further connections. §4.7 describes this as "one task per chunk,
    /// opens a connection, then listens on port+1"; binding literally one
    /// listener per task on the same port isn't expressible without
    /// `SO_REUSEPORT` fan-in games, so this binds the listener once for the
    /// round and demuxes replies by the `index` each response carries —
    /// equivalent fan-in, plainer Rust.
    #[allow(clippy::too_many_arguments)]
    async fn run_round(
        &self,
        op: Operation,
        fn_token: &FnToken,
        chunks: &[Chunk],
        unfilled: &[usize],
        assignment: &[IpAddr],
        port: u16,
        timeout: Duration,
        slots: &Arc<Mutex<Vec<Option<Vec<Value>>>>>,
    ) -> Result<()> {
        let listener = bind_response_listener(port + 1)?;

        let mut send_handles = Vec::with_capacity(unfilled.len());
        for (pos, &i) in unfilled.iter().enumerate() {
            let addr: SocketAddr = (assignment[pos], port).into();
            let request = Request {
                op,
                fn_token: fn_token.clone(),
                chunk: chunks[i].payload.clone(),
                index: i as u32,
            };
            send_handles.push(tokio::spawn(async move {
                if let Err(e) = send_request(addr, &request).await {
                    log::warn!("dispatch: chunk {} send to {addr} failed: {e}", request.index);
                }
            }));
        }

        let network_chunk_size = self.config.network_chunk_size;
        let mut accept_handles = Vec::with_capacity(unfilled.len());
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining, listener.accept()).await {
                Ok(Ok((mut stream, peer))) => {
                    let slots = Arc::clone(slots);
                    accept_handles.push(tokio::spawn(async move {
                        store_response(&mut stream, peer, network_chunk_size, &slots).await;
                    }));
                }
                Ok(Err(e)) => {
                    log::warn!("dispatch: accept on response listener failed: {e}");
                    break;
                }
                Err(_elapsed) => break,
            }
        }

        for h in send_handles {
            let _ = h.await;
        }
        for h in accept_handles {
            let _ = h.await;
        }
        Ok(())
    }
}

/// Thin wrapper around `parallelogram_discovery::discover` that renders its
/// error into `parallelogram_core::Error::Discovery` — `core` can't carry a
/// `#[from] parallelogram_discovery::Error` variant itself since `discovery`
/// depends on `core`.
async fn discover(config: &EngineConfig) -> Result<Vec<parallelogram_core::WorkerRecord>> {
    parallelogram_discovery::discover(config)
        .await
        .map_err(|e| parallelogram_core::Error::Discovery(e.to_string()))
}

fn reconstruct(chunks: &[Chunk]) -> Vec<Value> {
    chunks.iter().flat_map(|c| c.payload.iter().cloned()).collect()
}

fn bind_response_listener(port: u16) -> Result<TcpListener> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;
    Ok(TcpListener::from_std(socket.into())?)
}

async fn send_request(addr: SocketAddr, request: &Request) -> std::io::Result<()> {
    let mut stream = TcpStream::connect(addr).await?;
    codec::write_message(&mut stream, request)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

async fn store_response(
    stream: &mut TcpStream,
    peer: SocketAddr,
    network_chunk_size: usize,
    slots: &Arc<Mutex<Vec<Option<Vec<Value>>>>>,
) {
    match codec::read_message::<Response, _>(stream, network_chunk_size).await {
        Ok(Response::Ok { index, chunk }) => {
            let mut guard = slots.lock().await;
            let idx = index as usize;
            // Invariant: a filled slot is never overwritten (idempotent
            // reassembly — a redelivered or duplicate response is ignored).
            if guard[idx].is_none() {
                guard[idx] = Some(chunk);
            }
        }
        Ok(Response::Error { index, message }) => {
            log::warn!("dispatch: worker {peer} reported error for chunk {index}: {message}");
        }
        Err(e) => {
            log::warn!("dispatch: failed to decode response from {peer}: {e}");
        }
    }
}
