use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parallelogram_core::{codec, EngineConfig, HandlerRegistry, Request, Response};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::queue::{ChunkQueue, QueuedRequest};

/// Short cooperative sleep the processor loop uses to avoid busy-waiting on
/// an empty queue, per §4.8 / §5.
const PROCESSOR_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A long-lived worker process: joins the multicast discovery group,
/// accepts chunks on a TCP port, runs the registered handler, and replies
/// to the chunk's origin. Owns all of its background state (acceptor,
/// discovery responder, queue, abort signal) behind a single
/// `start`/`stop` lifecycle, the way `Server()` is described in §9's
/// "cyclic/global state" note.
pub struct Server {
    config: EngineConfig,
    registry: Arc<HandlerRegistry>,
    queue: ChunkQueue,
    close_tx: watch::Sender<bool>,
    close_rx: watch::Receiver<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Server {
    pub fn new(config: EngineConfig, registry: HandlerRegistry) -> Self {
        let (close_tx, close_rx) = watch::channel(false);
        Server {
            config,
            registry: Arc::new(registry),
            queue: ChunkQueue::new(),
            close_tx,
            close_rx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Binds the TCP acceptor and launches the discovery responder and
    /// queue-processor loop as background tasks. Per §4.8, all three check
    /// the close signal between iterations.
    pub async fn start(&self) -> Result<()> {
        let mut handles = self.handles.lock().await;
        if !handles.is_empty() {
            return Err(Error::AlreadyStarted);
        }

        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        let bind_addr: SocketAddr = ([0, 0, 0, 0], self.config.port).into();
        socket.bind(&bind_addr.into())?;
        socket.listen(self.config.max_connect_requests as i32)?;
        let listener = TcpListener::from_std(socket.into())?;
        log::info!("worker: listening on {bind_addr}");

        let discovery_config = self.config.clone();
        let discovery_queue = self.queue.clone();
        let discovery_close_rx = self.close_rx.clone();
        let discovery_handle = tokio::spawn(async move {
            let load_fn = move || discovery_queue.len();
            if let Err(e) =
                parallelogram_discovery::run_responder(&discovery_config, load_fn, discovery_close_rx)
                    .await
            {
                log::error!("worker: discovery responder exited with error: {e}");
            }
        });

        let acceptor_config = self.config.clone();
        let acceptor_queue = self.queue.clone();
        let mut acceptor_close_rx = self.close_rx.clone();
        let acceptor_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, peer)) => {
                                let queue = acceptor_queue.clone();
                                let network_chunk_size = acceptor_config.network_chunk_size;
                                tokio::spawn(Self::drain_connection(stream, peer, queue, network_chunk_size));
                            }
                            Err(e) => log::warn!("worker: accept failed: {e}"),
                        }
                    }
                    _ = acceptor_close_rx.changed() => {
                        log::info!("worker: acceptor shutting down");
                        break;
                    }
                }
            }
        });

        let processor_config = self.config.clone();
        let processor_queue = self.queue.clone();
        let processor_registry = Arc::clone(&self.registry);
        let mut processor_close_rx = self.close_rx.clone();
        let processor_handle = tokio::spawn(async move {
            loop {
                if *processor_close_rx.borrow() {
                    log::info!("worker: processor shutting down");
                    break;
                }
                match processor_queue.pop().await {
                    Some(QueuedRequest { from, request }) => {
                        Self::process_one(&processor_registry, &processor_config, from, request)
                            .await;
                    }
                    None => tokio::time::sleep(PROCESSOR_POLL_INTERVAL).await,
                }
            }
        });

        *handles = vec![discovery_handle, acceptor_handle, processor_handle];
        Ok(())
    }

    /// Reads one request off an accepted connection and enqueues it. A
    /// short-lived task per connection, per §5's "2 auxiliary tasks" model.
    async fn drain_connection(
        mut stream: TcpStream,
        peer: SocketAddr,
        queue: ChunkQueue,
        network_chunk_size: usize,
    ) {
        match codec::read_message::<Request, _>(&mut stream, network_chunk_size).await {
            Ok(request) => queue.push(QueuedRequest { from: peer, request }).await,
            Err(e) => log::warn!("worker: failed to decode request from {peer}: {e}"),
        }
    }

    /// Executes one dequeued request and spawns a short-lived sender task
    /// for the reply, per §4.8.
    async fn process_one(
        registry: &HandlerRegistry,
        config: &EngineConfig,
        from: SocketAddr,
        request: Request,
    ) {
        log::trace!(
            "worker: executing op={:?} handler={} index={}",
            request.op,
            request.fn_token.name,
            request.index
        );
        let index = request.index;
        let response = match registry.apply_local(request.op, &request.fn_token, request.chunk) {
            Ok(chunk) => Response::Ok { index, chunk },
            Err(e) => {
                log::warn!("worker: handler error for index {index}: {e}");
                Response::Error {
                    index,
                    message: e.to_string(),
                }
            }
        };

        let reply_addr: SocketAddr = (from.ip(), config.port + 1).into();
        tokio::spawn(Self::send_response(reply_addr, response));
    }

    async fn send_response(reply_addr: SocketAddr, response: Response) {
        match TcpStream::connect(reply_addr).await {
            Ok(mut stream) => {
                if let Err(e) = codec::write_message(&mut stream, &response).await {
                    log::warn!("worker: failed to send response to {reply_addr}: {e}");
                }
            }
            Err(e) => log::warn!("worker: failed to connect to {reply_addr}: {e}"),
        }
    }

    /// Signals all background tasks to stop and waits for them to exit,
    /// closing every socket cleanly, per §4.8.
    pub async fn stop(&self) -> Result<()> {
        let _ = self.close_tx.send(true);
        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use parallelogram_core::{FnToken, Operation};
    use serde_json::json;
    use tokio::net::TcpListener;

    fn test_registry() -> HandlerRegistry {
        let mut r = HandlerRegistry::new();
        r.register_map("increment", |_args, e, i| json!(e.as_i64().unwrap() + i as i64));
        r
    }

    #[tokio::test]
    async fn processes_one_request_and_replies() {
        // Grab a free port the same way the spec's port/port+1 pairing
        // expects, by probing with an ephemeral bind and hoping the next
        // port is free (acceptable for a loopback test).
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let config = EngineConfig::new()
            .with_port(port)
            .with_multicast_group([239, 3, 3, 3], 0);
        let server = Server::new(config.clone(), test_registry());
        server.start().await.unwrap();

        // Client side: bind the response listener before sending, so the
        // worker's reply always has somewhere to land.
        let response_listener = TcpListener::bind(("127.0.0.1", port + 1)).await.unwrap();

        let mut request_stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let request = Request {
            op: Operation::Map,
            fn_token: FnToken::new("increment"),
            chunk: vec![json!(10), json!(20)],
            index: 7,
        };
        codec::write_message(&mut request_stream, &request).await.unwrap();

        let (mut response_stream, _) = response_listener.accept().await.unwrap();
        let response: Response = codec::read_message(&mut response_stream, config.network_chunk_size)
            .await
            .unwrap();

        match response {
            Response::Ok { index, chunk } => {
                assert_eq!(index, 7);
                assert_eq!(chunk, vec![json!(10), json!(21)]);
            }
            Response::Error { message, .. } => panic!("unexpected error response: {message}"),
        }

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_handler_name_yields_error_response() {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let config = EngineConfig::new()
            .with_port(port)
            .with_multicast_group([239, 3, 3, 4], 0);
        let server = Server::new(config.clone(), test_registry());
        server.start().await.unwrap();

        let response_listener = TcpListener::bind(("127.0.0.1", port + 1)).await.unwrap();
        let mut request_stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let request = Request {
            op: Operation::Map,
            fn_token: FnToken::new("does_not_exist"),
            chunk: vec![json!(1)],
            index: 0,
        };
        codec::write_message(&mut request_stream, &request).await.unwrap();

        let (mut response_stream, _) = response_listener.accept().await.unwrap();
        let response: Response = codec::read_message(&mut response_stream, config.network_chunk_size)
            .await
            .unwrap();

        assert!(matches!(response, Response::Error { .. }));
        server.stop().await.unwrap();
    }
}
