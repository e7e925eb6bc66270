//! Server - owns the registries, router and worker pool, accepts TCP
//! connections and schedules one session per connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::LineCodec;
use crate::config::ServerConfig;
use crate::error::GarrisonError;
use crate::pool::WorkerPool;
use crate::registry::{ChannelRegistry, ClientRegistry};
use crate::router::MessageRouter;
use crate::state::{Connection, OutboundReceiver};

/// How long the accept loop backs off while the client registry is full.
const FULL_REGISTRY_RETRY: Duration = Duration::from_millis(100);
/// Back-off after a failed accept.
const ACCEPT_ERROR_RETRY: Duration = Duration::from_millis(20);
const LISTEN_BACKLOG: u32 = 1024;

/// Point-in-time observability snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ServerStats {
    pub client_count: usize,
    pub total_connections: u64,
    pub received_bytes: u64,
    pub sent_bytes: u64,
    pub active_tasks: usize,
    pub queued_tasks: usize,
}

pub struct Server {
    config: ServerConfig,
    clients: Arc<ClientRegistry>,
    channels: Arc<ChannelRegistry>,
    router: Arc<MessageRouter>,
    pool: WorkerPool,
    listener: Option<TcpListener>,
    shutdown: CancellationToken,
}

impl Server {
    /// Build the registries, router and worker pool and wire the removal
    /// cascade. No sockets are touched until [`bind`](Self::bind).
    pub fn new(config: ServerConfig) -> Result<Self, GarrisonError> {
        let pool = WorkerPool::new(config.pool_size)?;
        let clients = Arc::new(ClientRegistry::new(config.max_users));
        let channels = Arc::new(ChannelRegistry::new(config.max_channels));

        let router = Arc::new(MessageRouter::new(
            Arc::clone(&clients),
            Arc::clone(&channels),
        ));
        router.set_motd(&config.motd);

        clients.set_on_client_added(Box::new(|connection| {
            debug!("Client {} registered", connection.id());
        }));
        // Removing a client must leave every channel it was in. The callback
        // runs outside the client registry's lock.
        let cascade = Arc::clone(&channels);
        clients.set_on_client_removed(Box::new(move |connection| {
            cascade.remove_client_from_all_channels(connection);
        }));

        Ok(Self {
            config,
            clients,
            channels,
            router,
            pool,
            listener: None,
            shutdown: CancellationToken::new(),
        })
    }

    /// Bind the listening socket with `SO_REUSEADDR`, returning the bound
    /// address. Port 0 picks an ephemeral port.
    pub async fn bind(&mut self) -> Result<SocketAddr, GarrisonError> {
        let socket = TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        socket.bind(SocketAddr::from(([0, 0, 0, 0], self.config.port)))?;
        let listener = socket.listen(LISTEN_BACKLOG)?;
        let addr = listener.local_addr()?;
        info!("Listening on {addr}");
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Accept connections until the shutdown token fires, then tear every
    /// session down.
    pub async fn run(mut self) -> Result<(), GarrisonError> {
        if self.listener.is_none() {
            self.bind().await?;
        }
        let Some(listener) = self.listener.take() else {
            return Err(GarrisonError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "listening socket was not bound",
            )));
        };
        info!("{} accepting connections", self.config.server_name);

        while !self.shutdown.is_cancelled() {
            if !self.clients.can_accept() {
                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(FULL_REGISTRY_RETRY) => {}
                }
                continue;
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => self.accept_connection(stream, peer_addr),
                    Err(e) => {
                        warn!("Failed to accept connection: {e}");
                        tokio::time::sleep(ACCEPT_ERROR_RETRY).await;
                    }
                },
            }
        }

        self.stop().await;
        Ok(())
    }

    fn accept_connection(&self, stream: TcpStream, peer_addr: SocketAddr) {
        // Counted once per accepted socket; the new value is the connection id.
        let id = self.clients.increment_total_connections();
        info!("New connection {id} from {peer_addr}");

        let (connection, outbound) = Connection::new(id);
        if !self.clients.add_client(&connection) {
            // Dropping the stream closes the refused socket.
            warn!("Refusing connection {id} from {peer_addr}: server full");
            return;
        }

        let session = run_session(
            stream,
            Arc::clone(&connection),
            outbound,
            Arc::clone(&self.router),
            Arc::clone(&self.clients),
            self.config.server_name.clone(),
        );
        if !self.pool.enqueue(Box::pin(session)) {
            warn!("Worker pool refused session for connection {id}");
            self.clients.remove_client(&connection);
        }
    }

    /// Idempotent teardown: stop accepting, remove every connection (each
    /// removal cancels its session and cascades channel cleanup), drain the
    /// pool.
    pub async fn stop(&self) {
        self.shutdown.cancel();
        for connection in self.clients.all_clients() {
            self.clients.remove_client(&connection);
        }
        self.pool.shutdown().await;
        info!("Server stopped");
    }

    /// Cancelling this token makes [`run`](Self::run) shut down gracefully.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            client_count: self.clients.client_count(),
            total_connections: self.clients.total_connections(),
            received_bytes: self.router.received_bytes(),
            sent_bytes: self.router.sent_bytes(),
            active_tasks: self.pool.active_tasks(),
            queued_tasks: self.pool.queued_tasks(),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.channel_count()
    }
}

/// Drive one connection: greet, then read lines into the router and drain
/// the outbound queue to the socket until the peer disconnects, a transport
/// error occurs, the inbound buffer overflows, or the registry removes the
/// connection.
async fn run_session(
    stream: TcpStream,
    connection: Arc<Connection>,
    mut outbound: OutboundReceiver,
    router: Arc<MessageRouter>,
    clients: Arc<ClientRegistry>,
    server_name: String,
) {
    let mut framed = Framed::new(stream, LineCodec::new());
    let closed = connection.closed_token();

    router.send_server_message(&connection, &format!("Welcome to {server_name}!"));
    router.send_server_message(&connection, "Type /help for a list of available commands.");

    loop {
        tokio::select! {
            _ = closed.cancelled() => break,
            inbound = framed.next() => match inbound {
                Some(Ok(line)) => {
                    if !line.is_empty() {
                        router.handle_message(&connection, &line);
                    }
                }
                Some(Err(e)) => {
                    debug!("Read error on connection {}: {e}", connection.id());
                    break;
                }
                None => {
                    debug!("Connection {} closed by peer", connection.id());
                    break;
                }
            },
            queued = outbound.recv() => match queued {
                Some(line) => {
                    // A stalled peer must not be able to outlive removal.
                    tokio::select! {
                        _ = closed.cancelled() => break,
                        sent = framed.send(line) => {
                            if let Err(e) = sent {
                                debug!("Write error on connection {}: {e}", connection.id());
                                break;
                            }
                        }
                    }
                }
                // Sender half dropped; nothing left to deliver.
                None => break,
            },
        }
    }

    if clients.contains(connection.id()) {
        clients.remove_client(&connection);
    }
    debug!("Session for connection {} ended", connection.id());
}
