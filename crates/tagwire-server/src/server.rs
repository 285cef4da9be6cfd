//! Connection manager: handshake listener and per-connection cycles.
//!
//! The well-known listener only performs the handshake: for each accepted
//! client it binds a fresh session listener from the configured port range,
//! announces that port as decimal text over the framed transport, and
//! closes the handshake socket. The client reconnects to the announced port
//! and all RPC traffic flows there; the well-known listener never carries
//! any. Each connection gets its own thread and, in deferred mode, its own
//! run loop worker, so one call can be executing while the next is already
//! being read. A connection table keyed by peer endpoint tracks the live
//! sessions.

use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tagwire_common::element::Element;
use tagwire_common::protocol::decode_call;
use tagwire_common::{Config, FrameTransport, Result, TagwireError};

use crate::registry::Registry;
use crate::run_loop::{Event, RunLoop, CALL_EVENT_LABEL};

/// How a connection executes dispatched calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Run the handler on the connection thread before reading the next
    /// call.
    Inline,
    /// Hand the call to the connection's run loop and keep reading; calls
    /// still execute strictly in arrival order.
    #[default]
    Deferred,
}

/// One live session in the connection table.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    /// The peer as seen on the handshake socket.
    pub peer: SocketAddr,
    /// The dedicated port this session's traffic runs on.
    pub session_port: u16,
}

type ConnectionTable = Arc<Mutex<HashMap<SocketAddr, ConnectionInfo>>>;

/// The server: a handshake listener plus per-connection session threads.
pub struct RpcServer {
    config: Config,
    registry: Arc<Registry>,
    mode: DispatchMode,
    listener: TcpListener,
    transport: FrameTransport,
    connections: ConnectionTable,
    next_session_slot: AtomicUsize,
}

impl RpcServer {
    /// Binds the well-known listener and prepares to serve `registry`.
    pub fn bind(config: Config, registry: Registry, mode: DispatchMode) -> Result<Self> {
        config.validate()?;
        let transport = FrameTransport::new(config.max_frame_len)?;
        let listener = TcpListener::bind(config.listen_addr()).map_err(|e| {
            TagwireError::Connection(format!("failed to bind {}: {e}", config.listen_addr()))
        })?;

        Ok(RpcServer {
            config,
            registry: Arc::new(registry),
            mode,
            listener,
            transport,
            connections: Arc::new(Mutex::new(HashMap::new())),
            next_session_slot: AtomicUsize::new(0),
        })
    }

    /// The address the well-known listener actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| TagwireError::Connection(format!("failed to get local addr: {e}")))
    }

    /// Snapshot of the live connection table.
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        lock_table(&self.connections).values().cloned().collect()
    }

    /// Accepts and hands off connections until the listener fails.
    pub fn serve(&self) -> Result<()> {
        tracing::info!(addr = %self.local_addr()?, "server listening");
        loop {
            let (stream, peer) = self.listener.accept().map_err(|e| {
                TagwireError::Connection(format!("failed to accept connection: {e}"))
            })?;
            if let Err(error) = self.handshake(stream, peer) {
                tracing::warn!(%peer, %error, "handshake failed");
            }
        }
    }

    /// Consumes the server and runs [`RpcServer::serve`] on its own thread.
    pub fn spawn(self) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            if let Err(error) = self.serve() {
                tracing::error!(%error, "server stopped");
            }
        })
    }

    /// Runs the two-phase handshake for one accepted client: bind a session
    /// listener, start the connection thread, announce the port, hang up.
    fn handshake(&self, mut stream: TcpStream, peer: SocketAddr) -> Result<()> {
        let (session_listener, session_port) = self.bind_session_listener()?;
        tracing::info!(%peer, session_port, "connection accepted");

        lock_table(&self.connections).insert(
            peer,
            ConnectionInfo {
                peer,
                session_port,
            },
        );

        let registry = Arc::clone(&self.registry);
        let connections = Arc::clone(&self.connections);
        let transport = self.transport;
        let mode = self.mode;
        let settle = self.config.poll_interval();
        thread::spawn(move || {
            let outcome =
                run_connection(session_listener, registry, transport, mode, settle);
            match outcome {
                Ok(()) => tracing::info!(%peer, "connection closed"),
                Err(error) => tracing::warn!(%peer, %error, "connection ended with error"),
            }
            lock_table(&connections).remove(&peer);
        });

        // the session listener is already bound, so the client may connect
        // the moment it learns the port
        self.transport
            .send_text(&mut stream, &session_port.to_string())?;
        Ok(())
    }

    /// Binds the next free port in the session range, or an ephemeral port
    /// when the range start is 0.
    fn bind_session_listener(&self) -> Result<(TcpListener, u16)> {
        let host = &self.config.listen_host;
        if self.config.session_port_start == 0 {
            let listener = TcpListener::bind((host.as_str(), 0))?;
            let port = listener
                .local_addr()
                .map_err(TagwireError::Io)?
                .port();
            return Ok((listener, port));
        }

        let start = self.config.session_port_start;
        let count = self.config.session_port_count as usize;
        for _ in 0..count {
            let slot = self.next_session_slot.fetch_add(1, Ordering::Relaxed) % count;
            let port = start.wrapping_add(slot as u16);
            match TcpListener::bind((host.as_str(), port)) {
                Ok(listener) => return Ok((listener, port)),
                Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => continue,
                Err(e) => return Err(TagwireError::Io(e)),
            }
        }
        Err(TagwireError::Connection(
            "session port range exhausted".into(),
        ))
    }
}

/// Accepts the reconnecting client on its session listener and drives the
/// receive-dispatch-send cycle until the peer disconnects.
fn run_connection(
    listener: TcpListener,
    registry: Arc<Registry>,
    transport: FrameTransport,
    mode: DispatchMode,
    settle: Duration,
) -> Result<()> {
    let (mut stream, _) = listener
        .accept()
        .map_err(|e| TagwireError::Connection(format!("session accept failed: {e}")))?;
    // one client per session listener
    drop(listener);

    let writer = Arc::new(Mutex::new(stream.try_clone()?));
    let run_loop = RunLoop::new();
    let worker = match mode {
        DispatchMode::Deferred => Some(run_loop.spawn()),
        DispatchMode::Inline => None,
    };

    let outcome = connection_cycle(
        &mut stream,
        &registry,
        transport,
        mode,
        settle,
        &run_loop,
        &writer,
    );

    if let Some(worker) = worker {
        run_loop.quit();
        let _ = worker.join();
    }
    outcome
}

fn connection_cycle(
    stream: &mut TcpStream,
    registry: &Arc<Registry>,
    transport: FrameTransport,
    mode: DispatchMode,
    settle: Duration,
    run_loop: &RunLoop,
    writer: &Arc<Mutex<TcpStream>>,
) -> Result<()> {
    loop {
        let payload = match transport.receive_text(stream)? {
            None => return Ok(()),
            Some(payload) => payload,
        };

        // the call payload is decoded here, before any handoff; a malformed
        // payload is fatal to this connection's cycle
        let (name, arguments) = decode_call(payload.as_bytes())?;

        match mode {
            DispatchMode::Inline => {
                dispatch_and_reply(registry, transport, writer, &name, &arguments, settle)?;
            }
            DispatchMode::Deferred => {
                let registry = Arc::clone(registry);
                let writer = Arc::clone(writer);
                let event = Event::new(CALL_EVENT_LABEL, move || {
                    let outcome = dispatch_and_reply(
                        &registry, transport, &writer, &name, &arguments, settle,
                    );
                    if let Err(error) = outcome {
                        tracing::warn!(%error, "deferred call failed");
                    }
                });
                if !run_loop.enqueue(event) {
                    return Err(TagwireError::Connection(
                        "run loop terminated under a live connection".into(),
                    ));
                }
            }
        }
    }
}

/// Dispatches one decoded call and sends its reply, if the call produced
/// one.
fn dispatch_and_reply(
    registry: &Registry,
    transport: FrameTransport,
    writer: &Arc<Mutex<TcpStream>>,
    name: &str,
    arguments: &[Element],
    settle: Duration,
) -> Result<()> {
    let reply = registry.dispatch_call(name, arguments)?;

    // settle interval between handler completion and the reply hitting the
    // wire
    thread::sleep(settle);

    let mut stream = writer.lock().unwrap_or_else(PoisonError::into_inner);
    transport.send_text(&mut stream, &reply)
}

fn lock_table(
    table: &ConnectionTable,
) -> std::sync::MutexGuard<'_, HashMap<SocketAddr, ConnectionInfo>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}
