//! UDP listener set and poll loop around the cycle engine.
//!
//! This layer owns the sockets and timers. Datagrams and timer events go
//! into the [`CycleEngine`]; the [`Transmit`] actions that come back are
//! performed here. Each listener socket is bound with SO_REUSEPORT and
//! served by the configured number of worker tasks.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use cyclone_dns_domain::{
    Config, Destination, EngineError, ListenerConfig, NetworkFamily, Transport,
};

use crate::cycle::{CycleEngine, Transmit};
use crate::handler::DnsHandler;

const RECV_BUF_LEN: usize = 4096;

/// Sockets shared by every worker and timer task.
struct IoCtx {
    engine: Arc<CycleEngine>,
    listeners: Vec<Arc<UdpSocket>>,
    upstream_v4: Arc<UdpSocket>,
    upstream_v6: Option<Arc<UdpSocket>>,
}

struct RunningState {
    io: Arc<IoCtx>,
    tasks: Vec<JoinHandle<()>>,
}

/// The engine's outer lifecycle: configure, set a handler, listen, pause.
///
/// Mutations are rejected while listening, pausing twice is rejected, and
/// pause discards in-flight work rather than draining it.
pub struct DnsServer {
    config: Config,
    handler: Option<Arc<dyn DnsHandler>>,
    running: Option<RunningState>,
    binding: bool,
}

impl DnsServer {
    /// Validates the configuration and builds an idle server.
    ///
    /// Unsupported transports and invalid thread counts fail fast here, so
    /// no partially constructed server ever exists.
    pub fn new(config: Config) -> Result<Self, EngineError> {
        if config.server.tcp_port != 0 {
            return Err(EngineError::TcpUnsupported);
        }
        if config.server.http_port != 0 {
            return Err(EngineError::HttpUnsupported);
        }
        for listener in &config.server.listeners {
            match listener.transport {
                Transport::Udp => {}
                Transport::Tcp => return Err(EngineError::TcpUnsupported),
                Transport::Http => return Err(EngineError::HttpUnsupported),
            }
        }
        let engine = &config.engine;
        if engine.max_threads == 0 || engine.initial_threads == 0 {
            return Err(EngineError::InvalidThreads(
                "thread counts must be at least 1".to_string(),
            ));
        }
        if engine.initial_threads > engine.max_threads {
            return Err(EngineError::InvalidThreads(format!(
                "initial_threads {} exceeds max_threads {}",
                engine.initial_threads, engine.max_threads
            )));
        }
        Ok(Self {
            config,
            handler: None,
            running: None,
            binding: false,
        })
    }

    /// Registers the handler driven by every cycle.
    pub fn set_handler(&mut self, handler: Arc<dyn DnsHandler>) -> Result<(), EngineError> {
        if self.running.is_some() || self.binding {
            return Err(EngineError::MutationWhileListening);
        }
        self.handler = Some(handler);
        Ok(())
    }

    pub fn is_listening(&self) -> bool {
        self.running.is_some()
    }

    /// The live engine, once listening.
    pub fn engine(&self) -> Option<&Arc<CycleEngine>> {
        self.running.as_ref().map(|r| &r.io.engine)
    }

    /// Number of spawned tasks (listener workers plus the upstream readers
    /// and the resend clock). Zero when not listening.
    pub fn task_count(&self) -> usize {
        self.running.as_ref().map(|r| r.tasks.len()).unwrap_or(0)
    }

    /// Local addresses of the bound listener sockets, in configuration
    /// order. Useful when listening on port 0.
    pub fn listener_addrs(&self) -> Vec<SocketAddr> {
        self.running
            .as_ref()
            .map(|r| {
                r.io.listeners
                    .iter()
                    .filter_map(|s| s.local_addr().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Binds every configured listener and starts the worker, upstream, and
    /// resend-clock tasks.
    pub async fn listen(&mut self) -> Result<(), EngineError> {
        if self.running.is_some() || self.binding {
            return Err(EngineError::AlreadyListening);
        }
        let handler = self.handler.clone().ok_or(EngineError::NoHandler)?;
        self.binding = true;
        let result = self.bind_and_spawn(handler).await;
        self.binding = false;
        self.running = Some(result?);
        Ok(())
    }

    async fn bind_and_spawn(
        &self,
        handler: Arc<dyn DnsHandler>,
    ) -> Result<RunningState, EngineError> {
        let engine_cfg = &self.config.engine;
        let engine = Arc::new(CycleEngine::new(
            handler,
            engine_cfg.cycle_capacity(),
            engine_cfg.outgoing_capacity(),
            Duration::from_millis(engine_cfg.resend_delay_ms),
            engine_cfg.max_resend_count,
        ));

        let mut listeners = Vec::with_capacity(self.config.server.listeners.len());
        for listener in &self.config.server.listeners {
            let socket = bind_listener(listener).map_err(socket_failure)?;
            info!(address = %socket.local_addr().map_err(socket_failure)?, "listener bound");
            listeners.push(Arc::new(socket));
        }

        let upstream_v4 = Arc::new(
            bind_upstream(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)).map_err(socket_failure)?,
        );
        let upstream_v6 = match bind_upstream(IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)) {
            Ok(socket) => Some(Arc::new(socket)),
            Err(err) => {
                debug!(error = %err, "IPv6 upstream socket unavailable");
                None
            }
        };

        let io = Arc::new(IoCtx {
            engine,
            listeners,
            upstream_v4,
            upstream_v6,
        });

        let mut tasks = Vec::new();
        for index in 0..io.listeners.len() {
            // max_threads sizes the pools; the worker count is the
            // configured starting count, there is no growth between them.
            for worker in 0..engine_cfg.initial_threads as usize {
                let ctx = io.clone();
                tasks.push(tokio::spawn(async move {
                    run_listener(ctx, index, worker).await;
                }));
            }
        }
        {
            let ctx = io.clone();
            tasks.push(tokio::spawn(async move {
                run_upstream_reader(ctx, false).await;
            }));
        }
        if io.upstream_v6.is_some() {
            let ctx = io.clone();
            tasks.push(tokio::spawn(async move {
                run_upstream_reader(ctx, true).await;
            }));
        }
        {
            let ctx = io.clone();
            let tick = resend_tick_interval(engine_cfg.resend_delay_ms);
            tasks.push(tokio::spawn(async move {
                run_resend_clock(ctx, tick).await;
            }));
        }

        Ok(RunningState { io, tasks })
    }

    /// Stops listening and discards all in-flight cycles and tracked
    /// outgoing queries.
    ///
    /// Invalid while a `listen` call is still binding, and invalid when not
    /// listening (double pause).
    pub fn pause(&mut self) -> Result<(), EngineError> {
        if self.binding {
            return Err(EngineError::InvalidPause);
        }
        let running = self.running.take().ok_or(EngineError::InvalidPause)?;
        for task in &running.tasks {
            task.abort();
        }
        running.io.engine.abandon_all();
        info!("server paused; pending exchanges discarded");
        Ok(())
    }
}

fn socket_failure(err: io::Error) -> EngineError {
    EngineError::SocketFailure(err.to_string())
}

/// Resend deadlines are checked on a clock finer than the delay itself so
/// exhaustion is observed close to when it happens.
fn resend_tick_interval(resend_delay_ms: u64) -> Duration {
    Duration::from_millis((resend_delay_ms / 4).max(10))
}

fn bind_listener(listener: &ListenerConfig) -> io::Result<UdpSocket> {
    let ip: IpAddr = listener
        .address
        .parse()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid listener address"))?;
    let matches_family = match listener.family {
        NetworkFamily::Inet4 => ip.is_ipv4(),
        NetworkFamily::Inet6 => ip.is_ipv6(),
    };
    if !matches_family {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "listener family does not match address",
        ));
    }
    bind_udp(SocketAddr::new(ip, listener.port))
}

fn bind_upstream(ip: IpAddr) -> io::Result<UdpSocket> {
    bind_udp(SocketAddr::new(ip, 0))
}

fn bind_udp(addr: SocketAddr) -> io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_recv_buffer_size(512 * 1024)?;
    socket.set_send_buffer_size(512 * 1024)?;
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

async fn run_listener(ctx: Arc<IoCtx>, index: usize, worker: usize) {
    let socket = ctx.listeners[index].clone();
    let mut buf = [0u8; RECV_BUF_LEN];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((n, peer)) => {
                let datagram = buf[..n].to_vec();
                match ctx.engine.begin_cycle(index, peer, datagram, Instant::now()) {
                    Ok(out) => dispatch(&ctx, out),
                    Err(EngineError::PoolExhausted) => {
                        debug!(listener = index, %peer, "cycle pool full; dropping query");
                    }
                    Err(err) => {
                        debug!(listener = index, %peer, error = %err, "dropping inbound datagram");
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!(listener = index, worker, error = %e, "UDP recv error");
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn run_upstream_reader(ctx: Arc<IoCtx>, v6: bool) {
    let socket = if v6 {
        match &ctx.upstream_v6 {
            Some(socket) => socket.clone(),
            None => return,
        }
    } else {
        ctx.upstream_v4.clone()
    };
    let mut buf = [0u8; RECV_BUF_LEN];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((n, from)) => {
                trace!(%from, len = n, "upstream datagram");
                let out = ctx.engine.on_upstream_datagram(buf[..n].to_vec(), Instant::now());
                dispatch(&ctx, out);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!(error = %e, "upstream recv error");
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

async fn run_resend_clock(ctx: Arc<IoCtx>, tick: Duration) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let out = ctx.engine.on_resend_tick(Instant::now());
        dispatch(&ctx, out);
    }
}

/// Performs the engine's requested I/O. Sends are best-effort; a datagram
/// that cannot be sent right now is dropped, the resend clock covers the
/// upstream side.
fn dispatch(ctx: &Arc<IoCtx>, transmits: Vec<Transmit>) {
    for transmit in transmits {
        match transmit {
            Transmit::Response {
                listener,
                peer,
                packet,
            } => {
                let Some(socket) = ctx.listeners.get(listener) else {
                    continue;
                };
                if let Err(e) = socket.try_send_to(&packet, peer) {
                    debug!(%peer, error = %e, "response send failed");
                }
            }
            Transmit::Upstream {
                destination,
                packet,
            } => {
                send_upstream(ctx, destination, &packet);
            }
            Transmit::Timer { cycle, delay } => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let out = ctx.engine.on_timer(cycle, Instant::now());
                    dispatch(&ctx, out);
                });
            }
        }
    }
}

fn send_upstream(ctx: &Arc<IoCtx>, destination: Destination, packet: &[u8]) {
    let socket = if destination.addr.is_ipv4() {
        &ctx.upstream_v4
    } else {
        match &ctx.upstream_v6 {
            Some(socket) => socket,
            None => {
                debug!(%destination, "no IPv6 upstream socket; dropping query");
                return;
            }
        }
    };
    if let Err(e) = socket.try_send_to(packet, destination.addr) {
        debug!(%destination, error = %e, "upstream send failed");
    }
}
