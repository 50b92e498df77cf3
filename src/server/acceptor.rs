//! Acceptor + worker pool (`spec.md` §4.5).

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};

use crate::config::Config;
use crate::init::shutdown::GracefulShutdown;
use crate::node::Node;
use crate::scheduler::Scheduler;

use super::worker;

/// Coarse poll interval for both the thread-cap wait and the non-blocking
/// accept loop (`spec.md` §4.5: "polling at a coarse interval (≈100 ms)").
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Listen backlog floor required by `spec.md` §6.
const BACKLOG: i32 = 100;

/// Binds the listen socket with `SO_REUSEADDR` and a backlog `>= 100`
/// (`spec.md` §6), using `socket2` since `std::net::TcpListener` does not
/// expose reuse-address configuration on all platforms.
fn bind(port: u16) -> Result<TcpListener> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
        .context("failed to create listen socket")?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

/// Runs the accept loop until shutdown is requested, then waits for every
/// spawned worker to finish (`spec.md` §4.5 "On shutdown").
pub fn serve(config: Config, shutdown: GracefulShutdown) -> Result<()> {
    let nodes: Vec<Arc<Node>> = config
        .nodes
        .iter()
        .map(|n| Arc::new(Node::new(n.host.clone(), n.port)))
        .collect();
    let scheduler = Arc::new(Scheduler::new(nodes));

    let max_threads = config.server.max_threads.max(1);
    let listener = bind(config.server.port)?;
    log::info!("listening on 0.0.0.0:{}", config.server.port);

    loop {
        if shutdown.is_shutting_down() {
            log::debug!("acceptor stopping due to shutdown request");
            break;
        }

        if shutdown.active_workers() >= max_threads {
            thread::sleep(POLL_INTERVAL);
            continue;
        }

        match listener.accept() {
            Ok((stream, peer)) => spawn_worker(stream, peer, &scheduler, &shutdown),
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                log::warn!("accept error: {e}");
                thread::sleep(POLL_INTERVAL);
            }
        }
    }

    log::debug!(
        "waiting for {} active workers to drain",
        shutdown.active_workers()
    );
    shutdown.wait_for_drain();
    Ok(())
}

/// Assigns a node before spawning, per `spec.md` §4.5 step 2: the acceptor
/// invokes the scheduler and hands the worker its node, rather than the
/// worker choosing for itself.
fn spawn_worker(
    stream: std::net::TcpStream,
    peer: SocketAddr,
    scheduler: &Arc<Scheduler>,
    shutdown: &GracefulShutdown,
) {
    let (node, index) = scheduler.choose_node();
    let scheduler = scheduler.clone();
    let guard = shutdown.register_worker();
    thread::Builder::new()
        .name(format!("worker-{peer}"))
        .spawn(move || {
            let _guard = guard;
            worker::serve_connection(stream, peer, node, index, &scheduler);
        })
        .expect("failed to spawn worker thread");
}
