//! End-to-end coverage of the acceptor + worker pipeline against real
//! `TcpListener`s, without going through `main`/CLI/config-file loading.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use wrrproxy::init::shutdown::GracefulShutdown;
use wrrproxy::node::Node;
use wrrproxy::scheduler::Scheduler;
use wrrproxy::server::worker;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn spawn_upstream(response: &'static [u8]) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(response);
        }
    });
    port
}

fn spawn_proxy(scheduler: Arc<Scheduler>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        if let Ok((stream, peer)) = listener.accept() {
            let (node, index) = scheduler.choose_node();
            worker::serve_connection(stream, peer, node, index, &scheduler);
        }
    });
    port
}

/// S1: a plain GET through a single healthy node comes back as HTTP/1.1 200.
#[test]
fn simple_get_is_proxied() {
    init_logging();
    let upstream_port =
        spawn_upstream(b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 5\r\n\r\nhello");
    let scheduler = Arc::new(Scheduler::new(vec![Arc::new(Node::new(
        "127.0.0.1",
        upstream_port,
    ))]));
    let proxy_port = spawn_proxy(scheduler);

    let mut client = TcpStream::connect(("127.0.0.1", proxy_port)).unwrap();
    client
        .write_all(b"GET /greet HTTP/1.1\r\nHost: origin.example\r\n\r\n")
        .unwrap();
    let mut out = Vec::new();
    client.read_to_end(&mut out).unwrap();

    let text = String::from_utf8_lossy(&out);
    assert!(text.starts_with("HTTP/1.1 200"));
    assert!(text.ends_with("hello"));
}

/// S2: a chunked upstream response is re-framed as identity before it
/// reaches the client.
#[test]
fn chunked_upstream_response_is_reframed_as_identity() {
    init_logging();
    let upstream_port = spawn_upstream(
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n",
    );
    let scheduler = Arc::new(Scheduler::new(vec![Arc::new(Node::new(
        "127.0.0.1",
        upstream_port,
    ))]));
    let proxy_port = spawn_proxy(scheduler);

    let mut client = TcpStream::connect(("127.0.0.1", proxy_port)).unwrap();
    client
        .write_all(b"GET /stream HTTP/1.1\r\nHost: origin.example\r\n\r\n")
        .unwrap();
    let mut out = Vec::new();
    client.read_to_end(&mut out).unwrap();

    let text = String::from_utf8_lossy(&out);
    assert!(text.starts_with("HTTP/1.1 200"));
    assert!(!text.contains("Transfer-Encoding"));
    assert!(text.contains("Content-Length: 5"));
    assert!(text.ends_with("hello"));
}

/// S3: an unreachable upstream produces a synthetic 502 with an explicit
/// zero-length body, never a hung or dropped client connection.
#[test]
fn unreachable_upstream_yields_bad_gateway() {
    init_logging();
    let scheduler = Arc::new(Scheduler::new(vec![Arc::new(Node::new("127.0.0.1", 1))]));
    let proxy_port = spawn_proxy(scheduler);

    let mut client = TcpStream::connect(("127.0.0.1", proxy_port)).unwrap();
    client
        .write_all(b"GET / HTTP/1.1\r\nHost: origin.example\r\n\r\n")
        .unwrap();
    let mut out = Vec::new();
    client.read_to_end(&mut out).unwrap();

    let text = String::from_utf8_lossy(&out);
    assert!(text.starts_with("HTTP/1.1 502"));
    assert!(text.contains("Content-Length: 0"));
}

/// S6: a malformed request closes the client connection without ever
/// opening an upstream connection (the upstream never sees a byte).
#[test]
fn malformed_request_never_reaches_upstream() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let upstream_port = listener.local_addr().unwrap().port();
    let upstream_saw_bytes = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = upstream_saw_bytes.clone();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 16];
            if let Ok(n) = stream.read(&mut buf) {
                if n > 0 {
                    flag.store(true, std::sync::atomic::Ordering::SeqCst);
                }
            }
        }
    });

    let scheduler = Arc::new(Scheduler::new(vec![Arc::new(Node::new(
        "127.0.0.1",
        upstream_port,
    ))]));
    let proxy_port = spawn_proxy(scheduler);

    let mut client = TcpStream::connect(("127.0.0.1", proxy_port)).unwrap();
    client.write_all(b"this is not http\r\n\r\n").unwrap();
    let mut out = Vec::new();
    client.read_to_end(&mut out).unwrap();

    assert!(out.is_empty());
    thread::sleep(std::time::Duration::from_millis(50));
    assert!(!upstream_saw_bytes.load(std::sync::atomic::Ordering::SeqCst));
}

/// Draining a `GracefulShutdown` with no registered workers never blocks,
/// which the acceptor's shutdown path relies on after the accept loop exits.
#[test]
fn shutdown_drain_is_immediate_when_idle() {
    let shutdown = GracefulShutdown::new();
    shutdown.initiate();
    shutdown.wait_for_drain();
    assert!(shutdown.is_shutting_down());
}
