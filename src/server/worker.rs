//! Per-connection request handling (`spec.md` §4.6).

use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ProxyError;
use crate::http::{codec, Request, Response};
use crate::node::Node;
use crate::scheduler::Scheduler;

/// Read timeout applied to the client socket so parsing can never hang
/// forever (`spec.md` §4.6 step 1).
const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Handles exactly one request on `stream`, then closes it. The proxy does
/// not implement client-side keep-alive even if requested
/// (`spec.md` §4.6: "Exactly one request is served per client connection").
///
/// `node`/`index` are the scheduler's assignment for this connection,
/// chosen by the acceptor before the worker thread was spawned
/// (`spec.md` §4.5 step 2) — the worker only reports the outcome back via
/// `scheduler.recompute_weight`.
pub fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    node: Arc<Node>,
    index: usize,
    scheduler: &Scheduler,
) {
    if let Err(e) = stream.set_read_timeout(Some(CLIENT_READ_TIMEOUT)) {
        log::warn!("peer={peer} failed to set read timeout: {e}");
        return;
    }
    stream.set_nodelay(true).ok();

    let mut request = match codec::parse_request(&mut stream) {
        Ok(request) => request,
        Err(ProxyError::ReadTimeout) => {
            log::warn!("peer={peer} timed out waiting for request");
            return;
        }
        Err(ProxyError::ConnectionClosed) => {
            // Client went away; nothing to log, nothing to respond with.
            return;
        }
        Err(ProxyError::MalformedMessage(msg)) => {
            log::warn!("peer={peer} malformed request: {msg}");
            return;
        }
        Err(other) => {
            log::warn!("peer={peer} failed to read request: {other}");
            return;
        }
    };

    log::info!("{} {}", request.method, request.url);

    overlay_proxy_headers(&mut request, peer);

    let mut response = match node.handle(&request) {
        Ok((response, latency)) => {
            scheduler.recompute_weight(index, latency.as_secs_f64().max(1e-6));
            response
        }
        Err(err) => {
            log::error!(
                "peer={peer} upstream {}:{} failed: {err}",
                node.host,
                node.port
            );
            Response::bad_gateway()
        }
    };

    overlay_response_headers(&mut response);

    if let Err(err) = codec::write_response(&mut stream, &mut response) {
        log::warn!("peer={peer} failed to write response: {err}");
    }
}

/// `spec.md` §4.6 step 3: the five proxy headers, derived from the
/// client's peer address and the original `Host` header.
fn overlay_proxy_headers(request: &mut Request, peer: SocketAddr) {
    let original_host = request.headers().get("Host").unwrap_or("").to_string();
    let peer_str = peer.to_string();

    request
        .headers_mut()
        .set("Forwarded", format!("for={peer_str}; proto=http; by={original_host}"));
    request.headers_mut().set("X-Forwarded-For", &peer_str);
    request.headers_mut().set("X-Forwarded-Host", &original_host);
    request.headers_mut().set("X-Forwarded-Proto", "http");
    request.headers_mut().set("Via", "generic loadbalancer/1.0");
}

/// `spec.md` §4.6 step 6: force connection close and re-frame chunked
/// upstream bodies as identity on the way out.
fn overlay_response_headers(response: &mut Response) {
    response.headers_mut().set("Connection", "close");
    response.headers_mut().remove("Transfer-Encoding");
}
