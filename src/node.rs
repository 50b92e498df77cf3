//! Upstream node abstraction (`spec.md` §4.3): owns at most one keep-alive
//! connection to a backend, issues a request, and reports a latency sample.

use std::net::TcpStream;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{ProxyError, ProxyResult};
use crate::http::{codec, Request, Response};

/// A configured upstream origin server.
///
/// The cached connection is guarded by its own mutex rather than relying on
/// the scheduler to serialize dispatches to the same node — `spec.md` §5
/// notes the scheduler does not guarantee that, so two concurrent clients
/// can legitimately be routed to the same node. Under contention, the
/// connection slot is simply left empty and fresh connections are opened;
/// correctness is preserved, pooling degrades.
pub struct Node {
    pub host: String,
    pub port: u16,
    connection: Mutex<Option<TcpStream>>,
}

impl Node {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connection: Mutex::new(None),
        }
    }

    /// Sends `request` upstream and returns the response together with the
    /// observed wall-clock latency, in seconds.
    ///
    /// The upstream method is the client's inbound method, not a hardcoded
    /// `GET` (`spec.md` §9 open question, resolved against the source bug).
    /// Latency is measured with a monotonic wall-clock source
    /// (`std::time::Instant`), since it must capture I/O wait, not CPU time.
    pub fn handle(&self, request: &Request) -> ProxyResult<(Response, Duration)> {
        let mut slot = self
            .connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.connect()?,
        };

        let mut upstream_request = Request::new(request.method.clone(), request.url.clone());
        upstream_request.message.headers = request.message.headers.clone();
        upstream_request.headers_mut().set("Connection", "close");
        upstream_request.headers_mut().set("Host", &self.host);

        let result = self.dispatch(&mut conn, &mut upstream_request);

        match result {
            Ok((response, latency)) => {
                if response.headers().wants_keep_alive() {
                    *slot = Some(conn);
                } else {
                    *slot = None;
                }
                Ok((response, latency))
            }
            Err(err) => {
                *slot = None;
                Err(err)
            }
        }
    }

    fn connect(&self) -> ProxyResult<TcpStream> {
        let conn = TcpStream::connect((self.host.as_str(), self.port))
            .map_err(|e| ProxyError::UpstreamFailure(e.to_string()))?;
        conn.set_nodelay(true).ok();
        Ok(conn)
    }

    fn dispatch(
        &self,
        conn: &mut TcpStream,
        request: &mut Request,
    ) -> ProxyResult<(Response, Duration)> {
        let start = Instant::now();
        codec::write_request(conn, request)?;
        let response = codec::parse_response(conn)?;
        let latency = start.elapsed();
        Ok((response, latency))
    }
}
