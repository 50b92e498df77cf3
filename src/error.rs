use std::fmt;

/// Errors raised by the codec, transport, and dispatch layers.
///
/// `spec.md` §7 names exactly these five kinds and who raises them; the
/// worker (`server::worker`) is the only place that maps a `ProxyError` to
/// client-visible behavior.
#[derive(Debug)]
pub enum ProxyError {
    /// Header/status-line/chunk-size parsing failed.
    MalformedMessage(String),
    /// The peer closed the connection before a full message arrived.
    ConnectionClosed,
    /// A read on the client socket exceeded the configured timeout.
    ReadTimeout,
    /// Transport or parse failure while talking to an upstream node.
    UpstreamFailure(String),
    /// The configuration document failed to load or validate.
    ConfigError(String),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::MalformedMessage(msg) => write!(f, "malformed message: {msg}"),
            ProxyError::ConnectionClosed => write!(f, "connection closed by peer"),
            ProxyError::ReadTimeout => write!(f, "read timed out"),
            ProxyError::UpstreamFailure(msg) => write!(f, "upstream failure: {msg}"),
            ProxyError::ConfigError(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for ProxyError {}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
                ProxyError::ReadTimeout
            }
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe => ProxyError::ConnectionClosed,
            _ => ProxyError::UpstreamFailure(err.to_string()),
        }
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;
