use std::io::Read;

use crate::error::{ProxyError, ProxyResult};

/// Bound on a single pull from the underlying connection (`spec.md` §4.1).
const READ_CHUNK: usize = 4096;

/// Pulls from `conn` into `buf` until `delim` occurs somewhere in `buf`.
///
/// Bytes read past the delimiter are left in `buf` for the caller to
/// consume later — this over-read is what lets the codec handle pipelined
/// arrivals where headers and the first body bytes land in one packet
/// (`spec.md` §4.1).
pub fn read_until<R: Read>(conn: &mut R, buf: &mut Vec<u8>, delim: &[u8]) -> ProxyResult<()> {
    while find(buf, delim).is_none() {
        pull(conn, buf)?;
    }
    Ok(())
}

/// Pulls from `conn` into `buf` until `buf` holds at least `n` bytes.
pub fn read_exact<R: Read>(conn: &mut R, buf: &mut Vec<u8>, n: usize) -> ProxyResult<()> {
    while buf.len() < n {
        pull(conn, buf)?;
    }
    Ok(())
}

fn pull<R: Read>(conn: &mut R, buf: &mut Vec<u8>) -> ProxyResult<()> {
    let mut chunk = [0u8; READ_CHUNK];
    let n = conn.read(&mut chunk)?;
    if n == 0 {
        return Err(ProxyError::ConnectionClosed);
    }
    buf.extend_from_slice(&chunk[..n]);
    Ok(())
}

pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
