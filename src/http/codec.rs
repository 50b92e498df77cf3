//! HTTP/1.1 message codec: framing over a byte stream, header parsing and
//! canonicalization, and identity/chunked body encoding (`spec.md` §4.2).
//!
//! This is hand-rolled rather than built on a parsing crate such as
//! `httparse` — the codec's relaxed, first-colon-split header parser and
//! canonicalization rule are exactly what `spec.md` specifies, and a
//! stricter RFC-validating parser would reject or reshape things the spec
//! requires this proxy to accept (see `SPEC_FULL.md` §5.2).

use std::io::{Read, Write};

use super::message::{HttpMessage, Request, Response};
use super::reader::{find, read_exact, read_until};
use crate::error::{ProxyError, ProxyResult};

/// Max bytes per chunked-encoding segment when serializing (`spec.md` §4.2).
const MAX_CHUNK_SIZE: usize = 4096;

pub fn parse_request<R: Read>(conn: &mut R) -> ProxyResult<Request> {
    let mut buf = Vec::new();
    read_until(conn, &mut buf, b"\r\n")?;
    let line_end = find(&buf, b"\r\n").expect("read_until guarantees delimiter present");
    let line = decode(&buf[..line_end]);

    let mut parts = line.split(' ').filter(|s| !s.is_empty());
    let (method, url, version) = (|| {
        let method = parts.next()?;
        let url = parts.next()?;
        let version = parts.next()?;
        Some((method.to_string(), url.to_string(), version.to_string()))
    })()
    .ok_or_else(|| ProxyError::MalformedMessage(format!("bad request line: {line:?}")))?;

    let rest = buf[line_end + 2..].to_vec();
    let message = parse_message_body(conn, rest, version)?;

    Ok(Request {
        method,
        url,
        message,
    })
}

pub fn parse_response<R: Read>(conn: &mut R) -> ProxyResult<Response> {
    let mut buf = Vec::new();
    read_until(conn, &mut buf, b"\r\n")?;
    let line_end = find(&buf, b"\r\n").expect("read_until guarantees delimiter present");
    let line = decode(&buf[..line_end]);

    let mut parts = line.splitn(3, ' ');
    let version = parts
        .next()
        .ok_or_else(|| ProxyError::MalformedMessage(format!("bad status line: {line:?}")))?;
    let status_token = parts
        .next()
        .ok_or_else(|| ProxyError::MalformedMessage(format!("bad status line: {line:?}")))?;
    // reason phrase, if any, is intentionally ignored (`spec.md` §4.2).

    if status_token.len() != 3 || !status_token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProxyError::MalformedMessage(format!(
            "non-3-digit status code: {status_token:?}"
        )));
    }
    let status: u16 = status_token
        .parse()
        .map_err(|_| ProxyError::MalformedMessage(format!("bad status code: {status_token:?}")))?;

    let rest = buf[line_end + 2..].to_vec();
    let message = parse_message_body(conn, rest, version.to_string())?;

    Ok(Response { status, message })
}

/// Shared header/body parser (`spec.md` §4.2 "Shared header/body parser").
///
/// `pre` is whatever bytes were already read past the start-line terminator
/// (possibly nothing). Reads and parses the header block, then dispatches to
/// chunked or identity body framing.
fn parse_message_body<R: Read>(
    conn: &mut R,
    mut pre: Vec<u8>,
    version: String,
) -> ProxyResult<HttpMessage> {
    read_until(conn, &mut pre, b"\r\n\r\n")?;
    let header_end = find(&pre, b"\r\n\r\n").expect("read_until guarantees delimiter present");

    let mut message = HttpMessage::new();
    message.version = normalize_version(&version);

    for line in decode(&pre[..header_end]).split("\r\n").filter(|l| !l.is_empty()) {
        let colon = line.find(':').ok_or_else(|| {
            ProxyError::MalformedMessage(format!("header line missing ':': {line:?}"))
        })?;
        let name = line[..colon].trim();
        let value = line[colon + 1..].trim();
        message.headers.set(name, value);
    }

    let mut remainder = pre[header_end + 4..].to_vec();

    if message.headers.is_chunked() {
        message.body = read_chunked_body(conn, &mut remainder)?;
    } else if let Some(len) = message.headers.get("Content-Length") {
        let len: usize = len
            .trim()
            .parse()
            .map_err(|_| ProxyError::MalformedMessage(format!("bad Content-Length: {len:?}")))?;
        read_exact(conn, &mut remainder, len)?;
        message.body = remainder[..len].to_vec();
    } else {
        message.body = Vec::new();
    }

    Ok(message)
}

fn read_chunked_body<R: Read>(conn: &mut R, remainder: &mut Vec<u8>) -> ProxyResult<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        read_until(conn, remainder, b"\r\n")?;
        let line_end = find(remainder, b"\r\n").expect("read_until guarantees delimiter present");
        let header_line = decode(&remainder[..line_end]);
        let size_field = header_line
            .split(';')
            .next()
            .unwrap_or(&header_line)
            .trim();
        let chunk_size = usize::from_str_radix(size_field, 16).map_err(|_| {
            ProxyError::MalformedMessage(format!("bad chunk size: {size_field:?}"))
        })?;
        remainder.drain(..line_end + 2);

        read_exact(conn, remainder, chunk_size + 2)?;
        body.extend_from_slice(&remainder[..chunk_size]);
        remainder.drain(..chunk_size + 2);

        if chunk_size == 0 {
            break;
        }
    }
    Ok(body)
}

fn normalize_version(raw: &str) -> String {
    raw.trim()
        .strip_prefix("HTTP/")
        .unwrap_or(raw.trim())
        .to_string()
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Serializes a request start-line + headers + body onto `conn`
/// (`spec.md` §4.2 "Serialising a message").
pub fn write_request<W: Write>(conn: &mut W, req: &mut Request) -> ProxyResult<()> {
    set_length_header(&mut req.message);
    let start_line = format!(
        "{} {} HTTP/{}\r\n",
        req.method, req.url, req.message.version
    );
    write_message(conn, &start_line, &req.message)
}

/// Serializes a response start-line + headers + body onto `conn`.
pub fn write_response<W: Write>(conn: &mut W, resp: &mut Response) -> ProxyResult<()> {
    set_length_header(&mut resp.message);
    let start_line = format!("HTTP/{} {}\r\n", resp.message.version, resp.status);
    write_message(conn, &start_line, &resp.message)
}

fn set_length_header(message: &mut HttpMessage) {
    if !message.headers.is_chunked() {
        message
            .headers
            .set("Content-Length", message.body.len().to_string());
    }
}

fn write_message<W: Write>(conn: &mut W, start_line: &str, message: &HttpMessage) -> ProxyResult<()> {
    let mut head = String::with_capacity(start_line.len() + 256);
    head.push_str(start_line);
    for (name, value) in message.headers.iter() {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    conn.write_all(head.as_bytes())?;

    if message.headers.is_chunked() {
        for chunk in message.body.chunks(MAX_CHUNK_SIZE) {
            conn.write_all(format!("{:x}\r\n", chunk.len()).as_bytes())?;
            conn.write_all(chunk)?;
            conn.write_all(b"\r\n")?;
        }
        conn.write_all(b"0\r\n\r\n")?;
    } else {
        conn.write_all(&message.body)?;
    }
    Ok(())
}
