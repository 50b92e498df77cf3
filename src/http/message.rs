use std::collections::BTreeMap;

/// Case-insensitive header map keyed by canonical header-casing.
///
/// `spec.md` §3 requires "first letter and each post-hyphen letter upper,
/// rest lower" canonicalization on parse, and that later duplicate headers
/// overwrite earlier ones. A plain `BTreeMap<String, String>` keyed by the
/// already-canonicalized name gives both for free and keeps iteration order
/// deterministic, which the codec's serializer and the tests rely on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&canonicalize(name)).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(canonicalize(name), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&canonicalize(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&canonicalize(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True iff `Connection` is present and its value, lowercased, is
    /// "keep-alive" (`spec.md` §4.2 "Persistence signalling").
    pub fn wants_keep_alive(&self) -> bool {
        self.get("Connection")
            .is_some_and(|v| v.eq_ignore_ascii_case("keep-alive"))
    }

    /// True iff `Transfer-Encoding` is present and its value, lowercased,
    /// is "chunked".
    pub fn is_chunked(&self) -> bool {
        self.get("Transfer-Encoding")
            .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    }
}

/// Normalizes a header name to canonical casing, e.g. `content-length` and
/// `CONTENT-LENGTH` both become `Content-Length`.
pub fn canonicalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for ch in name.chars() {
        if upper_next {
            out.extend(ch.to_uppercase());
        } else {
            out.extend(ch.to_lowercase());
        }
        upper_next = ch == '-';
    }
    out
}

/// Shared shape behind `Request` and `Response` (`spec.md` §3, §9 "Dynamic
/// dispatch on message kind" — a plain embedded struct, not a base class).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpMessage {
    pub version: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl HttpMessage {
    /// Always materializes fresh, empty containers — there is no caller-
    /// supplied default to alias across instances (`spec.md` §9 "Shared
    /// mutable default-argument pitfall").
    pub fn new() -> Self {
        Self {
            version: "1.1".to_string(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }
}

impl Default for HttpMessage {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub message: HttpMessage,
}

impl Request {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            message: HttpMessage::new(),
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.message.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.message.headers
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub message: HttpMessage,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            message: HttpMessage::new(),
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.message.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.message.headers
    }

    /// The synthetic 502 from `spec.md` §6/§7: empty body, explicit
    /// `Content-Length: 0`, `Connection: close`.
    pub fn bad_gateway() -> Self {
        let mut resp = Response::new(502);
        resp.headers_mut().set("Content-Length", "0");
        resp.headers_mut().set("Connection", "close");
        resp
    }
}
