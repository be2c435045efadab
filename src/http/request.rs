//! Incoming requests, parsed from the wire with [`httparse`].

use std::collections::HashMap;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::{Headers, Method};

/// Upper bound on header lines accepted in one request.
const HEADER_SLOTS: usize = 64;

#[derive(Debug, Error)]
pub enum RequestError {
    /// The head has not fully arrived yet; read more and retry.
    #[error("request head not yet complete")]
    Incomplete,

    #[error("malformed request head: {0}")]
    Parse(#[from] httparse::Error),

    #[error("request line has no {0}")]
    MissingField(&'static str),

    #[error("Content-Length is not a number")]
    InvalidContentLength,
}

/// A request as the router and handlers see it.
///
/// The path is percent-decoded and the query string is split into
/// parameters up front, so handlers only ever look things up.
///
/// ```
/// use demo_api::http::request::Request;
///
/// let raw = b"GET /api/articles?search=react%20hooks HTTP/1.1\r\nHost: localhost\r\n\r\n";
/// let (request, _) = Request::parse(raw).unwrap();
///
/// assert_eq!(request.method().as_str(), "GET");
/// assert_eq!(request.path(), "/api/articles");
/// assert_eq!(request.query_param("search"), Some("react hooks"));
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    minor_version: u8,
    headers: Headers,
    query: HashMap<String, String>,
    body: Bytes,
}

impl Request {
    /// Parses the head at the start of `buf`.
    ///
    /// Also returns where the body starts in `buf`. The returned request
    /// carries at most `Content-Length` bytes of body, fewer if the rest has
    /// not arrived yet; the caller compares against
    /// [`content_length`](Self::content_length) to know when to stop reading.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), RequestError> {
        let mut slots = [httparse::EMPTY_HEADER; HEADER_SLOTS];
        let mut head = httparse::Request::new(&mut slots);
        let httparse::Status::Complete(body_start) = head.parse(buf)? else {
            return Err(RequestError::Incomplete);
        };

        let method = head.method.ok_or(RequestError::MissingField("method"))?;
        let target = head.path.ok_or(RequestError::MissingField("target"))?;
        let minor_version = head.version.ok_or(RequestError::MissingField("version"))?;

        let mut headers = Headers::with_capacity(head.headers.len());
        head.headers
            .iter()
            .filter_map(|h| Some((h.name, std::str::from_utf8(h.value).ok()?)))
            .for_each(|(name, value)| headers.insert(name, value));

        let declared = match headers.get("content-length") {
            None => 0,
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| RequestError::InvalidContentLength)?,
        };
        let rest = &buf[body_start..];
        let body = Bytes::copy_from_slice(&rest[..declared.min(rest.len())]);

        let mut request = Self::from_parts(method, target, headers, body);
        request.minor_version = minor_version;
        Ok((request, body_start))
    }

    /// Assembles a request without going through the wire format.
    ///
    /// `target` may carry a query string, as on a request line.
    pub fn from_parts(
        method: impl AsRef<str>,
        target: &str,
        headers: Headers,
        body: impl Into<Bytes>,
    ) -> Self {
        let method = match method.as_ref().parse::<Method>() {
            Ok(method) => method,
            Err(never) => match never {},
        };
        let (raw_path, raw_query) = target.split_once('?').unwrap_or((target, ""));

        Self {
            method,
            path: percent_decode(raw_path),
            minor_version: 1,
            headers,
            query: query_pairs(raw_query),
            body: body.into(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Decoded path, query string excluded.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `1` for HTTP/1.1, `0` for HTTP/1.0.
    pub fn version(&self) -> u8 {
        self.minor_version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Decoded value of a query parameter. A bare `?flag` maps to `""`.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Whether the client wants the connection reused.
    ///
    /// An explicit `Connection` header decides; otherwise HTTP/1.1 keeps the
    /// connection open and HTTP/1.0 closes it.
    pub fn is_keep_alive(&self) -> bool {
        self.headers
            .get("connection")
            .map_or(self.minor_version == 1, |v| {
                v.trim().eq_ignore_ascii_case("keep-alive")
            })
    }

    pub fn content_length(&self) -> Option<usize> {
        self.headers.get("content-length")?.trim().parse().ok()
    }
}

/// Splits `a=1&b=2` into decoded pairs. `+` means space and the first
/// occurrence of a repeated key is kept.
fn query_pairs(query: &str) -> HashMap<String, String> {
    let mut pairs = HashMap::new();
    for segment in query.split('&').filter(|s| !s.is_empty()) {
        let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
        pairs
            .entry(form_decode(key))
            .or_insert_with(|| form_decode(value));
    }
    pairs
}

fn form_decode(raw: &str) -> String {
    percent_decode(&raw.replace('+', " "))
}

/// Decodes `%XX` escapes, leaving malformed ones as they are.
fn percent_decode(input: &str) -> String {
    let mut out = Vec::with_capacity(input.len());
    let mut rest = input.as_bytes();
    while let Some((&byte, tail)) = rest.split_first() {
        match (byte, tail) {
            (b'%', [hi, lo, ..]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                out.push((hex_digit(*hi) << 4) | hex_digit(*lo));
                rest = &tail[2..];
            }
            _ => {
                out.push(byte);
                rest = tail;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        _ => c - b'A' + 10,
    }
}
