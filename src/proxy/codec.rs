//! Line-oriented reading of an HTTP/1.1 request head from the client,
//! with per-read timeouts and size limits so a slow or oversized client
//! cannot pin a connection task.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Result, anyhow, bail, ensure};
use bytes::{Bytes, BytesMut};
use http::header::HeaderName;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::settings::Settings;
use crate::util::timeout_with_context;

/// One request header line with its original casing kept for passthrough.
#[derive(Debug, Clone)]
pub struct HeaderLine {
    pub name: String,
    pub value: String,
    lower_name: String,
}

impl HeaderLine {
    pub(crate) fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let lower_name = name.to_ascii_lowercase();
        Self {
            name,
            value: value.into(),
            lower_name,
        }
    }

    pub fn lower_name(&self) -> &str {
        &self.lower_name
    }
}

/// Parsed request line plus headers, as received. Header order and casing
/// are preserved so non-canonicalized headers can be forwarded unmodified.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    pub version: String,
    pub headers: Vec<HeaderLine>,
}

impl RequestHead {
    /// Look up a header that must occur at most once.
    pub fn single_header(&self, lower_name: &str) -> Result<Option<&str>> {
        let mut found = None;
        for header in &self.headers {
            if header.lower_name() == lower_name {
                ensure!(found.is_none(), "duplicate {lower_name} header");
                found = Some(header.value.as_str());
            }
        }
        Ok(found)
    }

    pub fn content_length(&self) -> Result<Option<usize>> {
        let Some(value) = self.single_header("content-length")? else {
            return Ok(None);
        };
        let length = value
            .parse::<usize>()
            .map_err(|_| anyhow!("invalid Content-Length '{value}'"))?;
        Ok(Some(length))
    }

    pub fn has_transfer_encoding(&self) -> bool {
        self.headers
            .iter()
            .any(|header| header.lower_name() == "transfer-encoding")
    }
}

/// Read one CRLF-terminated line, enforcing `max_len` and an idle timeout
/// per read.
pub async fn read_line_with_timeout<S>(
    reader: &mut BufReader<S>,
    buf: &mut String,
    timeout_dur: Duration,
    peer: SocketAddr,
    max_len: usize,
) -> Result<usize>
where
    S: AsyncRead + Unpin,
{
    ensure!(max_len > 0, "line length limit must be greater than zero");
    buf.clear();
    let mut collected = Vec::new();

    loop {
        let available = timeout_with_context(
            timeout_dur,
            reader.fill_buf(),
            format!("reading line from {peer}"),
        )
        .await?;

        if available.is_empty() {
            if collected.is_empty() {
                return Ok(0);
            }
            bail!("connection closed while reading line from {peer}");
        }

        let newline_pos = available.iter().position(|byte| *byte == b'\n');
        let consume = newline_pos.map(|idx| idx + 1).unwrap_or(available.len());

        if collected.len() + consume > max_len {
            bail!("line from {peer} exceeds configured limit of {max_len} bytes");
        }

        collected.extend_from_slice(&available[..consume]);
        reader.consume(consume);

        if newline_pos.is_some() {
            break;
        }
    }

    let string = String::from_utf8(collected)
        .map_err(|_| anyhow!("line from {peer} contained invalid bytes"))?;
    let len = string.len();
    *buf = string;
    Ok(len)
}

/// Read the request line and header block. Returns `None` on a clean EOF
/// before any bytes arrive.
pub async fn read_request_head<S>(
    reader: &mut BufReader<S>,
    peer: SocketAddr,
    settings: &Settings,
) -> Result<Option<RequestHead>>
where
    S: AsyncRead + Unpin,
{
    let timeout_dur = settings.client_timeout();
    let mut line = String::new();

    let read = read_line_with_timeout(
        reader,
        &mut line,
        timeout_dur,
        peer,
        settings.max_line_size,
    )
    .await?;
    if read == 0 {
        return Ok(None);
    }

    let request_line = line.trim_end_matches(['\r', '\n']);
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        bail!("malformed request line '{request_line}' from {peer}");
    };
    ensure!(
        version.starts_with("HTTP/"),
        "unsupported protocol version '{version}' from {peer}"
    );
    let mut head = RequestHead {
        method: method.to_string(),
        target: target.to_string(),
        version: version.to_string(),
        headers: Vec::new(),
    };

    let mut total_header_bytes = read;
    loop {
        let read = read_line_with_timeout(
            reader,
            &mut line,
            timeout_dur,
            peer,
            settings.max_line_size,
        )
        .await?;
        if read == 0 {
            bail!("connection from {peer} closed before end of headers");
        }
        total_header_bytes += read;
        ensure!(
            total_header_bytes <= settings.max_header_size,
            "request head from {peer} exceeds {} bytes",
            settings.max_header_size
        );

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            return Ok(Some(head));
        }
        ensure!(
            head.headers.len() < settings.max_header_count,
            "request from {peer} has more than {} headers",
            settings.max_header_count
        );

        let (name, value) = trimmed
            .split_once(':')
            .ok_or_else(|| anyhow!("header missing ':' separator"))?;
        let name = name.trim();
        let value = value.trim();
        ensure!(!name.is_empty(), "header name must not be empty");
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| anyhow!("invalid header name '{name}'"))?;
        head.headers.push(HeaderLine::new(name, value));
    }
}

/// Read a fixed-length request body.
pub async fn read_body<S>(
    reader: &mut BufReader<S>,
    length: usize,
    timeout_dur: Duration,
    peer: SocketAddr,
) -> Result<Bytes>
where
    S: AsyncRead + Unpin,
{
    let mut body = BytesMut::zeroed(length);
    timeout_with_context(
        timeout_dur,
        reader.read_exact(&mut body),
        format!("reading request body from {peer}"),
    )
    .await?;
    Ok(body.freeze())
}
