//! Forwarding of a canonicalized request to the configured backend.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use crate::proxy::codec::RequestHead;
use crate::settings::Settings;
use crate::util::timeout_with_context;

/// Headers never forwarded: hop-by-hop, or replaced by canonical values.
const SKIPPED_HEADERS: &[&str] = &[
    "connection",
    "content-length",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
];

/// Serialize the outbound request head. The original header order and
/// casing are kept, except that the Content-Type value may be replaced by
/// its canonical form and Content-Length is recomputed for the body
/// actually sent.
fn build_request_head(
    head: &RequestHead,
    content_type: Option<&[u8]>,
    body_len: Option<usize>,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(head.method.as_bytes());
    out.push(b' ');
    out.extend_from_slice(head.target.as_bytes());
    out.push(b' ');
    out.extend_from_slice(head.version.as_bytes());
    out.extend_from_slice(b"\r\n");

    for header in &head.headers {
        if SKIPPED_HEADERS.contains(&header.lower_name()) {
            continue;
        }
        out.extend_from_slice(header.name.as_bytes());
        out.extend_from_slice(b": ");
        if header.lower_name() == "content-type" {
            if let Some(canonical) = content_type {
                out.extend_from_slice(canonical);
            } else {
                out.extend_from_slice(header.value.as_bytes());
            }
        } else {
            out.extend_from_slice(header.value.as_bytes());
        }
        out.extend_from_slice(b"\r\n");
    }
    if let Some(length) = body_len {
        out.extend_from_slice(format!("Content-Length: {length}\r\n").as_bytes());
    }
    out.extend_from_slice(b"Connection: close\r\n\r\n");
    out
}

/// Send the request to the backend and relay its response to the client
/// until the backend closes. Returns the number of response bytes relayed.
pub async fn forward_request<C>(
    settings: &Settings,
    peer: SocketAddr,
    head: &RequestHead,
    content_type: Option<&[u8]>,
    body: Option<&Bytes>,
    client: &mut C,
) -> Result<u64>
where
    C: AsyncWrite + Unpin,
{
    let backend = settings.backend.as_str();
    let stream = timeout_with_context(
        settings.backend_connect_timeout(),
        TcpStream::connect(backend),
        format!("connecting to backend {backend}"),
    )
    .await?;
    stream
        .set_nodelay(true)
        .with_context(|| format!("configuring backend connection to {backend}"))?;
    let mut upstream = BufReader::new(stream);

    let head_bytes = build_request_head(head, content_type, body.map(|body| body.len()));
    timeout_with_context(
        settings.backend_timeout(),
        upstream.get_mut().write_all(&head_bytes),
        format!("writing request head to backend {backend}"),
    )
    .await?;
    if let Some(body) = body {
        timeout_with_context(
            settings.backend_timeout(),
            upstream.get_mut().write_all(body),
            format!("writing request body to backend {backend}"),
        )
        .await?;
    }
    debug!(peer = %peer, backend, body_bytes = body.map(|b| b.len()), "request forwarded");

    relay_until_close(&mut upstream, client, settings, peer).await
}

async fn relay_until_close<S, C>(
    upstream: &mut BufReader<S>,
    client: &mut C,
    settings: &Settings,
    peer: SocketAddr,
) -> Result<u64>
where
    S: AsyncRead + Unpin,
    C: AsyncWrite + Unpin,
{
    let mut total = 0u64;
    let mut buffer = [0u8; 8192];
    loop {
        let read = timeout_with_context(
            settings.backend_timeout(),
            upstream.read(&mut buffer),
            "reading response from backend",
        )
        .await?;
        if read == 0 {
            break;
        }
        timeout_with_context(
            settings.client_timeout(),
            client.write_all(&buffer[..read]),
            format!("writing response to client {peer}"),
        )
        .await?;
        total = total.saturating_add(read as u64);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::codec::RequestHead;

    use crate::proxy::codec::HeaderLine;

    fn head_with(headers: &[(&str, &str)]) -> RequestHead {
        RequestHead {
            method: "POST".to_string(),
            target: "/u".to_string(),
            version: "HTTP/1.1".to_string(),
            headers: headers
                .iter()
                .map(|(name, value)| HeaderLine::new(*name, *value))
                .collect(),
        }
    }

    #[test]
    fn canonical_content_type_replaces_the_original_in_place() {
        let head = head_with(&[
            ("Host", "example.test"),
            ("Content-Type", "MULTIPART/form-data; junk=1; boundary=x"),
            ("X-Trace", "abc"),
        ]);
        let bytes = build_request_head(&head, Some(b"multipart/form-data; boundary=x"), Some(10));
        let text = String::from_utf8(bytes).expect("ascii");
        assert!(text.contains("Content-Type: multipart/form-data; boundary=x\r\n"));
        assert!(text.contains("X-Trace: abc\r\n"));
        assert!(text.contains("Content-Length: 10\r\n"));
        assert!(text.ends_with("Connection: close\r\n\r\n"));
    }

    #[test]
    fn hop_by_hop_and_stale_length_headers_are_dropped() {
        let head = head_with(&[
            ("Host", "example.test"),
            ("Content-Length", "999"),
            ("Connection", "keep-alive"),
        ]);
        let bytes = build_request_head(&head, None, None);
        let text = String::from_utf8(bytes).expect("ascii");
        assert!(!text.contains("999"));
        assert!(!text.contains("keep-alive"));
        assert!(text.starts_with("POST /u HTTP/1.1\r\nHost: example.test\r\n"));
    }
}
