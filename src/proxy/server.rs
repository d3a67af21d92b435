//! Per-connection HTTP/1.1 handling: read one request, canonicalize its
//! content metadata, forward the canonical form, relay the response.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use bytes::Bytes;
use http::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::canon::{self, CanonError};
use crate::proxy::codec::{read_body, read_request_head};
use crate::proxy::forward::forward_request;
use crate::proxy::AppContext;

pub async fn handle_connection(stream: TcpStream, peer: SocketAddr, app: AppContext) -> Result<()> {
    let mut reader = BufReader::new(stream);

    let Some(head) = read_request_head(&mut reader, peer, &app.settings).await? else {
        return Ok(());
    };

    if let Some(header) = head
        .headers
        .iter()
        .find(|header| !header.value.is_ascii())
    {
        warn!(peer = %peer, header = %header.name, "non-ASCII header value");
        return reject(reader.get_mut(), peer, &CanonError::NonAsciiHeaderValue).await;
    }

    if head.has_transfer_encoding() {
        warn!(peer = %peer, "transfer-encoded request body refused");
        return respond(
            reader.get_mut(),
            StatusCode::LENGTH_REQUIRED,
            None,
            b"chunked request bodies are not supported\r\n",
        )
        .await;
    }

    let content_length = match head.content_length() {
        Ok(value) => value,
        Err(err) => {
            warn!(peer = %peer, error = %err, "invalid content-length header");
            return respond(
                reader.get_mut(),
                StatusCode::BAD_REQUEST,
                None,
                b"invalid Content-Length header\r\n",
            )
            .await;
        }
    };
    if let Some(length) = content_length
        && length > app.settings.max_request_body_size
    {
        warn!(peer = %peer, length, "request body exceeds limit");
        return respond(
            reader.get_mut(),
            StatusCode::PAYLOAD_TOO_LARGE,
            None,
            b"request body exceeds configured limit\r\n",
        )
        .await;
    }

    let body = match content_length {
        Some(length) => Some(
            read_body(&mut reader, length, app.settings.client_timeout(), peer).await?,
        ),
        None => None,
    };

    // Requests without a Content-Type have nothing to canonicalize and are
    // forwarded untouched.
    let normalized = match head.single_header("content-type") {
        Ok(Some(content_type)) => {
            match canon::normalize_request(
                &app.registry,
                content_type.as_bytes(),
                body.as_deref(),
            ) {
                Ok(normalized) => Some(normalized),
                Err(err) => {
                    warn!(peer = %peer, error = %err, "request rejected");
                    return reject(reader.get_mut(), peer, &err).await;
                }
            }
        }
        Ok(None) => None,
        Err(err) => {
            warn!(peer = %peer, error = %err, "ambiguous content-type header");
            return reject(reader.get_mut(), peer, &CanonError::DuplicateHeader(
                "content-type".to_string(),
            ))
            .await;
        }
    };

    let (content_type, outbound_body) = match &normalized {
        Some(normalized) => (
            Some(normalized.content_type.as_slice()),
            match &normalized.body {
                Some(canonical) => Some(Bytes::copy_from_slice(canonical)),
                None => body.clone(),
            },
        ),
        None => (None, body.clone()),
    };

    let relayed = forward_request(
        &app.settings,
        peer,
        &head,
        content_type,
        outbound_body.as_ref(),
        reader.get_mut(),
    )
    .await?;
    info!(
        peer = %peer,
        method = %head.method,
        target = %head.target,
        canonicalized = normalized.is_some(),
        response_bytes = relayed,
        "request completed"
    );
    Ok(())
}

/// HTTP 400 whose reason phrase names the canonicalization failure. The
/// original, non-canonical body is never forwarded.
async fn reject<C>(client: &mut C, peer: SocketAddr, err: &CanonError) -> Result<()>
where
    C: AsyncWrite + Unpin,
{
    let body = format!("{err}\r\n");
    respond(
        client,
        StatusCode::BAD_REQUEST,
        Some(err.reason()),
        body.as_bytes(),
    )
    .await
    .with_context(|| format!("rejecting request from {peer}"))
}

async fn respond<C>(
    client: &mut C,
    status: StatusCode,
    reason: Option<&str>,
    body: &[u8],
) -> Result<()>
where
    C: AsyncWrite + Unpin,
{
    let reason = reason
        .or_else(|| status.canonical_reason())
        .unwrap_or("Unknown");
    let mut response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status.as_u16(),
        reason,
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    client.write_all(&response).await?;
    client.flush().await?;
    Ok(())
}
