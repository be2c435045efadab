//! Tokio accept loop and per-connection HTTP/1.1 framing.
//!
//! Each connection runs on its own task and feeds complete requests to the
//! shared [`Service`]. Connections stay open between requests unless the
//! client opts out.

use std::future::Future;
use std::net::SocketAddr;

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::http::{
    REQUEST_ID_HEADER, StatusCode,
    request::{Request, RequestError},
    response::Response,
};
use crate::middleware::Service;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Largest request (headers plus body) buffered before answering 413 (1 MiB).
const MAX_REQUEST_SIZE: usize = 1024 * 1024;

const INITIAL_BUF_SIZE: usize = 4096;

/// Listening socket plus the accept loop.
///
/// ```no_run
/// use demo_api::{App, Server};
/// use demo_api::config::Config;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let app = App::new(&config);
///     let server = Server::bind(config.addr()).await?;
///     server.run(app.service()).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Fails with [`ServerError::Bind`] when the address is taken or invalid.
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Bound address; useful after binding to port `0`.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves until the process is terminated.
    pub async fn run(self, service: Service) -> Result<(), ServerError> {
        self.run_until(service, std::future::pending()).await
    }

    /// Serves until `shutdown` resolves. In-flight connections are left to
    /// finish on their own tasks; no new connections are accepted.
    pub async fn run_until<S>(self, service: Service, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()>,
    {
        info!(address = %self.local_addr, "listening");
        tokio::pin!(shutdown);

        loop {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                () = &mut shutdown => {
                    info!("shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
            };

            let (stream, peer_addr) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let service = service.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, service).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// What the bytes buffered so far amount to.
enum Frame {
    /// A full request; the second field is how many bytes it spans.
    Ready(Request, usize),
    NeedMore,
    Reject(StatusCode, String),
}

fn next_frame(buf: &[u8]) -> Frame {
    let (request, body_start) = match Request::parse(buf) {
        Ok(parsed) => parsed,
        Err(RequestError::Incomplete) if buf.len() > MAX_REQUEST_SIZE => {
            return Frame::Reject(StatusCode::PayloadTooLarge, TOO_LARGE.to_owned());
        }
        Err(RequestError::Incomplete) => return Frame::NeedMore,
        Err(e) => return Frame::Reject(StatusCode::BadRequest, format!("Bad Request: {e}")),
    };

    let body_len = request.content_length().unwrap_or(0);
    if body_len > MAX_REQUEST_SIZE {
        return Frame::Reject(StatusCode::PayloadTooLarge, TOO_LARGE.to_owned());
    }
    let span = body_start + body_len;
    if buf.len() < span {
        return Frame::NeedMore;
    }
    Frame::Ready(request, span)
}

const TOO_LARGE: &str = "Request entity too large";

/// Serves requests from one connection until the peer hangs up or either
/// side asks for `Connection: close`. Requests already buffered are answered
/// before the socket is read again.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    service: Service,
) -> std::io::Result<()> {
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        match next_frame(&buf) {
            Frame::Ready(request, span) => {
                let keep_alive = request.is_keep_alive();
                let response = service.handle(request).await.keep_alive(keep_alive);
                stream.write_all(&response.into_bytes()).await?;
                stream.flush().await?;
                buf.advance(span);

                if !keep_alive {
                    debug!(peer = %peer_addr, "closing connection on request");
                    return Ok(());
                }
                continue;
            }
            Frame::Reject(status, message) => {
                warn!(peer = %peer_addr, status = status.as_u16(), %message, "rejecting request");
                return reject(&mut stream, status, &message).await;
            }
            Frame::NeedMore => {}
        }

        if stream.read_buf(&mut buf).await? == 0 {
            debug!(peer = %peer_addr, "peer closed connection");
            return Ok(());
        }
    }
}

/// Answers a request that never reached the pipeline, then closes.
///
/// No middleware ran, so the request id is minted here.
async fn reject(stream: &mut TcpStream, status: StatusCode, message: &str) -> std::io::Result<()> {
    let request_id = Uuid::new_v4().to_string();
    let response = Response::json(
        status,
        &serde_json::json!({
            "statusCode": status.as_u16(),
            "error": status.canonical_reason(),
            "message": message,
            "requestId": &request_id,
        }),
    )
    .header(REQUEST_ID_HEADER, request_id)
    .keep_alive(false);
    stream.write_all(&response.into_bytes()).await?;
    stream.flush().await
}
