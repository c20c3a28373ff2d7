use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Per-connection deadlines applied by [`serve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerTimeouts {
    /// From accept until the request head is fully read
    pub header_read: Duration,
    /// From the request head until the service returns its response
    pub response: Duration,
}

impl Default for ServerTimeouts {
    fn default() -> Self {
        Self {
            header_read: Duration::from_secs(5),
            response: Duration::from_secs(10),
        }
    }
}

/// Binds `host:port` and serves `service` on every accepted connection.
pub async fn run_http_service<S, E>(
    host: &str,
    port: u16,
    timeouts: ServerTimeouts,
    service: S,
) -> Result<(), E>
where
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, E>>, Error = E>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    E: From<io::Error> + std::error::Error + Send + Sync + 'static,
{
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!(host, port, "Listening");
    serve(listener, service, timeouts).await
}

/// Accept loop over an already bound listener.
///
/// Each connection is handed to its own task, so a slow client never blocks
/// the others. Returns only if accepting fails.
pub async fn serve<S, E>(listener: TcpListener, service: S, timeouts: ServerTimeouts) -> Result<(), E>
where
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, E>>, Error = E>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    E: From<io::Error> + std::error::Error + Send + Sync + 'static,
{
    let service_arc = Arc::new(ResponseTimeout {
        inner: service,
        timeout: timeouts.response,
    });

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let _ = stream.set_nodelay(true);
        let svc = service_arc.clone();

        tokio::spawn(async move {
            // Protocol detection reads before hyper's header timer starts,
            // so a silent client is cut off here.
            let mut first_byte = [0u8; 1];
            match tokio::time::timeout(timeouts.header_read, stream.peek(&mut first_byte)).await {
                Ok(Ok(read)) if read > 0 => {}
                _ => {
                    tracing::debug!(peer = %peer_addr, "Closing connection without a request");
                    return;
                }
            }

            let mut builder = Builder::new(TokioExecutor::new());
            builder
                .http1()
                .timer(TokioTimer::new())
                .header_read_timeout(timeouts.header_read);

            // Hand the connection to hyper; auto-detect h1/h2 on this socket
            if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                tracing::debug!(peer = %peer_addr, error = %e, "Connection closed with error");
            }
        });
    }
}

/// Fails the request, and with it the connection, when `inner` takes
/// longer than `timeout` to respond.
struct ResponseTimeout<S> {
    inner: S,
    timeout: Duration,
}

impl<S, E> Service<Request<Incoming>> for ResponseTimeout<S>
where
    S: Service<Request<Incoming>, Error = E>,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    E: From<io::Error> + Send + 'static,
{
    type Response = S::Response;
    type Error = E;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let path = req.uri().path().to_string();
        let response = self.inner.call(req);
        let timeout = self.timeout;

        Box::pin(async move {
            match tokio::time::timeout(timeout, response).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(path, timeout_ms = timeout.as_millis() as u64, "Response timed out");
                    Err(io::Error::new(io::ErrorKind::TimedOut, "response timed out").into())
                }
            }
        })
    }
}

/// Plain-text response carrying the canonical reason of `status`.
pub fn make_error_response(status: StatusCode) -> Response<Bytes> {
    let reason = status.canonical_reason().unwrap_or("Unknown error");
    let mut response = Response::new(Bytes::from(format!("{reason}\n")));
    *response.status_mut() = status;
    response
}

pub fn make_boxed_error_response<E: 'static>(status: StatusCode) -> Response<BoxBody<Bytes, E>> {
    make_error_response(status).map(|body| Full::new(body).map_err(|e| match e {}).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::service::service_fn;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn start_server(delay: Duration, timeouts: ServerTimeouts) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let service = service_fn(move |_req: Request<Incoming>| async move {
            tokio::time::sleep(delay).await;
            let body = Full::new(Bytes::from_static(b"ok\n"))
                .map_err(|e| match e {})
                .boxed();
            Ok::<_, io::Error>(Response::new(body))
        });
        tokio::spawn(serve(listener, service, timeouts));

        addr
    }

    fn short_timeouts() -> ServerTimeouts {
        ServerTimeouts {
            header_read: Duration::from_millis(200),
            response: Duration::from_millis(200),
        }
    }

    /// Sends `request` (if any) and reads until the server closes.
    async fn exchange(addr: SocketAddr, request: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request).await.unwrap();

        let mut received = Vec::new();
        let read = tokio::time::timeout(Duration::from_secs(2), stream.read_to_end(&mut received));
        assert!(read.await.is_ok(), "server kept the connection open");

        String::from_utf8_lossy(&received).into_owned()
    }

    #[tokio::test]
    async fn test_serves_requests() {
        let addr = start_server(Duration::ZERO, short_timeouts()).await;
        let reply = exchange(
            addr,
            b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;

        assert!(reply.starts_with("HTTP/1.1 200 OK"));
        assert!(reply.ends_with("ok\n"));
    }

    #[tokio::test]
    async fn test_silent_client_is_disconnected() {
        let addr = start_server(Duration::ZERO, short_timeouts()).await;
        assert_eq!(exchange(addr, b"").await, "");
    }

    #[tokio::test]
    async fn test_incomplete_request_head_is_disconnected() {
        let addr = start_server(Duration::ZERO, short_timeouts()).await;
        let reply = exchange(addr, b"GET / HTTP/1.1\r\nHost: local").await;
        assert!(!reply.contains("200 OK"));
    }

    #[tokio::test]
    async fn test_slow_response_is_cut_off() {
        let addr = start_server(Duration::from_secs(5), short_timeouts()).await;
        let reply = exchange(
            addr,
            b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(!reply.contains("200 OK"));
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = make_boxed_error_response::<std::io::Error>(StatusCode::NOT_FOUND);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"Not Found\n");
    }

    #[test]
    fn test_error_response_unknown_reason() {
        let status = StatusCode::from_u16(599).unwrap();
        let response = make_error_response(status);
        assert_eq!(response.status().as_u16(), 599);
        assert_eq!(response.body().as_ref(), b"Unknown error\n");
    }
}
