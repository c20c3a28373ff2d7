use crate::errors::Result;
use crate::handler::NumbersHandler;
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT};
use crate::response::{HandlerBody, error_response};
use hyper::{Request, Response, StatusCode};
use shared::http::make_boxed_error_response;
use std::sync::Arc;
use std::time::Instant;

pub const NUMBERS_PATH: &str = "/numbers";

/// Router that dispatches incoming requests by path
#[derive(Clone)]
pub struct Router {
    numbers: Arc<NumbersHandler>,
}

impl Router {
    pub fn new(numbers: NumbersHandler) -> Self {
        Self {
            numbers: Arc::new(numbers),
        }
    }

    /// Routes a request and turns any internal error into an `unknown_error`
    /// response, recording duration and in-flight metrics on the way.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<HandlerBody> {
        let started = Instant::now();
        shared::gauge!(REQUESTS_INFLIGHT).increment(1.0);

        let response = match self.route(req).await {
            Ok(response) => response,
            Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e),
        };

        shared::gauge!(REQUESTS_INFLIGHT).decrement(1.0);
        shared::histogram!(REQUEST_DURATION, "status" => response.status().as_u16().to_string())
            .record(started.elapsed().as_secs_f64());

        response
    }

    /// Routes an incoming request to the appropriate handler
    pub async fn route<B>(&self, req: Request<B>) -> Result<Response<HandlerBody>> {
        let (parts, _) = req.into_parts();

        match parts.uri.path() {
            NUMBERS_PATH => {
                tracing::debug!(method = %parts.method, "Matched /numbers");
                self.numbers.handle(&parts.uri).await
            }
            path => {
                tracing::warn!(method = %parts.method, path, "No route matched");
                Ok(make_boxed_error_response(StatusCode::NOT_FOUND))
            }
        }
    }
}
