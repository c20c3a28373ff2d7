use crate::errors::{NumbersRouterError, Result};
use http::header::{CONTENT_TYPE, HeaderValue};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use shared::http::make_boxed_error_response;

pub type HandlerBody = BoxBody<Bytes, NumbersRouterError>;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Body of a successful (or all-failed) `/numbers` response.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NumbersResponse {
    pub numbers: Vec<i64>,
}

/// Error payload returned to clients.
#[derive(thiserror::Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[error("code: {code}, message: {message}")]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: "invalid_request".to_string(),
            message: message.into(),
        }
    }

    /// Sent in place of any error that is not an `ApiError`.
    pub fn unknown() -> Self {
        Self {
            code: "unknown_error".to_string(),
            message: "An unexpected error happened".to_string(),
        }
    }
}

/// Serializes `value` as the JSON body of a response with `status`.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<HandlerBody>> {
    let bytes = serde_json::to_vec(value).map(Bytes::from)?;

    let mut response = Response::new(Full::new(bytes).map_err(|e| match e {}).boxed());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

    Ok(response)
}

/// Builds the JSON error response for `err`.
///
/// The first `ApiError` found in the source chain of `err` is sent as is,
/// anything else is reported as `unknown_error`. Server errors are logged.
pub fn error_response(
    status: StatusCode,
    err: &(dyn std::error::Error + 'static),
) -> Response<HandlerBody> {
    let api_error = std::iter::successors(Some(err), |e| e.source())
        .find_map(|e| e.downcast_ref::<ApiError>())
        .cloned()
        .unwrap_or_else(ApiError::unknown);

    if status.is_server_error() {
        tracing::error!(error = %err, status_code = status.as_u16(), "Unable to process request");
    }

    json_response(status, &api_error).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Unable to encode body as JSON");
        make_boxed_error_response(StatusCode::INTERNAL_SERVER_ERROR)
    })
}
