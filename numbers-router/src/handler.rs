use crate::aggregator::Aggregator;
use crate::errors::Result;
use crate::response::{ApiError, HandlerBody, NumbersResponse, error_response, json_response};
use hyper::{Response, StatusCode, Uri};

/// Query parameter carrying one upstream URL. May be repeated.
pub const URL_PARAM: &str = "u";

/// Serves `/numbers`: merges the numbers of every upstream named in the query.
pub struct NumbersHandler {
    aggregator: Aggregator,
}

impl NumbersHandler {
    pub fn new(aggregator: Aggregator) -> Self {
        Self { aggregator }
    }

    pub async fn handle(&self, uri: &Uri) -> Result<Response<HandlerBody>> {
        let urls = upstream_urls(uri);
        if urls.is_empty() {
            let err = ApiError::invalid_request("no valid urls available");
            return Ok(error_response(StatusCode::BAD_REQUEST, &err));
        }

        let aggregation = self.aggregator.aggregate(&urls).await;

        if aggregation.all_failed {
            tracing::error!(
                error = %aggregation.failure_summary(),
                "all urls are invalid"
            );
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &NumbersResponse::default(),
            );
        }

        if !aggregation.failures.is_empty() {
            tracing::warn!(
                failed = aggregation.failures.len(),
                total = urls.len(),
                error = %aggregation.failure_summary(),
                "Some urls are invalid, their numbers are dropped"
            );
        }

        json_response(
            StatusCode::OK,
            &NumbersResponse {
                numbers: aggregation.numbers,
            },
        )
    }
}

/// Every `u` query value in order of appearance, percent-decoded.
/// Empty values are kept.
pub fn upstream_urls(uri: &Uri) -> Vec<String> {
    let Some(query) = uri.query() else {
        return Vec::new();
    };

    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == URL_PARAM)
        .map(|(_, value)| value.into_owned())
        .collect()
}
