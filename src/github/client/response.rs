//! Turns raw GitHub responses into pages, rate-limit waits or errors.

use std::time::Duration;

use http::StatusCode;
use http::header::{HeaderMap, HeaderValue, LINK};
use serde_json::Value;

use crate::github::endpoint::Endpoint;
use crate::github::error::FetchError;
use crate::github::pagination::{Page, next_page_token};
use crate::github::rate_limit::{is_rate_limited, now_unix_seconds, rate_limit_wait};

/// Outcome of one HTTP exchange that is not an error.
#[derive(Debug, PartialEq)]
pub(super) enum Attempt {
    Page(Page),
    RateLimited(Duration),
}

/// Checks if a GitHub error status indicates an authentication failure.
const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Checks if an octocrab error represents a network/transport issue.
const fn is_network_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Http { .. }
            | octocrab::Error::Hyper { .. }
            | octocrab::Error::Service { .. }
    )
}

pub(super) fn map_transport_error(endpoint: &Endpoint, error: &octocrab::Error) -> FetchError {
    let endpoint_path = endpoint.path().to_owned();
    if let octocrab::Error::GitHub { source, .. } = error {
        return classify_status(endpoint_path, source.status_code, source.message.clone());
    }
    if is_network_error(error) {
        return FetchError::Network {
            endpoint: endpoint_path,
            message: error.to_string(),
        };
    }
    FetchError::Decode {
        endpoint: endpoint_path,
        message: error.to_string(),
    }
}

fn header_to_string(header_value: Option<&HeaderValue>) -> Option<String> {
    header_value
        .and_then(|raw| raw.to_str().ok())
        .map(ToOwned::to_owned)
}

fn extract_github_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return None;
    };
    value
        .get("message")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

fn classify_status(endpoint: String, status: StatusCode, message: String) -> FetchError {
    if status.is_server_error() {
        FetchError::Server {
            endpoint,
            status: status.as_u16(),
            message,
        }
    } else if is_auth_failure(status) {
        FetchError::Authentication {
            endpoint,
            status: status.as_u16(),
            message,
        }
    } else {
        FetchError::Status {
            endpoint,
            status: status.as_u16(),
            message,
        }
    }
}

fn decode_page(endpoint: &Endpoint, headers: &HeaderMap, body: &str) -> Result<Page, FetchError> {
    let value: Value = serde_json::from_str(body).map_err(|error| FetchError::Decode {
        endpoint: endpoint.path().to_owned(),
        message: error.to_string(),
    })?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        other => {
            return Err(FetchError::Decode {
                endpoint: endpoint.path().to_owned(),
                message: format!("expected a JSON array or object, got {other}"),
            });
        }
    };

    let next = header_to_string(headers.get(LINK)).and_then(|link| next_page_token(&link));
    Ok(Page::new(items, next))
}

/// Interprets a completed exchange.
pub(super) fn interpret_response(
    endpoint: &Endpoint,
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
) -> Result<Attempt, FetchError> {
    if status.is_success() {
        return decode_page(endpoint, headers, body).map(Attempt::Page);
    }

    let message = extract_github_message(body)
        .or_else(|| status.canonical_reason().map(ToOwned::to_owned))
        .unwrap_or_else(|| "unknown error".to_owned());

    if is_rate_limited(status, headers, &message) {
        return Ok(Attempt::RateLimited(rate_limit_wait(
            headers,
            now_unix_seconds(),
        )));
    }

    Err(classify_status(endpoint.path().to_owned(), status, message))
}
