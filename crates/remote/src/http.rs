use reqwest::blocking::Response;
use reqwest::StatusCode;
use serde_json::Value;

use invoice_dedup_core::{DedupError, Result};

/// Timeouts, throttling and server-side failures are worth retrying;
/// anything else the caller sent wrong.
pub(crate) fn status_error(service: &str, status: StatusCode, body: &str) -> DedupError {
    let message = format!("{service} returned {status}: {}", truncate(body, 300));
    if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        DedupError::Transient(message)
    } else {
        DedupError::Fatal(message)
    }
}

pub(crate) fn send_error(service: &str, err: reqwest::Error) -> DedupError {
    if err.is_builder() || err.is_decode() {
        DedupError::Fatal(format!("{service} request failed: {err}"))
    } else {
        DedupError::Transient(format!("{service} request failed: {err}"))
    }
}

pub(crate) fn decode_json(service: &str, response: Response) -> Result<Value> {
    let status = response.status();
    let body = response
        .text()
        .map_err(|err| send_error(service, err))?;
    if !status.is_success() {
        return Err(status_error(service, status, &body));
    }
    serde_json::from_str(&body)
        .map_err(|err| DedupError::Fatal(format!("{service} returned invalid json: {err}")))
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_and_server_errors_are_transient() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert!(status_error("ocr", status, "").is_transient(), "{status}");
        }
    }

    #[test]
    fn client_errors_are_fatal() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_FOUND,
        ] {
            assert!(!status_error("embedding", status, "").is_transient(), "{status}");
        }
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let err = status_error("ocr", StatusCode::BAD_REQUEST, &body);
        assert!(err.to_string().len() < 400);
    }
}
