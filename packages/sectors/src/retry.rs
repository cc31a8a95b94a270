//! HTTP retry helper for transient sector-layer errors.
//!
//! Sector queries sit on the request path, so the retry budget is small:
//! a couple of quick retries with exponential backoff, all of it bounded
//! by the caller's overall timeout.

use std::time::Duration;

use crate::SectorError;

/// Maximum number of retry attempts for transient HTTP errors.
const MAX_RETRIES: u32 = 2;

/// Base backoff delay; doubles on every attempt (500ms, 1s).
const BASE_DELAY: Duration = Duration::from_millis(500);

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (builders are consumed by `.send()`).
/// Connection errors, timeouts, HTTP 429 and HTTP 5xx are retried; other
/// 4xx responses are permanent.
///
/// # Errors
///
/// Returns [`SectorError`] if the request fails after all retries, the
/// server returns a non-retryable status, or the body is not valid JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, SectorError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request).await?;
    let url = response.url().to_string();
    let status = response.status();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        log::warn!(
            "JSON parse failed\n  url: {url}\n  status: {status}\n  \
             received: {} bytes\n  parse error: {e}\n  body preview: {}",
            text.len(),
            preview(&text)
        );
        SectorError::Json(e)
    })
}

#[allow(clippy::future_not_send)]
async fn send_inner<F>(build_request: &F) -> Result<reqwest::Response, SectorError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = BASE_DELAY * (1 << (attempt - 1));
            log::warn!("  retry {attempt}/{MAX_RETRIES} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < MAX_RETRIES {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(SectorError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if attempt < MAX_RETRIES {
                        log::warn!("  HTTP {status}");
                        attempt += 1;
                        continue;
                    }
                    return Err(SectorError::Layer {
                        message: format!("HTTP {status} after {MAX_RETRIES} retries"),
                    });
                }

                if status.is_client_error() {
                    return Err(SectorError::Layer {
                        message: format!("HTTP {status}"),
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

fn preview(text: &str) -> &str {
    if text.len() <= BODY_PREVIEW_LEN {
        return text;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
