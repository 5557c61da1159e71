use std::time::Duration;

use tracing::warn;

use crate::error::ApiResult;

/// Retry behaviour for mutation requests.
///
/// Retries cover network errors and 5xx responses. 4xx responses and
/// success return immediately; after the last delay the final outcome is
/// returned as-is.
pub struct RetryConfig {
    pub delays_ms: Vec<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delays_ms: vec![250, 500, 1000],
        }
    }
}

impl RetryConfig {
    /// No retries; used where a caller wants a single attempt.
    pub fn none() -> Self {
        Self { delays_ms: vec![] }
    }
}

pub async fn retry_request<F, Fut>(config: &RetryConfig, mut op: F) -> ApiResult<reqwest::Response>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let max_attempts = config.delays_ms.len() + 1;

    for attempt in 0..max_attempts {
        match op().await {
            Ok(resp) if resp.status().is_server_error() => {
                if attempt < config.delays_ms.len() {
                    warn!(
                        "request attempt {}/{} failed (HTTP {}), retrying in {}ms",
                        attempt + 1,
                        max_attempts,
                        resp.status(),
                        config.delays_ms[attempt],
                    );
                    tokio::time::sleep(Duration::from_millis(config.delays_ms[attempt])).await;
                } else {
                    return Ok(resp);
                }
            }
            Ok(resp) => return Ok(resp),
            Err(e) => {
                if attempt < config.delays_ms.len() {
                    warn!(
                        "request attempt {}/{} failed ({}), retrying in {}ms",
                        attempt + 1,
                        max_attempts,
                        e,
                        config.delays_ms[attempt],
                    );
                    tokio::time::sleep(Duration::from_millis(config.delays_ms[attempt])).await;
                } else {
                    return Err(e.into());
                }
            }
        }
    }

    unreachable!()
}

#[cfg(test)]
mod tests {
    use super::{RetryConfig, retry_request};

    #[tokio::test]
    async fn transport_errors_retry_until_exhausted() {
        let client = reqwest::Client::new();
        let config = RetryConfig {
            delays_ms: vec![1, 1],
        };
        let mut attempts = 0;

        // Discard port; every attempt is refused.
        let result = retry_request(&config, || {
            attempts += 1;
            client.get("http://127.0.0.1:9/unreachable").send()
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn no_retries_means_one_attempt() {
        let client = reqwest::Client::new();
        let mut attempts = 0;

        let result = retry_request(&RetryConfig::none(), || {
            attempts += 1;
            client.get("http://127.0.0.1:9/unreachable").send()
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }
}
