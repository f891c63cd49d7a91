// Resilient D-Bus connection handling with retry logic

use crate::error::Result;
use std::time::Duration;
use tokio::time::sleep;
use zbus::Connection;

/// Connection manager with automatic retry
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    max_retries: usize,
    retry_delay: Duration,
    connection_timeout: Duration,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl ConnectionManager {
    /// Create a new connection manager with custom settings
    pub fn new(max_retries: usize, retry_delay: Duration, connection_timeout: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            retry_delay,
            connection_timeout,
        }
    }

    /// Connect to the system bus
    pub async fn connect_system(&self) -> Result<Connection> {
        self.with_retry("system bus connection", || async {
            let conn = tokio::time::timeout(self.connection_timeout, Connection::system())
                .await
                .map_err(|_| anyhow::anyhow!("Connection timeout"))??;
            Ok(conn)
        })
        .await
    }

    /// Connect to a user manager's bus at the given address (`unix:path=/run/user/<uid>/bus`)
    pub async fn connect_address(&self, address: &str) -> Result<Connection> {
        self.with_retry("user bus connection", || async {
            let builder = zbus::connection::Builder::address(address)?;
            let conn = tokio::time::timeout(self.connection_timeout, builder.build())
                .await
                .map_err(|_| anyhow::anyhow!("Connection timeout"))??;
            Ok(conn)
        })
        .await
    }

    /// Execute an operation with automatic retry
    pub async fn with_retry<F, T, Fut>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        tracing::info!("Operation '{}' succeeded on attempt {}", operation_name, attempt);
                    }
                    return Ok(result);
                }
                Err(error) => {
                    tracing::warn!("Operation '{}' failed on attempt {}: {}", operation_name, attempt, error);
                    let permanent = should_not_retry(&error);
                    last_error = Some(error);

                    if permanent {
                        break;
                    }

                    if attempt < self.max_retries {
                        tracing::debug!("Retrying in {:?}...", self.retry_delay);
                        sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("'{}' ran zero attempts", operation_name)))
    }
}

/// Errors that will not go away by asking again
fn should_not_retry(error: &anyhow::Error) -> bool {
    let error_str = error.to_string().to_lowercase();

    [
        "permission denied",
        "access denied",
        "not found",
        "no such file",
        "authentication",
        "invalid argument",
        "invalid name",
    ]
    .iter()
    .any(|needle| error_str.contains(needle))
}
