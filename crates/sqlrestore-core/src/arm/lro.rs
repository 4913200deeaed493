//! Long-running operation polling
//!
//! PUT and DELETE calls may finish asynchronously. The response then carries
//! either an `Azure-AsyncOperation` header pointing at a status resource, or a
//! `202 Accepted` with a `Location` header that keeps answering `202` until
//! the work is done. Both are polled here until a terminal state.

use reqwest::{Response, StatusCode};
use tokio::time::Instant;
use url::Url;

use super::ArmClient;
use super::wire::OperationStatus;
use crate::error::{CoreError, Result};

const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";
const LOCATION_HEADER: &str = "location";

/// Where to look for the outcome of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Tracking {
    /// The response was final
    Done,
    /// Poll a status resource
    AsyncOperation(Url),
    /// Poll until the location stops answering 202
    Location(Url),
    /// 202 with nothing to follow
    Accepted,
}

impl Tracking {
    pub(crate) fn from_response(response: &Response) -> Result<Self> {
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        if let Some(url) = header(ASYNC_OPERATION_HEADER) {
            return Ok(Tracking::AsyncOperation(Url::parse(&url)?));
        }
        if response.status() == StatusCode::ACCEPTED
            && let Some(url) = header(LOCATION_HEADER)
        {
            return Ok(Tracking::Location(Url::parse(&url)?));
        }
        if response.status() == StatusCode::ACCEPTED {
            return Ok(Tracking::Accepted);
        }
        Ok(Tracking::Done)
    }
}

impl ArmClient {
    /// Wait until the operation that produced `response` has finished
    ///
    /// A bare `202` is taken as done; callers that need more check the
    /// resource themselves.
    pub(crate) async fn wait_for_operation(&self, response: Response, what: &str) -> Result<()> {
        match Tracking::from_response(&response)? {
            Tracking::Done => Ok(()),
            Tracking::Accepted => {
                tracing::debug!(what, "Accepted without a status to follow");
                Ok(())
            }
            Tracking::AsyncOperation(url) => self.poll_async_operation(&url, what).await,
            Tracking::Location(url) => self.poll_location(&url, what).await,
        }
    }

    /// Wait until the deletion that produced `response` has finished
    ///
    /// A bare `202` is followed by reading `resource` until it answers 404.
    pub(crate) async fn wait_for_deletion(
        &self,
        response: Response,
        resource: &Url,
        what: &str,
    ) -> Result<()> {
        match Tracking::from_response(&response)? {
            Tracking::Accepted => self.poll_until_gone(resource, what).await,
            _ => self.wait_for_operation(response, what).await,
        }
    }

    async fn poll_until_gone(&self, url: &Url, what: &str) -> Result<()> {
        let start = Instant::now();
        let timeout = self.settings.lro_timeout();

        loop {
            if start.elapsed() > timeout {
                return Err(CoreError::OperationTimeout(timeout));
            }

            match self.send(reqwest::Method::GET, url.clone(), None).await {
                Ok(_) => {
                    tracing::debug!(what, elapsed = ?start.elapsed(), "Still present after delete");
                    tokio::time::sleep(self.settings.lro_interval()).await;
                }
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    async fn poll_async_operation(&self, url: &Url, what: &str) -> Result<()> {
        let start = Instant::now();
        let timeout = self.settings.lro_timeout();

        loop {
            if start.elapsed() > timeout {
                return Err(CoreError::OperationTimeout(timeout));
            }

            let status: OperationStatus = self.get_json(url.clone()).await?;
            tracing::debug!(what, status = %status.status, elapsed = ?start.elapsed(), "Polling operation");

            match status.status.to_lowercase().as_str() {
                "succeeded" => return Ok(()),
                "failed" | "canceled" | "cancelled" => {
                    let detail = status
                        .error
                        .and_then(|e| match (e.code, e.message) {
                            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
                            (code, message) => message.or(code),
                        })
                        .unwrap_or_else(|| format!("operation ended with status {}", status.status));
                    return Err(CoreError::OperationFailed(format!("{what}: {detail}")));
                }
                _ => tokio::time::sleep(self.settings.lro_interval()).await,
            }
        }
    }

    async fn poll_location(&self, url: &Url, what: &str) -> Result<()> {
        let start = Instant::now();
        let timeout = self.settings.lro_timeout();

        loop {
            if start.elapsed() > timeout {
                return Err(CoreError::OperationTimeout(timeout));
            }

            let response = self.send(reqwest::Method::GET, url.clone(), None).await?;
            tracing::debug!(what, status = %response.status(), elapsed = ?start.elapsed(), "Polling location");
            if response.status() != StatusCode::ACCEPTED {
                return Ok(());
            }
            tokio::time::sleep(self.settings.lro_interval()).await;
        }
    }
}
