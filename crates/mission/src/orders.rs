//! Orders service collaborator
//!
//! After a confirmed payload release the runner tells the external orders
//! service that the order was delivered. The call is best-effort: callers log
//! a [`NotifyError`] and carry on.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Timeout applied to every orders service call
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Failure to reach or update the orders service
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Orders service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Orders service rejected update for {order_id}: {status} {body}")]
    Rejected {
        order_id: String,
        status: u16,
        body: String,
    },
}

/// Status-update interface of the orders service
#[async_trait]
pub trait OrdersNotifier: Send + Sync {
    /// Mark `order_id` as delivered
    async fn mark_delivered(&self, order_id: &str) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct StatusPatch<'a> {
    status: &'a str,
}

/// HTTP client for `PATCH {base}/api/orders/{id}`
#[derive(Debug, Clone)]
pub struct HttpOrdersClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOrdersClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(NOTIFY_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn order_url(&self, order_id: &str) -> String {
        format!("{}/api/orders/{}", self.base_url, order_id)
    }
}

#[async_trait]
impl OrdersNotifier for HttpOrdersClient {
    async fn mark_delivered(&self, order_id: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .patch(self.order_url(order_id))
            .json(&StatusPatch { status: "Delivered" })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(order_id, status = status.as_u16(), "orders service update rejected");
            return Err(NotifyError::Rejected {
                order_id: order_id.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        info!(order_id, "orders service updated: Delivered");
        Ok(())
    }
}
