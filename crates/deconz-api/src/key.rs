// Access key acquisition
//
// The gateway only issues a key while its link button is unlocked. Until
// someone presses it, `POST /api` answers 403. The fetcher polls with a
// fixed delay for a bounded number of retries.

use std::time::Duration;

use reqwest::Method;
use secrecy::SecretString;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::GatewayClient;
use crate::error::Error;
use crate::models::{GatewayReply, IssuedKey};

/// Delay between attempts while the link button is not pressed.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Obtains a one-time access key, retrying only on the forbidden answer.
///
/// Each [`fetch_with_retry`](Self::fetch_with_retry) call is independent;
/// nothing is remembered between invocations.
pub struct RetryingKeyFetcher<'a> {
    client: &'a GatewayClient,
    device_type: String,
    retry_delay: Duration,
    cancel: Option<CancellationToken>,
}

impl<'a> RetryingKeyFetcher<'a> {
    /// `device_type` is the application name the gateway records for the key.
    pub fn new(client: &'a GatewayClient, device_type: impl Into<String>) -> Self {
        Self {
            client,
            device_type: device_type.into(),
            retry_delay: DEFAULT_RETRY_DELAY,
            cancel: None,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Abort the wait between attempts when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Issue a single acquisition request.
    ///
    /// `POST /api` with `{"devicetype": ...}`; the key is
    /// `[0].success.username` of the reply.
    pub async fn attempt(&self) -> Result<SecretString, Error> {
        let body = json!({ "devicetype": self.device_type });
        let replies: Vec<GatewayReply> = self
            .client
            .request_unauthenticated(Method::POST, Some(&body))
            .await?;

        let first = replies.into_iter().next().ok_or_else(|| Error::Deserialization {
            message: "empty reply to key request".into(),
            body: "[]".into(),
        })?;

        if let Some(err) = first.error {
            return Err(Error::Api {
                kind: err.kind,
                description: err.description,
                address: err.address,
                status: 200,
            });
        }

        let success = first.success.unwrap_or_default();
        let issued: IssuedKey =
            serde_json::from_value(success.clone()).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: success.to_string(),
            })?;
        Ok(SecretString::from(issued.username))
    }

    /// Call [`attempt`](Self::attempt) until it succeeds, retrying up to
    /// `retries_left` more times while the gateway answers "forbidden".
    ///
    /// Any other failure propagates immediately. Running out of retries
    /// yields [`Error::LinkButtonNotPressed`].
    pub async fn fetch_with_retry(&self, retries_left: u32) -> Result<SecretString, Error> {
        let mut retries_left = retries_left;

        loop {
            match self.attempt().await {
                Ok(key) => {
                    info!("access key issued");
                    return Ok(key);
                }
                Err(e) if e.is_forbidden() => {
                    if retries_left == 0 {
                        return Err(Error::LinkButtonNotPressed);
                    }
                    retries_left -= 1;
                    debug!(
                        retries_left,
                        delay_ms = u64::try_from(self.retry_delay.as_millis()).unwrap_or(u64::MAX),
                        "link button not pressed yet, waiting"
                    );
                    self.wait().await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn wait(&self) -> Result<(), Error> {
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(Error::Cancelled),
                () = tokio::time::sleep(self.retry_delay) => Ok(()),
            },
            None => {
                tokio::time::sleep(self.retry_delay).await;
                Ok(())
            }
        }
    }
}
