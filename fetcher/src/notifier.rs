use crate::config::Config;
use crate::error::NotifyError;
use crate::logging;
use reqwest::Client as HTTPClient;
use serde_json::{Value, json};

#[allow(async_fn_in_trait)]
pub trait Broadcaster {
    /// One delivery attempt, no retries.
    async fn broadcast(&self, text: &str) -> Result<(), NotifyError>;
}

/// Sends to every follower of a LINE Official Account.
pub struct LineBroadcaster {
    http_client: HTTPClient,
    url: String,
    token: Option<String>,
}

impl LineBroadcaster {
    pub fn new(http_client: HTTPClient, config: &Config) -> Self {
        Self {
            http_client,
            url: config.broadcast_url.clone(),
            token: config.line_token.clone(),
        }
    }
}

fn broadcast_payload(text: &str) -> Value {
    json!({
        "messages": [
            {
                "type": "text",
                "text": text,
            }
        ]
    })
}

impl Broadcaster for LineBroadcaster {
    async fn broadcast(&self, text: &str) -> Result<(), NotifyError> {
        let Some(token) = self.token.as_deref() else {
            return Err(NotifyError::MissingCredential);
        };

        let response = self
            .http_client
            .post(&self.url)
            .bearer_auth(token)
            .json(&broadcast_payload(text))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Delivery { status, body });
        }

        Ok(())
    }
}

/// Delivers `text` and reports whether it went out. Failures are logged here
/// and never propagate, so the caller can always continue.
pub async fn notify<B: Broadcaster>(broadcaster: &B, text: &str) -> bool {
    match broadcaster.broadcast(text).await {
        Ok(()) => {
            logging::Logger::new().info("notify.sent", "Broadcast delivered");
            true
        }
        Err(NotifyError::MissingCredential) => {
            logging::Logger::new().error(
                "notify.missing_credential",
                &NotifyError::MissingCredential,
                "Broadcast skipped: no channel access token configured",
            );
            false
        }
        Err(err) => {
            let mut logger = logging::Logger::new().error_text(err.to_string());
            if let NotifyError::Delivery { status, .. } = &err {
                logger = logger.status(*status);
            }
            logger.error("notify.failed", &err, "Broadcast failed");
            false
        }
    }
}
