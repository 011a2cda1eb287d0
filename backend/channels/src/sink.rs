use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use slackbud_commands::ResponseSink;
use slackbud_core::SlackResponse;
use tracing::{error, info};

/// POSTs responses to a Slack `response_url`.
pub struct HttpResponseSink {
    client: Client,
}

impl HttpResponseSink {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for HttpResponseSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseSink for HttpResponseSink {
    async fn post(&self, response_url: &str, response: &SlackResponse) -> Result<()> {
        let res = self
            .client
            .post(response_url)
            .json(response)
            .send()
            .await
            .context("POST response_url")?;

        if !res.status().is_success() {
            let err = res.text().await.unwrap_or_default();
            error!("[Slack] response_url POST failed: {}", err);
            anyhow::bail!("Slack response post failed: {}", err);
        }
        info!("[Slack] Posted deferred response");
        Ok(())
    }
}
