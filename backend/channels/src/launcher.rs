//! Deferred launchers.
//!
//! `QueueLauncher` hands tasks to an in-process worker over a bounded tokio
//! channel. `HttpLauncher` POSTs a signed envelope to a worker endpoint
//! (usually this same server's tasks route, or another instance of it).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use slackbud_commands::{DeferredLauncher, DeferredTask, Dispatcher, TokenCodec};
use slackbud_logging::{AuditEvent, AuditLogger};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Header carrying the envelope signature on the tasks route.
pub const TASK_SIGNATURE_HEADER: &str = "x-slackbud-signature";

// ---------------------------------------------------------------------------
// In-process queue
// ---------------------------------------------------------------------------

pub struct QueueLauncher {
    tx: mpsc::Sender<DeferredTask>,
}

impl QueueLauncher {
    /// The receiver goes to [`spawn_worker`], or is drained by the caller.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DeferredTask>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl DeferredLauncher for QueueLauncher {
    async fn launch(&self, task: DeferredTask) -> Result<()> {
        // Never wait for room: a full queue fails the hand-off instead of
        // stalling the slash-command reply.
        self.tx
            .try_send(task)
            .map_err(|e| anyhow::anyhow!("deferred queue rejected task: {e}"))
    }
}

/// Run every queued task on its own tokio task until the queue closes.
pub fn spawn_worker(dispatcher: Arc<Dispatcher>, mut rx: mpsc::Receiver<DeferredTask>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Deferred worker started");
        while let Some(task) = rx.recv().await {
            let user_id = task.params.get("user_id").cloned().unwrap_or_default();
            AuditLogger::record(&user_id, AuditEvent::DeferredTask { task: task.task.clone() });
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                dispatcher.run_deferred(task).await;
            });
        }
        info!("Deferred worker stopped");
    })
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

const HTTP_ATTEMPTS: u32 = 3;

pub struct HttpLauncher {
    client: Client,
    worker_url: String,
    codec: TokenCodec,
    backoff: Duration,
}

impl HttpLauncher {
    pub fn new(worker_url: impl Into<String>, codec: TokenCodec) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            worker_url: worker_url.into(),
            codec,
            backoff: Duration::from_millis(250),
        }
    }

    async fn post_once(&self, body: &[u8], signature: &str) -> Result<()> {
        let res = self
            .client
            .post(&self.worker_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(TASK_SIGNATURE_HEADER, signature)
            .body(body.to_vec())
            .send()
            .await
            .with_context(|| format!("POST {}", self.worker_url))?;
        if !res.status().is_success() {
            let status = res.status();
            let err = res.text().await.unwrap_or_default();
            anyhow::bail!("worker answered {status}: {err}");
        }
        Ok(())
    }
}

#[async_trait]
impl DeferredLauncher for HttpLauncher {
    /// At-least-once: retried on failure, so the worker may see a task twice.
    async fn launch(&self, task: DeferredTask) -> Result<()> {
        let body = serde_json::to_vec(&task).context("serialize deferred task")?;
        let signature = self.codec.sign(&body)?;

        let mut last_err = None;
        for attempt in 1..=HTTP_ATTEMPTS {
            match self.post_once(&body, &signature).await {
                Ok(()) => {
                    debug!(task = %task.task, attempt, "Deferred task accepted by worker");
                    return Ok(());
                }
                Err(e) => {
                    warn!(task = %task.task, attempt, error = %e, "Deferred hand-off failed");
                    last_err = Some(e);
                    if attempt < HTTP_ATTEMPTS {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no attempt made")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str) -> DeferredTask {
        DeferredTask {
            task: name.to_string(),
            params: Default::default(),
        }
    }

    #[tokio::test]
    async fn queue_delivers_in_order() {
        let (launcher, mut rx) = QueueLauncher::new(4);
        launcher.launch(task("s3stats.summary")).await.unwrap();
        launcher.launch(task("cmd.history")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().task, "s3stats.summary");
        assert_eq!(rx.recv().await.unwrap().task, "cmd.history");
    }

    #[tokio::test]
    async fn full_queue_fails_fast() {
        let (launcher, _rx) = QueueLauncher::new(1);
        launcher.launch(task("a.b")).await.unwrap();
        assert!(launcher.launch(task("a.c")).await.is_err());
    }

    #[tokio::test]
    async fn closed_queue_is_an_error() {
        let (launcher, rx) = QueueLauncher::new(1);
        drop(rx);
        assert!(launcher.launch(task("a.b")).await.is_err());
    }

    #[tokio::test]
    async fn unreachable_worker_reports_failure() {
        let mut launcher = HttpLauncher::new("http://127.0.0.1:9/tasks", TokenCodec::new("s", 0));
        launcher.backoff = Duration::from_millis(1);
        assert!(launcher.launch(task("s3stats.summary")).await.is_err());
    }
}
