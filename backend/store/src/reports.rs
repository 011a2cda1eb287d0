//! Report files dropped into a directory by an external job.

use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use slackbud_commands::ReportSource;
use tracing::debug;

pub struct FsReportSource {
    dir: PathBuf,
    base_url: String,
}

impl FsReportSource {
    pub fn new(dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn summary_path(&self, account: &str) -> PathBuf {
        self.dir.join(format!("{account}_s3_bucket_summary.txt"))
    }
}

#[async_trait]
impl ReportSource for FsReportSource {
    async fn summary(&self, account: &str) -> Result<Option<String>> {
        let path = self.summary_path(account);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(?path, "No summary report");
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read {path:?}")),
        }
    }

    fn details_link(&self, account: &str) -> String {
        format!("{}/{account}_s3_bucket_details.txt", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_summary_reads_file_or_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dea_s3_bucket_summary.txt"), "12 buckets").unwrap();
        let reports = FsReportSource::new(dir.path(), "https://reports.example/s3/");

        assert_eq!(reports.summary("dea").await.unwrap().as_deref(), Some("12 buckets"));
        assert_eq!(reports.summary("net-eng").await.unwrap(), None);
        assert_eq!(
            reports.details_link("dea"),
            "https://reports.example/s3/dea_s3_bucket_details.txt"
        );
    }
}
