//! In-memory collaborators for unit tests.
use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slackbud_core::{PermissionLevel, SlackResponse};

use crate::dispatch::{DeferredLauncher, DeferredTask, ResponseSink};
use crate::services::{HistoryEntry, HistoryStore, ReportSource, RoleDirectory, RoleEntry, UsageCounter};

#[derive(Default)]
pub struct MemoryRoles {
    roles: Mutex<HashMap<String, RoleEntry>>,
}

impl MemoryRoles {
    pub fn grant(&self, user_id: &str, level: PermissionLevel) {
        self.roles.lock().unwrap().insert(
            user_id.to_string(),
            RoleEntry {
                user_id: user_id.to_string(),
                user_name: user_id.to_lowercase(),
                level,
            },
        );
    }
}

#[async_trait]
impl RoleDirectory for MemoryRoles {
    async fn level_of(&self, user_id: &str) -> Result<PermissionLevel> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(user_id)
            .map(|e| e.level)
            .unwrap_or_default())
    }

    async fn set_level(&self, user_id: &str, user_name: &str, level: PermissionLevel) -> Result<()> {
        self.roles.lock().unwrap().insert(
            user_id.to_string(),
            RoleEntry {
                user_id: user_id.to_string(),
                user_name: user_name.to_string(),
                level,
            },
        );
        Ok(())
    }

    async fn remove(&self, user_id: &str) -> Result<bool> {
        Ok(self.roles.lock().unwrap().remove(user_id).is_some())
    }

    async fn list(&self) -> Result<Vec<RoleEntry>> {
        let mut entries: Vec<_> = self.roles.lock().unwrap().values().cloned().collect();
        entries.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(entries)
    }
}

#[derive(Default)]
pub struct MemoryUsage {
    counts: Mutex<HashMap<String, u64>>,
}

impl MemoryUsage {
    pub fn count(&self, key: &str) -> u64 {
        self.counts.lock().unwrap().get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl UsageCounter for MemoryUsage {
    async fn increment(&self, key: &str) -> Result<u64> {
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn top(&self, limit: usize) -> Result<Vec<(String, u64)>> {
        let mut all: Vec<_> = self.counts.lock().unwrap().iter().map(|(k, v)| (k.clone(), *v)).collect();
        all.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        all.truncate(limit);
        Ok(all)
    }
}

#[derive(Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryHistory {
    /// Oldest first.
    pub fn lines(&self, user_id: &str) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.command_line.clone())
            .collect()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn record(&self, user_id: &str, command_line: &str, at: DateTime<Utc>) -> Result<()> {
        self.entries.lock().unwrap().push(HistoryEntry {
            user_id: user_id.to_string(),
            command_line: command_line.to_string(),
            at,
        });
        Ok(())
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryReports {
    pub summaries: HashMap<String, String>,
}

#[async_trait]
impl ReportSource for MemoryReports {
    async fn summary(&self, account: &str) -> Result<Option<String>> {
        Ok(self.summaries.get(account).cloned())
    }

    fn details_link(&self, account: &str) -> String {
        format!("https://reports.example/{account}_s3_bucket_details.txt")
    }
}

#[derive(Default)]
pub struct RecordingLauncher {
    tasks: Mutex<Vec<DeferredTask>>,
}

impl RecordingLauncher {
    pub fn tasks(&self) -> Vec<DeferredTask> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeferredLauncher for RecordingLauncher {
    async fn launch(&self, task: DeferredTask) -> Result<()> {
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    posts: Mutex<Vec<(String, SlackResponse)>>,
}

impl RecordingSink {
    pub fn posts(&self) -> Vec<(String, SlackResponse)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseSink for RecordingSink {
    async fn post(&self, response_url: &str, response: &SlackResponse) -> Result<()> {
        self.posts.lock().unwrap().push((response_url.to_string(), response.clone()));
        Ok(())
    }
}
