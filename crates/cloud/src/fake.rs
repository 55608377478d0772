// SPDX-License-Identifier: MIT

//! In-memory [`CloudApi`] for exercising the Event Source, Drain
//! Coordinator, Lifecycle Postponer, and Cluster-State Gate without real
//! AWS calls.

use crate::error::CloudApiError;
use crate::types::{LifecycleActionResult, QueueMessage};
use crate::CloudApi;
use async_trait::async_trait;
use escp_core::LifecycleHookDescription;
use parking_lot::Mutex;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct State {
    queue: VecDeque<QueueMessage>,
    deleted: Vec<String>,
    hook_descriptions: std::collections::HashMap<(String, String), LifecycleHookDescription>,
    heartbeats: Vec<(String, String, String, String)>,
    completions: Vec<(String, String, String, String, LifecycleActionResult)>,
    suspended_processes: std::collections::HashMap<String, BTreeSet<String>>,
    next_token_is_stale: bool,
}

/// Fake cloud platform for tests.
#[derive(Default, Clone)]
pub struct FakeCloudApi {
    state: Arc<Mutex<State>>,
}

impl FakeCloudApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, receipt_handle: impl Into<String>, body: impl Into<String>) {
        self.state.lock().queue.push_back(QueueMessage { receipt_handle: receipt_handle.into(), body: body.into() });
    }

    pub fn deleted_receipt_handles(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }

    pub fn set_hook_description(&self, group: &str, hook: &str, desc: LifecycleHookDescription) {
        self.state.lock().hook_descriptions.insert((group.to_string(), hook.to_string()), desc);
    }

    pub fn heartbeats(&self) -> Vec<(String, String, String, String)> {
        self.state.lock().heartbeats.clone()
    }

    pub fn completions(&self) -> Vec<(String, String, String, String, LifecycleActionResult)> {
        self.state.lock().completions.clone()
    }

    pub fn suspended_processes(&self, group: &str) -> BTreeSet<String> {
        self.state.lock().suspended_processes.get(group).cloned().unwrap_or_default()
    }

    /// Cause the next heartbeat call to return the "no active lifecycle
    /// action" validation error, simulating the platform having already
    /// timed the action out (§4.4 step 3).
    pub fn expire_next_heartbeat(&self) {
        self.state.lock().next_token_is_stale = true;
    }
}

#[async_trait]
impl CloudApi for FakeCloudApi {
    async fn receive_messages(
        &self,
        _queue_url: &str,
        max_messages: i32,
        _wait_time_seconds: i32,
    ) -> Result<Vec<QueueMessage>, CloudApiError> {
        let mut state = self.state.lock();
        let mut out = Vec::new();
        for _ in 0..max_messages.max(0) {
            match state.queue.pop_front() {
                Some(m) => out.push(m),
                None => break,
            }
        }
        Ok(out)
    }

    async fn delete_messages(&self, _queue_url: &str, receipt_handles: Vec<String>) -> Result<(), CloudApiError> {
        self.state.lock().deleted.extend(receipt_handles);
        Ok(())
    }

    async fn describe_lifecycle_hooks(&self, group: &str, hook: &str) -> Result<LifecycleHookDescription, CloudApiError> {
        let state = self.state.lock();
        Ok(state.hook_descriptions.get(&(group.to_string(), hook.to_string())).copied().unwrap_or(
            LifecycleHookDescription { heartbeat_timeout: Duration::from_secs(3600), global_timeout: Duration::from_secs(172_800) },
        ))
    }

    async fn record_lifecycle_heartbeat(
        &self,
        group: &str,
        hook: &str,
        token: &str,
        instance_id: &str,
    ) -> Result<(), CloudApiError> {
        let mut state = self.state.lock();
        if state.next_token_is_stale {
            state.next_token_is_stale = false;
            return Err(CloudApiError::Validation(format!(
                "No active Lifecycle Action found with token {token}"
            )));
        }
        state.heartbeats.push((group.to_string(), hook.to_string(), token.to_string(), instance_id.to_string()));
        Ok(())
    }

    async fn complete_lifecycle_action(
        &self,
        group: &str,
        hook: &str,
        token: &str,
        instance_id: &str,
        result: LifecycleActionResult,
    ) -> Result<(), CloudApiError> {
        self.state.lock().completions.push((group.to_string(), hook.to_string(), token.to_string(), instance_id.to_string(), result));
        Ok(())
    }

    async fn suspend_processes(&self, group: &str, processes: &[&str]) -> Result<(), CloudApiError> {
        let mut state = self.state.lock();
        let entry = state.suspended_processes.entry(group.to_string()).or_default();
        for p in processes {
            entry.insert(p.to_string());
        }
        Ok(())
    }

    async fn resume_processes(&self, group: &str, processes: &[&str]) -> Result<(), CloudApiError> {
        let mut state = self.state.lock();
        if let Some(entry) = state.suspended_processes.get_mut(group) {
            for p in processes {
                entry.remove(*p);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receive_respects_max_messages() {
        let api = FakeCloudApi::new();
        api.enqueue("r1", "{}");
        api.enqueue("r2", "{}");
        api.enqueue("r3", "{}");
        let batch = api.receive_messages("q", 2, 20).await.unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn expired_heartbeat_returns_no_active_action_error() {
        let api = FakeCloudApi::new();
        api.expire_next_heartbeat();
        let err = api.record_lifecycle_heartbeat("g", "h", "t", "i").await.unwrap_err();
        assert!(err.is_no_active_lifecycle_action());
    }

    #[tokio::test]
    async fn suspend_then_resume_clears_process() {
        let api = FakeCloudApi::new();
        api.suspend_processes("asg", &["AlarmNotification"]).await.unwrap();
        assert!(api.suspended_processes("asg").contains("AlarmNotification"));
        api.resume_processes("asg", &["AlarmNotification"]).await.unwrap();
        assert!(api.suspended_processes("asg").is_empty());
    }
}
