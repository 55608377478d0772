// SPDX-License-Identifier: MIT

use crate::error::CloudApiError;
use crate::types::{LifecycleActionResult, QueueMessage};
use crate::CloudApi;
use async_trait::async_trait;
use escp_core::LifecycleHookDescription;
use std::time::Duration;

/// Talks to real SQS and Autoscaling APIs.
pub struct AwsCloudApi {
    sqs: aws_sdk_sqs::Client,
    autoscaling: aws_sdk_autoscaling::Client,
}

impl AwsCloudApi {
    pub fn new(sqs: aws_sdk_sqs::Client, autoscaling: aws_sdk_autoscaling::Client) -> Self {
        Self { sqs, autoscaling }
    }

    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self { sqs: aws_sdk_sqs::Client::new(&config), autoscaling: aws_sdk_autoscaling::Client::new(&config) }
    }
}

/// Classify an SDK display string into our error taxonomy. The platform's
/// validation errors (e.g. the lifecycle-action-already-gone case) come
/// back as a message, not a distinct error variant, in both the AWS SDK
/// and the event-driven control flow that depends on matching it (§4.4).
fn classify<E: std::fmt::Display>(err: E) -> CloudApiError {
    let message = err.to_string();
    if message.contains("ValidationError") || message.contains("No active Lifecycle Action") {
        CloudApiError::Validation(message)
    } else {
        CloudApiError::Transport(message)
    }
}

#[async_trait]
impl CloudApi for AwsCloudApi {
    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: i32,
        wait_time_seconds: i32,
    ) -> Result<Vec<QueueMessage>, CloudApiError> {
        let response = self
            .sqs
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_time_seconds)
            .send()
            .await
            .map_err(classify)?;

        Ok(response
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| {
                let receipt_handle = m.receipt_handle?;
                let body = m.body.unwrap_or_default();
                Some(QueueMessage { receipt_handle, body })
            })
            .collect())
    }

    async fn delete_messages(&self, queue_url: &str, receipt_handles: Vec<String>) -> Result<(), CloudApiError> {
        for chunk in receipt_handles.chunks(10) {
            let entries: Result<Vec<_>, _> = chunk
                .iter()
                .enumerate()
                .map(|(i, handle)| {
                    aws_sdk_sqs::types::DeleteMessageBatchRequestEntry::builder()
                        .id(i.to_string())
                        .receipt_handle(handle)
                        .build()
                })
                .collect();
            let entries = entries.map_err(classify)?;
            self.sqs.delete_message_batch().queue_url(queue_url).set_entries(Some(entries)).send().await.map_err(classify)?;
        }
        Ok(())
    }

    async fn describe_lifecycle_hooks(&self, group: &str, hook: &str) -> Result<LifecycleHookDescription, CloudApiError> {
        let response = self
            .autoscaling
            .describe_lifecycle_hooks()
            .auto_scaling_group_name(group)
            .lifecycle_hook_names(hook)
            .send()
            .await
            .map_err(classify)?;

        let described = response.lifecycle_hooks().first().ok_or_else(|| {
            CloudApiError::Transport(format!("no lifecycle hook named {hook} on group {group}"))
        })?;

        Ok(LifecycleHookDescription {
            heartbeat_timeout: Duration::from_secs(described.heartbeat_timeout().unwrap_or(3600).max(0) as u64),
            global_timeout: Duration::from_secs(described.global_timeout().unwrap_or(172_800).max(0) as u64),
        })
    }

    async fn record_lifecycle_heartbeat(
        &self,
        group: &str,
        hook: &str,
        token: &str,
        instance_id: &str,
    ) -> Result<(), CloudApiError> {
        self.autoscaling
            .record_lifecycle_action_heartbeat()
            .auto_scaling_group_name(group)
            .lifecycle_hook_name(hook)
            .lifecycle_action_token(token)
            .instance_id(instance_id)
            .send()
            .await
            .map_err(classify)?;
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
        self.autoscaling
            .complete_lifecycle_action()
            .auto_scaling_group_name(group)
            .lifecycle_hook_name(hook)
            .lifecycle_action_token(token)
            .instance_id(instance_id)
            .lifecycle_action_result(result.as_str())
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn suspend_processes(&self, group: &str, processes: &[&str]) -> Result<(), CloudApiError> {
        self.autoscaling
            .suspend_processes()
            .auto_scaling_group_name(group)
            .set_scaling_processes(Some(processes.iter().map(|s| s.to_string()).collect()))
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn resume_processes(&self, group: &str, processes: &[&str]) -> Result<(), CloudApiError> {
        self.autoscaling
            .resume_processes()
            .auto_scaling_group_name(group)
            .set_scaling_processes(Some(processes.iter().map(|s| s.to_string()).collect()))
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }
}
