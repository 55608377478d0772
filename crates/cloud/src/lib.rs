// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Cloud-provider adapter: SQS long-poll/delete and Autoscaling lifecycle
//! and process-suspension calls (§4.1, §4.3, §4.4, §4.5). Out of scope for
//! the core engineering per the specification, expressed here as a trait
//! with a real AWS SDK implementation and a fake for tests.

mod aws;
mod error;
mod fake;
mod types;

pub use aws::AwsCloudApi;
pub use error::CloudApiError;
pub use fake::FakeCloudApi;
pub use types::{LifecycleActionResult, QueueMessage};

use async_trait::async_trait;
use escp_core::LifecycleHookDescription;

#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Long-poll up to `max_messages` (≤10) messages, waiting up to
    /// `wait_time_seconds` for at least one (§4.1: batches of up to 10,
    /// 20-second wait).
    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: i32,
        wait_time_seconds: i32,
    ) -> Result<Vec<QueueMessage>, CloudApiError>;

    async fn delete_messages(&self, queue_url: &str, receipt_handles: Vec<String>) -> Result<(), CloudApiError>;

    async fn describe_lifecycle_hooks(&self, group: &str, hook: &str) -> Result<LifecycleHookDescription, CloudApiError>;

    async fn record_lifecycle_heartbeat(
        &self,
        group: &str,
        hook: &str,
        token: &str,
        instance_id: &str,
    ) -> Result<(), CloudApiError>;

    async fn complete_lifecycle_action(
        &self,
        group: &str,
        hook: &str,
        token: &str,
        instance_id: &str,
        result: LifecycleActionResult,
    ) -> Result<(), CloudApiError>;

    async fn suspend_processes(&self, group: &str, processes: &[&str]) -> Result<(), CloudApiError>;

    async fn resume_processes(&self, group: &str, processes: &[&str]) -> Result<(), CloudApiError>;
}
