// SPDX-License-Identifier: MIT

//! Event Source (§4.1): long-polls the queue, decodes and publishes each
//! message, then batch-deletes the whole received set.
//!
//! Per §9's resolved open question, undecodable messages are logged and
//! deleted along with everything else in the batch rather than left for
//! redelivery — the queue's own dead-letter-queue redrive policy (AWS
//! side, out of scope here) is the safety net for investigating drops.

use escp_cloud::{CloudApi, CloudApiError};
use escp_core::{event, Event, EventBus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const MAX_MESSAGES: i32 = 10;
const WAIT_TIME_SECONDS: i32 = 20;

pub struct EventSource<A: CloudApi> {
    cloud: Arc<A>,
    bus: EventBus,
    queue_url: String,
}

impl<A: CloudApi> EventSource<A> {
    pub fn new(cloud: Arc<A>, bus: EventBus, queue_url: impl Into<String>) -> Self {
        Self { cloud, bus, queue_url: queue_url.into() }
    }

    /// Run until cancelled or a transport error surfaces (§4.1 "Failure
    /// semantics": transport errors abort the loop and surface to the
    /// supervisor).
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), CloudApiError> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                result = self.poll_once() => result?,
            }
        }
    }

    async fn poll_once(&self) -> Result<(), CloudApiError> {
        let messages = self.cloud.receive_messages(&self.queue_url, MAX_MESSAGES, WAIT_TIME_SECONDS).await?;
        if messages.is_empty() {
            return Ok(());
        }

        let mut receipt_handles = Vec::with_capacity(messages.len());
        for message in &messages {
            receipt_handles.push(message.receipt_handle.clone());
            match event::decode(message.body.as_bytes()) {
                Ok(cloud_event) => {
                    tracing::debug!(event = %Event::Cloud(cloud_event.clone()).log_summary(), "decoded cloud event");
                    self.bus.publish(Event::Cloud(cloud_event)).await;
                }
                Err(err) => {
                    tracing::warn!(%err, "dropping undecodable queue message");
                }
            }
        }

        self.cloud.delete_messages(&self.queue_url, receipt_handles).await?;
        Ok(())
    }
}
