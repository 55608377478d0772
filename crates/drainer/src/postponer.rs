// SPDX-License-Identifier: MIT

//! Lifecycle Postponer driver (§4.4): the timer loop that drives
//! [`escp_core::Schedule`] against the real cloud platform.

use escp_cloud::CloudApi;
use escp_core::{Clock, HookCache, LifecycleAction, PostponeError, Schedule};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct Postponer<A: CloudApi, C: Clock> {
    cloud: Arc<A>,
    clock: C,
    hook_cache: Arc<HookCache<C>>,
}

impl<A: CloudApi, C: Clock> Postponer<A, C> {
    pub fn new(cloud: Arc<A>, clock: C, hook_cache: Arc<HookCache<C>>) -> Self {
        Self { cloud, clock, hook_cache }
    }

    /// §4.4 `postpone(ctx, action)`. Returns [`PostponeError::Cancelled`]
    /// if `cancel` fires, [`PostponeError::Timeout`] on global timeout or
    /// a heartbeat hitting the platform's "no active lifecycle action"
    /// validation error.
    pub async fn postpone(&self, action: &LifecycleAction, cancel: CancellationToken) -> PostponeError {
        let desc = match self.hook_cache.get(&action.group, &action.hook) {
            Some(desc) => desc,
            None => match self.cloud.describe_lifecycle_hooks(&action.group, &action.hook).await {
                Ok(desc) => {
                    self.hook_cache.insert(&action.group, &action.hook, desc);
                    desc
                }
                Err(err) => {
                    tracing::warn!(%err, group = %action.group, hook = %action.hook, "failed to describe lifecycle hook, assuming timeout");
                    return PostponeError::Timeout;
                }
            },
        };

        let mut schedule = Schedule::start(action.start_time, desc);

        loop {
            if schedule.is_globally_timed_out(self.clock.now()) {
                return PostponeError::Timeout;
            }
            let delay = schedule.heartbeat_delay(self.clock.now());

            tokio::select! {
                _ = cancel.cancelled() => return PostponeError::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }

            if schedule.is_globally_timed_out(self.clock.now()) {
                return PostponeError::Timeout;
            }

            match self.cloud.record_lifecycle_heartbeat(&action.group, &action.hook, &action.token, &action.instance_id).await {
                Ok(()) => schedule.advance(self.clock.now()),
                Err(err) if err.is_no_active_lifecycle_action() => return PostponeError::Timeout,
                Err(err) => {
                    tracing::warn!(%err, token = %action.token, "heartbeat call failed, will retry at next interval");
                }
            }
        }
    }
}
