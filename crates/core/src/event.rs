// SPDX-License-Identifier: MIT

//! Cloud event envelope and decoding (§3, §6), plus the internal cluster
//! events the drainer publishes alongside them.
//!
//! Decoding is two-stage: the envelope (`id`, `source`, `detail-type`, …) is
//! generic across every event type the platform emits; `detail` is only
//! interpreted once `(source, detail-type)` is known. Unknown combinations
//! keep their `detail` as an opaque JSON value rather than failing decode —
//! per §3, unknown types are logged and dropped, not rejected outright.

use crate::error::EventDecodeError;
use serde::{Deserialize, Serialize};

/// A decoded message from the platform's event bus (§3 `CloudEvent`).
#[derive(Debug, Clone, PartialEq)]
pub struct CloudEvent {
    pub id: String,
    pub source: String,
    pub detail_type: String,
    pub time: chrono::DateTime<chrono::Utc>,
    pub region: Option<String>,
    pub resources: Vec<String>,
    pub detail: CloudEventDetail,
}

/// The typed subset of `detail` shapes this system acts on (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum CloudEventDetail {
    SpotInterruption { instance_id: String, instance_action: String },
    TerminationLifecycleAction {
        autoscaling_group_name: String,
        lifecycle_hook_name: String,
        token: String,
        instance_id: String,
        lifecycle_transition: String,
    },
    /// Anything else: source, detail-type pair not recognized. Carries the
    /// raw detail body so callers can log it before dropping it.
    Unknown(serde_json::Value),
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    id: String,
    source: Option<String>,
    #[serde(rename = "detail-type")]
    detail_type: Option<String>,
    time: Option<chrono::DateTime<chrono::Utc>>,
    region: Option<String>,
    #[serde(default)]
    resources: Vec<String>,
    #[serde(default)]
    detail: serde_json::Value,
}

#[derive(Deserialize)]
struct RawSpotInterruptionDetail {
    #[serde(rename = "instance-id")]
    instance_id: String,
    #[serde(rename = "instance-action")]
    instance_action: String,
}

#[derive(Deserialize)]
struct RawTerminationLifecycleDetail {
    #[serde(rename = "LifecycleActionToken")]
    lifecycle_action_token: String,
    #[serde(rename = "AutoScalingGroupName")]
    auto_scaling_group_name: String,
    #[serde(rename = "LifecycleHookName")]
    lifecycle_hook_name: String,
    #[serde(rename = "EC2InstanceId")]
    ec2_instance_id: String,
    #[serde(rename = "LifecycleTransition")]
    lifecycle_transition: String,
}

const SOURCE_EC2: &str = "aws.ec2";
const SOURCE_AUTOSCALING: &str = "aws.autoscaling";
const DETAIL_TYPE_SPOT_INTERRUPTION: &str = "EC2 Spot Instance Interruption Warning";
const DETAIL_TYPE_TERMINATION_LIFECYCLE: &str = "EC2 Instance-terminate Lifecycle Action";

/// Decode a queue message body into a [`CloudEvent`].
///
/// Per §6, `source` and `detail-type` are the only envelope fields whose
/// absence is a decode error; everything else degrades gracefully.
pub fn decode(body: &[u8]) -> Result<CloudEvent, EventDecodeError> {
    let raw: RawEnvelope = serde_json::from_slice(body)?;
    let source = raw.source.ok_or(EventDecodeError::MissingField("source"))?;
    let detail_type = raw.detail_type.ok_or(EventDecodeError::MissingField("detail-type"))?;

    let detail = match (source.as_str(), detail_type.as_str()) {
        (SOURCE_EC2, DETAIL_TYPE_SPOT_INTERRUPTION) => {
            match serde_json::from_value::<RawSpotInterruptionDetail>(raw.detail.clone()) {
                Ok(d) => CloudEventDetail::SpotInterruption { instance_id: d.instance_id, instance_action: d.instance_action },
                Err(_) => CloudEventDetail::Unknown(raw.detail),
            }
        }
        (SOURCE_AUTOSCALING, DETAIL_TYPE_TERMINATION_LIFECYCLE) => {
            match serde_json::from_value::<RawTerminationLifecycleDetail>(raw.detail.clone()) {
                Ok(d) => CloudEventDetail::TerminationLifecycleAction {
                    autoscaling_group_name: d.auto_scaling_group_name,
                    lifecycle_hook_name: d.lifecycle_hook_name,
                    token: d.lifecycle_action_token,
                    instance_id: d.ec2_instance_id,
                    lifecycle_transition: d.lifecycle_transition,
                },
                Err(_) => CloudEventDetail::Unknown(raw.detail),
            }
        }
        _ => CloudEventDetail::Unknown(raw.detail),
    };

    Ok(CloudEvent {
        id: raw.id,
        source,
        detail_type,
        time: raw.time.unwrap_or_else(chrono::Utc::now),
        region: raw.region,
        resources: raw.resources,
        detail,
    })
}

/// Everything the internal bus carries: decoded cloud events plus the
/// cluster-state transitions the tracker derives from them (§2, §3).
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Cloud(CloudEvent),
    NodeAdded(String),
    NodeRemoved(String),
    NodeEmpty(String),
}

impl Event {
    /// Topic string used for bus routing: `source:detailType` for cloud
    /// events, `kind:instanceID` for internal ones (§3 "Internal event
    /// bus").
    pub fn topic(&self) -> String {
        match self {
            Event::Cloud(e) => format!("{}:{}", e.source, e.detail_type),
            Event::NodeAdded(name) => format!("node-added:{name}"),
            Event::NodeRemoved(name) => format!("node-removed:{name}"),
            Event::NodeEmpty(name) => format!("node-empty:{name}"),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::Cloud(e) => match e.detail {
                CloudEventDetail::SpotInterruption { .. } => "spot-interruption",
                CloudEventDetail::TerminationLifecycleAction { .. } => "termination-lifecycle-action",
                CloudEventDetail::Unknown(_) => "cloud-event-unknown",
            },
            Event::NodeAdded(_) => "node-added",
            Event::NodeRemoved(_) => "node-removed",
            Event::NodeEmpty(_) => "node-empty",
        }
    }

    /// One-line summary suitable for a `tracing` field, never the full
    /// payload.
    pub fn log_summary(&self) -> String {
        match self {
            Event::Cloud(e) => format!("{} id={} source={}", self.name(), e.id, e.source),
            Event::NodeAdded(name) | Event::NodeRemoved(name) | Event::NodeEmpty(name) => {
                format!("{} node={}", self.name(), name)
            }
        }
    }
}
