// SPDX-License-Identifier: MIT

//! Local node health (§1 "Out of scope… a pass-through health-check for a
//! local node (simple HEAD + 'joined cluster' + 'no relocating shards at
//! startup')"), used to gate a rolling restart's readiness probe.
//!
//! This is deliberately thin glue, not core engineering: a HEAD request
//! confirms the local node process answers HTTP at all, cluster
//! membership confirms it has joined, and the shard scan confirms it
//! isn't mid-relocation when the drainer starts — all checked once, at
//! startup, not on a tick.

use escp_cluster::ClusterApi;
use escp_core::parse_shard_location;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocalHealthError {
    #[error("local node did not respond to HEAD: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("local node {0:?} has not joined the cluster")]
    NotJoined(String),

    #[error(transparent)]
    Cluster(#[from] escp_cluster::ClusterApiError),
}

/// Confirm the local node is reachable, has joined the cluster, and has
/// no shards mid-relocation.
pub async fn check_local_node<C: ClusterApi>(
    client: &reqwest::Client,
    local_node_url: &str,
    local_node_name: &str,
    cluster: &C,
) -> Result<(), LocalHealthError> {
    client.head(local_node_url).send().await?.error_for_status()?;

    let nodes = cluster.nodes_info().await?;
    if !nodes.iter().any(|n| n.name == local_node_name) {
        return Err(LocalHealthError::NotJoined(local_node_name.to_string()));
    }

    let shards = cluster.cat_shards().await?;
    let local_has_relocation = shards.iter().any(|row| {
        matches!(
            parse_shard_location(&row.node_raw),
            Ok(escp_core::ShardLocation::Relocating { ref node, ref dest_node })
                if node == local_node_name || dest_node == local_node_name
        )
    });
    if local_has_relocation {
        return Err(LocalHealthError::NotJoined(format!("{local_node_name} has a relocating shard at startup")));
    }

    Ok(())
}
