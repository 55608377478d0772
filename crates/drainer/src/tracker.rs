// SPDX-License-Identifier: MIT

//! Cluster-State Tracker (§4.2).

use escp_cluster::{parse_exclusions, ClusterApi, ClusterApiError};
use escp_core::{diff_nodes, parse_shard_location, ClusterState, Event, EventBus, ShardLocation};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// Periodically snapshots the cluster and publishes `node-added` /
/// `node-removed` / `node-empty` transitions.
///
/// Two locks, deliberately distinct (§4.2 "Concurrency"): `write_lock`
/// serializes the compare-publish-swap sequence across ticks (held across
/// the `await`s in `publish`), while `state` is a plain sync `RwLock` so
/// [`Tracker::snapshot`] never blocks on bus I/O.
pub struct Tracker<C: ClusterApi> {
    cluster: Arc<C>,
    bus: EventBus,
    state: RwLock<ClusterState>,
    write_lock: AsyncMutex<()>,
}

impl<C: ClusterApi> Tracker<C> {
    pub fn new(cluster: Arc<C>, bus: EventBus) -> Self {
        Self { cluster, bus, state: RwLock::new(ClusterState::default()), write_lock: AsyncMutex::new(()) }
    }

    pub fn snapshot(&self) -> ClusterState {
        self.state.read().clone()
    }

    /// Run one tick: fetch, diff, undrain stale exclusions, publish, swap.
    ///
    /// An unparseable shard location is an invariant violation (§4.2,
    /// §7 "Invariant violation" — fatal), not a recoverable error.
    #[allow(clippy::expect_used)]
    pub async fn tick(&self) -> Result<(), ClusterApiError> {
        let _guard = self.write_lock.lock().await;

        let (nodes_res, shards_res, settings_res) =
            tokio::join!(self.cluster.nodes_info(), self.cluster.cat_shards(), self.cluster.cluster_get_settings());
        let nodes_info = nodes_res?;
        let shard_rows = shards_res?;
        let settings = settings_res?;

        let mut node_names: Vec<String> = nodes_info.into_iter().map(|n| n.name).collect();
        node_names.sort();
        node_names.dedup();

        let mut shards: BTreeMap<String, u64> = BTreeMap::new();
        for row in &shard_rows {
            match parse_shard_location(&row.node_raw).expect("cluster emitted an unparseable shard location") {
                ShardLocation::Unassigned => {}
                ShardLocation::Assigned { node } => *shards.entry(node).or_insert(0) += 1,
                ShardLocation::Relocating { node, dest_node } => {
                    *shards.entry(node).or_insert(0) += 1;
                    *shards.entry(dest_node).or_insert(0) += 1;
                }
            }
        }

        let exclusions = parse_exclusions(&settings.transient);
        let previous = self.state.read().clone();
        let mut next_state = ClusterState::new(node_names, shards, exclusions);

        let (added, mut removed) = diff_nodes(&previous.nodes, &next_state.nodes);

        // §4.2 step 1: undrain names no longer present among current nodes.
        let stale: Vec<String> =
            previous.exclusions.names.iter().filter(|n| next_state.nodes.binary_search(n).is_err()).cloned().collect();
        if !stale.is_empty() {
            let mut exclusions = next_state.exclusions.clone();
            exclusions.undrain_names(stale.iter().cloned());
            self.cluster.cluster_put_settings(escp_cluster::name_patch(&exclusions)).await?;
            next_state.exclusions = exclusions;
            for name in stale {
                if !removed.contains(&name) {
                    removed.push(name);
                }
            }
        }

        for name in &added {
            self.bus.publish(Event::NodeAdded(name.clone())).await;
        }
        for name in &removed {
            self.bus.publish(Event::NodeRemoved(name.clone())).await;
        }
        // §4.2 step 4: unconditional every tick, the liveness signal that
        // unblocks drain handlers even if the node was already empty.
        let empty_nodes: Vec<String> = next_state.empty_nodes().into_iter().map(str::to_string).collect();
        for name in empty_nodes {
            self.bus.publish(Event::NodeEmpty(name)).await;
        }

        *self.state.write() = next_state;
        Ok(())
    }
}
