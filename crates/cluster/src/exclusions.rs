// SPDX-License-Identifier: MIT

//! Allocation-exclusion read-modify-write (§4.8).
//!
//! Exclusions live as comma-separated strings under
//! `cluster.routing.allocation.exclude.*`. Every update re-reads current
//! settings within the same cycle and merges — union for drain,
//! set-difference for undrain — to avoid racing other writers.

use escp_core::Exclusions;
use std::collections::BTreeMap;

const NAME_KEY: &str = "cluster.routing.allocation.exclude._name";
const IP_KEY: &str = "cluster.routing.allocation.exclude._ip";
const HOST_KEY: &str = "cluster.routing.allocation.exclude._host";
const ATTR_PREFIX: &str = "cluster.routing.allocation.exclude.";

/// Parse the `exclude.*` keys out of a flat transient-settings map.
pub fn parse(transient: &BTreeMap<String, String>) -> Exclusions {
    let mut exclusions = Exclusions::default();
    for (key, value) in transient {
        if key == NAME_KEY {
            exclusions.names = Exclusions::parse_list(value);
        } else if key == IP_KEY {
            exclusions.ips = Exclusions::parse_list(value);
        } else if key == HOST_KEY {
            exclusions.hosts = Exclusions::parse_list(value);
        } else if let Some(attr) = key.strip_prefix(ATTR_PREFIX) {
            if attr != "_name" && attr != "_ip" && attr != "_host" {
                exclusions.attributes.insert(attr.to_string(), Exclusions::parse_list(value));
            }
        }
    }
    exclusions
}

/// Serialize the name-exclusion list into the single transient-settings
/// key the Drain Coordinator needs to write (§4.3).
pub fn name_patch(exclusions: &Exclusions) -> BTreeMap<String, String> {
    BTreeMap::from([(NAME_KEY.to_string(), Exclusions::format_list(&exclusions.names))])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_ip_host_and_attribute_keys() {
        let transient = BTreeMap::from([
            (NAME_KEY.to_string(), "i-a,i-b".to_string()),
            (IP_KEY.to_string(), "10.0.0.1".to_string()),
            (HOST_KEY.to_string(), "host-1".to_string()),
            ("cluster.routing.allocation.exclude.zone".to_string(), "us-east-1a,us-east-1b".to_string()),
        ]);
        let exclusions = parse(&transient);
        assert_eq!(exclusions.names, ["i-a".to_string(), "i-b".to_string()].into_iter().collect());
        assert_eq!(exclusions.ips, ["10.0.0.1".to_string()].into_iter().collect());
        assert_eq!(exclusions.hosts, ["host-1".to_string()].into_iter().collect());
        assert_eq!(exclusions.attributes.get("zone").unwrap().len(), 2);
    }

    #[test]
    fn name_patch_round_trips_through_format_list() {
        let mut exclusions = Exclusions::default();
        exclusions.drain_names(["i-b".to_string(), "i-a".to_string()]);
        let patch = name_patch(&exclusions);
        assert_eq!(patch.get(NAME_KEY).unwrap(), "i-a,i-b");
    }

    #[test]
    fn merge_union_is_idempotent_for_drain() {
        let transient = BTreeMap::from([(NAME_KEY.to_string(), "i-a".to_string())]);
        let mut exclusions = parse(&transient);
        exclusions.drain_names(["i-a".to_string()]);
        assert_eq!(exclusions.names.len(), 1);
    }

    #[test]
    fn merge_set_difference_removes_only_named_entries() {
        let transient = BTreeMap::from([(NAME_KEY.to_string(), "i-a,i-b,i-c".to_string())]);
        let mut exclusions = parse(&transient);
        exclusions.undrain_names(["i-b".to_string()]);
        assert_eq!(exclusions.names, ["i-a".to_string(), "i-c".to_string()].into_iter().collect());
    }
}
