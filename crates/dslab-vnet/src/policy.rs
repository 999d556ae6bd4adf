//! Strategies for choosing among equal-cost links.

use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::config::{parse_config_value, parse_options};
use crate::flow::FlowId;
use crate::link::LinkId;
use crate::node::NodeId;
use crate::topology::Topology;

/// Link selection policy queried once per hop during path construction.
///
/// Dynamic policies depend on the current link load, so the paths built with them
/// must be periodically re-validated with [`VirtualNetworkMapper::refresh_path`](crate::VirtualNetworkMapper::refresh_path).
#[derive(Clone, Debug, PartialEq)]
pub enum LinkSelectionPolicy {
    /// Always the first candidate.
    First,
    /// Cycles through candidates starting from a seeded offset.
    Random { counter: usize },
    /// Candidate chosen by destination address, gives stable ECMP without recomputation.
    DestinationHash,
    /// Candidate with the fewest channels in the outgoing direction.
    LeastFlowCount,
    /// Candidate with the most capacity per channel in the outgoing direction.
    LeastFlowCapacity,
}

impl LinkSelectionPolicy {
    /// Creates [`LinkSelectionPolicy::Random`] with the initial offset drawn from a generator with the given seed.
    pub fn random(seed: u64) -> Self {
        let mut rng = Pcg64::seed_from_u64(seed);
        Self::Random {
            counter: rng.gen::<u32>() as usize,
        }
    }

    /// Resolves the policy from config string such as `DestinationHash` or `Random[seed=42]`.
    pub fn from_config_str(config_str: &str, default_seed: u64) -> Self {
        let (name, options) = parse_config_value(config_str);
        match name.as_str() {
            "First" => Self::First,
            "Random" => {
                let seed = options
                    .as_deref()
                    .map(parse_options)
                    .and_then(|o| o.get("seed").map(|s| s.parse::<u64>()))
                    .map(|s| s.unwrap_or_else(|_| panic!("Can't parse seed in: {}", config_str)))
                    .unwrap_or(default_seed);
                Self::random(seed)
            }
            "DestinationHash" => Self::DestinationHash,
            "LeastFlowCount" => Self::LeastFlowCount,
            "LeastFlowCapacity" | "FlowCapacity" => Self::LeastFlowCapacity,
            _ => panic!("Can't resolve link selection policy: {}", config_str),
        }
    }

    /// Returns true if the choice depends on mutable link load.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::LeastFlowCount | Self::LeastFlowCapacity)
    }

    /// Picks one of `candidates` for the hop leaving `current`.
    ///
    /// Panics if `candidates` is empty.
    pub fn select_link(
        &mut self,
        candidates: &[LinkId],
        _flow: FlowId,
        _src_host: NodeId,
        dst_host: NodeId,
        current: NodeId,
        topology: &Topology,
    ) -> LinkId {
        assert!(!candidates.is_empty(), "No candidate links at node {}", current);
        if candidates.len() == 1 {
            return candidates[0];
        }
        match self {
            Self::First => candidates[0],
            Self::Random { counter } => {
                let link = candidates[*counter % candidates.len()];
                *counter = counter.wrapping_add(1);
                link
            }
            Self::DestinationHash => destination_hash(candidates, dst_host, topology),
            Self::LeastFlowCount => {
                let mut best = candidates[0];
                let mut best_count = usize::MAX;
                for &link in candidates {
                    let count = topology.link(link).channel_count(current);
                    if count < best_count {
                        best = link;
                        best_count = count;
                    }
                }
                best
            }
            Self::LeastFlowCapacity => {
                let capacity_per_flow = |link: LinkId| {
                    let link = topology.link(link);
                    link.bandwidth() / (link.channel_count(current) + 1) as f64
                };
                let mut best = destination_hash(candidates, dst_host, topology);
                let mut best_capacity = capacity_per_flow(best);
                for &link in candidates {
                    let capacity = capacity_per_flow(link);
                    if capacity > best_capacity {
                        best = link;
                        best_capacity = capacity;
                    }
                }
                best
            }
        }
    }
}

fn destination_hash(candidates: &[LinkId], dst_host: NodeId, topology: &Topology) -> LinkId {
    let address = topology.node(dst_host).address() as usize;
    candidates[address % candidates.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::ChannelUsage;

    // h0 - sw with three parallel uplinks to core switches c0, c1, c2
    fn fixture() -> (Topology, NodeId, Vec<LinkId>, NodeId) {
        let mut t = Topology::new(10.);
        let h = t.add_host("h", 100.);
        let sw = t.add_switch("sw", 100.);
        t.add_link(h, sw, 100., 0.);
        let mut uplinks = Vec::new();
        for i in 0..3 {
            let core = t.add_switch(&format!("c{}", i), 100.);
            uplinks.push(t.add_link(sw, core, 100. * (i + 1) as f64, 0.));
        }
        (t, sw, uplinks, h)
    }

    fn load(t: &mut Topology, link: LinkId, from: NodeId, channels: usize) {
        for ch in 0..channels {
            t.link_mut(link).add_channel(
                from,
                1000 + ch,
                ChannelUsage {
                    flow: -1,
                    requested: 0.,
                    allocated: 1.,
                },
            );
        }
    }

    #[test]
    fn static_policies() {
        let (t, sw, uplinks, h) = fixture();
        let mut first = LinkSelectionPolicy::First;
        assert_eq!(first.select_link(&uplinks, 0, h, h, sw, &t), uplinks[0]);

        let mut hash = LinkSelectionPolicy::DestinationHash;
        let expected = uplinks[t.node(h).address() as usize % 3];
        assert_eq!(hash.select_link(&uplinks, 0, h, h, sw, &t), expected);
        assert_eq!(hash.select_link(&uplinks, 7, h, h, sw, &t), expected);

        let mut random = LinkSelectionPolicy::Random { counter: 1 };
        let picks: Vec<_> = (0..4).map(|_| random.select_link(&uplinks, 0, h, h, sw, &t)).collect();
        assert_eq!(picks, vec![uplinks[1], uplinks[2], uplinks[0], uplinks[1]]);

        assert!(!first.is_dynamic() && !hash.is_dynamic() && !random.is_dynamic());
    }

    #[test]
    fn least_flow_count_prefers_first_lowest() {
        let (mut t, sw, uplinks, h) = fixture();
        let mut policy = LinkSelectionPolicy::LeastFlowCount;
        assert!(policy.is_dynamic());
        assert_eq!(policy.select_link(&uplinks, 0, h, h, sw, &t), uplinks[0]);
        load(&mut t, uplinks[0], sw, 2);
        load(&mut t, uplinks[1], sw, 1);
        assert_eq!(policy.select_link(&uplinks, 0, h, h, sw, &t), uplinks[2]);
        load(&mut t, uplinks[2], sw, 1);
        assert_eq!(policy.select_link(&uplinks, 0, h, h, sw, &t), uplinks[1]);
        // load in the opposite direction does not count
        let core = t.link(uplinks[1]).other_end(sw);
        load(&mut t, uplinks[1], core, 5);
        assert_eq!(policy.select_link(&uplinks, 0, h, h, sw, &t), uplinks[1]);
    }

    #[test]
    fn least_flow_capacity_weights_by_bandwidth() {
        let (mut t, sw, uplinks, h) = fixture();
        let mut policy = LinkSelectionPolicy::LeastFlowCapacity;
        // capacities 100, 200, 300
        assert_eq!(policy.select_link(&uplinks, 0, h, h, sw, &t), uplinks[2]);
        load(&mut t, uplinks[2], sw, 2);
        // 100/1, 200/1, 300/3
        assert_eq!(policy.select_link(&uplinks, 0, h, h, sw, &t), uplinks[1]);
    }

    #[test]
    fn resolve_from_config() {
        assert_eq!(
            LinkSelectionPolicy::from_config_str("LeastFlowCount", 1),
            LinkSelectionPolicy::LeastFlowCount
        );
        assert_eq!(
            LinkSelectionPolicy::from_config_str("Random[seed=5]", 1),
            LinkSelectionPolicy::random(5)
        );
        assert_eq!(LinkSelectionPolicy::from_config_str("Random", 5), LinkSelectionPolicy::random(5));
    }

    #[test]
    #[should_panic(expected = "Can't resolve")]
    fn unknown_policy() {
        LinkSelectionPolicy::from_config_str("Shortest", 1);
    }
}
