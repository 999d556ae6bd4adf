//! Computation of static routing tables.

use std::collections::VecDeque;

use crate::node::NodeId;
use crate::topology::Topology;

const UNREACHABLE: usize = usize::MAX;

/// Fills routing tables of all nodes with equal-cost (by hop count) candidate links towards every host.
///
/// Hosts other than the destination never forward transit traffic. Existing routes are replaced,
/// default routes are kept.
pub fn build_ecmp_routes(topology: &mut Topology) {
    let hosts: Vec<NodeId> = topology.hosts().collect();
    for node in 0..topology.node_count() {
        topology.node_mut(node).routing_table_mut().clear_routes();
    }
    for dst in hosts {
        let distance = hop_distances(topology, dst);
        for node in 0..topology.node_count() {
            if node == dst || distance[node] == UNREACHABLE {
                continue;
            }
            let candidates: Vec<_> = topology
                .node(node)
                .neighbors()
                .filter(|(neighbor, _)| {
                    distance[*neighbor] != UNREACHABLE
                        && distance[*neighbor] + 1 == distance[node]
                        && (*neighbor == dst || !topology.node(*neighbor).is_host())
                })
                .map(|(_, link)| link)
                .collect();
            let table = topology.node_mut(node).routing_table_mut();
            for link in candidates {
                table.add_route(dst, link);
            }
        }
    }
}

/// Breadth-first hop distances to `dst` which do not pass through other hosts.
fn hop_distances(topology: &Topology, dst: NodeId) -> Vec<usize> {
    let mut distance = vec![UNREACHABLE; topology.node_count()];
    distance[dst] = 0;
    let mut queue = VecDeque::from([dst]);
    while let Some(node) = queue.pop_front() {
        if node != dst && topology.node(node).is_host() {
            continue;
        }
        for (neighbor, _) in topology.node(node).neighbors() {
            if distance[neighbor] == UNREACHABLE {
                distance[neighbor] = distance[node] + 1;
                queue.push_back(neighbor);
            }
        }
    }
    distance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_spines_give_two_candidates() {
        // h1 - e1 = {s1, s2} = e2 - h2
        let mut t = Topology::new(10.);
        let h1 = t.add_host("h1", 100.);
        let h2 = t.add_host("h2", 100.);
        let e1 = t.add_switch("e1", 100.);
        let e2 = t.add_switch("e2", 100.);
        let s1 = t.add_switch("s1", 100.);
        let s2 = t.add_switch("s2", 100.);
        let l_h1 = t.add_link(h1, e1, 100., 0.);
        t.add_link(h2, e2, 100., 0.);
        let l_e1_s1 = t.add_link(e1, s1, 100., 0.);
        let l_e1_s2 = t.add_link(e1, s2, 100., 0.);
        t.add_link(e2, s1, 100., 0.);
        t.add_link(e2, s2, 100., 0.);
        build_ecmp_routes(&mut t);

        assert_eq!(t.node(h1).routing_table().route(h2), &[l_h1]);
        assert_eq!(t.node(e1).routing_table().route(h2), &[l_e1_s1, l_e1_s2]);
        assert_eq!(t.node(e1).routing_table().route(h1), &[l_h1]);
        assert!(t.node(h1).routing_table().route(h1).is_empty());
    }

    #[test]
    fn hosts_do_not_forward_transit_traffic() {
        // h1 - h2 - h3 chain: h1 can not reach h3
        let mut t = Topology::new(10.);
        let h1 = t.add_host("h1", 100.);
        let h2 = t.add_host("h2", 100.);
        let h3 = t.add_host("h3", 100.);
        t.add_link(h1, h2, 100., 0.);
        t.add_link(h2, h3, 100., 0.);
        build_ecmp_routes(&mut t);
        assert!(t.node(h1).routing_table().route(h3).is_empty());
        assert_eq!(t.node(h1).routing_table().route(h2).len(), 1);
    }
}
