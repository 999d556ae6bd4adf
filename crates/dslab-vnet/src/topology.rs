//! Physical network topology.

use std::collections::BTreeMap;

use crate::flow::FlowId;
use crate::link::{Link, LinkId};
use crate::node::{Address, Node, NodeId, NodeKind};

/// Hands out node addresses and flow ids of a single topology.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    next_address: Address,
    next_flow_id: FlowId,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_address(&mut self) -> Address {
        let address = self.next_address;
        self.next_address += 1;
        address
    }

    /// Returns a new dedicated flow id, never equal to [`DEFAULT_FLOW_ID`](crate::DEFAULT_FLOW_ID).
    pub fn next_flow_id(&mut self) -> FlowId {
        let flow = self.next_flow_id;
        self.next_flow_id += 1;
        flow
    }
}

/// Nodes and links of the physical network.
pub struct Topology {
    nodes: Vec<Node>,
    links: Vec<Link>,
    node_names: BTreeMap<String, NodeId>,
    allocator: IdAllocator,
    max_age: f64,
}

impl Topology {
    /// Creates an empty topology. Monitoring series of nodes and links keep samples not older than `max_age`.
    pub fn new(max_age: f64) -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            node_names: BTreeMap::new(),
            allocator: IdAllocator::new(),
            max_age,
        }
    }

    /// Adds a physical host.
    pub fn add_host(&mut self, name: &str, bandwidth: f64) -> NodeId {
        self.add_node(name, NodeKind::Host, bandwidth)
    }

    /// Adds a switch.
    pub fn add_switch(&mut self, name: &str, bandwidth: f64) -> NodeId {
        self.add_node(name, NodeKind::Switch, bandwidth)
    }

    fn add_node(&mut self, name: &str, kind: NodeKind, bandwidth: f64) -> NodeId {
        assert!(
            !self.node_names.contains_key(name),
            "Node with name {} already exists",
            name
        );
        let id = self.nodes.len();
        let address = self.allocator.next_address();
        self.nodes
            .push(Node::new(id, address, name, kind, bandwidth, self.max_age));
        self.node_names.insert(name.to_string(), id);
        id
    }

    /// Connects two nodes with a link.
    pub fn add_link(&mut self, node1: NodeId, node2: NodeId, bandwidth: f64, latency: f64) -> LinkId {
        assert!(bandwidth > 0.0, "Link bandwidth must be > 0");
        assert!(node1 < self.nodes.len() && node2 < self.nodes.len(), "Unknown node");
        assert_ne!(node1, node2, "Link must connect two different nodes");
        assert!(
            self.nodes[node1].link_to(node2).is_none(),
            "Nodes {} and {} are already connected, parallel links are not supported",
            self.nodes[node1].name(),
            self.nodes[node2].name()
        );
        let id = self.links.len();
        self.links
            .push(Link::new(id, node1, node2, bandwidth, latency, self.max_age));
        self.nodes[node1].add_neighbor(node2, id);
        self.nodes[node2].add_neighbor(node1, id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.node_names.get(name).copied()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id]
    }

    pub fn link_mut(&mut self, id: LinkId) -> &mut Link {
        &mut self.links[id]
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Returns the link connecting two nodes.
    pub fn link_between(&self, node1: NodeId, node2: NodeId) -> Option<LinkId> {
        self.nodes.get(node1).and_then(|n| n.link_to(node2))
    }

    /// Returns the ids of all hosts.
    pub fn hosts(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().filter(|n| n.is_host()).map(|n| n.id())
    }

    pub fn allocator_mut(&mut self) -> &mut IdAllocator {
        &mut self.allocator
    }

    /// Records the number of active ports of the node at the given time.
    pub(crate) fn refresh_node_monitor(&mut self, node: NodeId, time: f64) -> Result<(), crate::TimeSeriesError> {
        let active = self.nodes[node]
            .neighbors()
            .filter(|(_, link)| self.links[*link].is_active())
            .count();
        self.nodes[node].record_active_ports(active, time)
    }

    /// Drops all forwarding entries in all nodes.
    pub fn clear_forwarding_tables(&mut self) {
        for node in self.nodes.iter_mut() {
            node.forwarding_table_mut().clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_is_monotonic() {
        let mut allocator = IdAllocator::new();
        assert_eq!(allocator.next_address(), 0);
        assert_eq!(allocator.next_address(), 1);
        assert_eq!(allocator.next_flow_id(), 0);
        assert_eq!(allocator.next_flow_id(), 1);
    }

    #[test]
    fn nodes_and_links() {
        let mut topology = Topology::new(10.);
        let h1 = topology.add_host("h1", 100.);
        let sw = topology.add_switch("sw", 1000.);
        let h2 = topology.add_host("h2", 100.);
        let l1 = topology.add_link(h1, sw, 100., 0.1);
        let l2 = topology.add_link(sw, h2, 100., 0.1);
        assert_eq!(topology.link_between(h1, sw), Some(l1));
        assert_eq!(topology.link_between(h2, sw), Some(l2));
        assert_eq!(topology.link_between(h1, h2), None);
        assert_eq!(topology.node_by_name("sw"), Some(sw));
        assert_eq!(topology.hosts().collect::<Vec<_>>(), vec![h1, h2]);
        assert_ne!(topology.node(h1).address(), topology.node(h2).address());
    }

    #[test]
    #[should_panic(expected = "Link bandwidth must be > 0")]
    fn zero_bandwidth_link() {
        let mut topology = Topology::new(10.);
        let h1 = topology.add_host("h1", 100.);
        let h2 = topology.add_host("h2", 100.);
        topology.add_link(h1, h2, 0., 0.1);
    }

    #[test]
    #[should_panic(expected = "already connected")]
    fn parallel_link() {
        let mut topology = Topology::new(10.);
        let h1 = topology.add_host("h1", 100.);
        let sw = topology.add_switch("sw", 100.);
        topology.add_link(h1, sw, 100., 0.1);
        topology.add_link(sw, h1, 200., 0.1);
    }
}
