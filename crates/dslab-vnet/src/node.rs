//! Network node.

use std::collections::BTreeMap;

use crate::forwarding::{ForwardingTable, RoutingTable};
use crate::link::LinkId;
use crate::timeseries::{TimeSeries, TimeSeriesError};

/// Unique node id, index of the node in the [`Topology`](crate::Topology).
pub type NodeId = usize;

/// Network address of a node.
pub type Address = u32;

/// Kind of a network node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Physical host running virtual machines, flows start and end here.
    Host,
    /// Switch forwarding traffic between hosts.
    Switch,
}

/// A node in the physical network.
///
/// Every node owns its routing table, forwarding table and adjacency, but not its neighbors.
pub struct Node {
    id: NodeId,
    address: Address,
    name: String,
    kind: NodeKind,
    bandwidth: f64,
    routing_table: RoutingTable,
    forwarding_table: ForwardingTable,
    neighbors: BTreeMap<NodeId, LinkId>,
    active_ports: TimeSeries,
}

impl Node {
    pub(crate) fn new(id: NodeId, address: Address, name: &str, kind: NodeKind, bandwidth: f64, max_age: f64) -> Self {
        Self {
            id,
            address,
            name: name.to_string(),
            kind,
            bandwidth,
            routing_table: RoutingTable::new(),
            forwarding_table: ForwardingTable::new(),
            neighbors: BTreeMap::new(),
            active_ports: TimeSeries::new(max_age),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_host(&self) -> bool {
        self.kind == NodeKind::Host
    }

    /// Returns the node bandwidth capacity.
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing_table
    }

    pub fn routing_table_mut(&mut self) -> &mut RoutingTable {
        &mut self.routing_table
    }

    pub fn forwarding_table(&self) -> &ForwardingTable {
        &self.forwarding_table
    }

    pub fn forwarding_table_mut(&mut self) -> &mut ForwardingTable {
        &mut self.forwarding_table
    }

    /// Returns the link connecting this node with the neighbor.
    pub fn link_to(&self, neighbor: NodeId) -> Option<LinkId> {
        self.neighbors.get(&neighbor).copied()
    }

    /// Returns neighbors with the connecting links ordered by neighbor id.
    pub fn neighbors(&self) -> impl Iterator<Item = (NodeId, LinkId)> + '_ {
        self.neighbors.iter().map(|(n, l)| (*n, *l))
    }

    /// Nodes are connected by at most one link.
    pub(crate) fn add_neighbor(&mut self, neighbor: NodeId, link: LinkId) {
        self.neighbors.insert(neighbor, link);
    }

    /// Returns the history of the number of ports with at least one registered channel.
    pub fn active_ports(&self) -> &TimeSeries {
        &self.active_ports
    }

    pub(crate) fn record_active_ports(&mut self, count: usize, time: f64) -> Result<(), TimeSeriesError> {
        self.active_ports.add(count as f64, time)
    }
}
