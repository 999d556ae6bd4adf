//! Static routing tables and per-flow forwarding tables.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::flow::FlowKey;
use crate::link::LinkId;
use crate::node::NodeId;

/// Static table of candidate links towards each destination host.
///
/// Several links for one destination mean equal-cost alternatives, one of which is picked by
/// a [`LinkSelectionPolicy`](crate::policy::LinkSelectionPolicy).
#[derive(Clone, Debug, Default)]
pub struct RoutingTable {
    routes: BTreeMap<NodeId, Vec<LinkId>>,
    default_route: Vec<LinkId>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a candidate link towards the destination host. Duplicates are ignored.
    pub fn add_route(&mut self, dst_host: NodeId, link: LinkId) {
        let links = self.routes.entry(dst_host).or_default();
        if !links.contains(&link) {
            links.push(link);
        }
    }

    /// Sets the links used for destinations without explicit routes (e.g. uplinks of an edge switch).
    pub fn set_default_route(&mut self, links: Vec<LinkId>) {
        self.default_route = links;
    }

    /// Returns candidate links towards the destination host, falling back to the default route.
    pub fn route(&self, dst_host: NodeId) -> &[LinkId] {
        match self.routes.get(&dst_host) {
            Some(links) if !links.is_empty() => links,
            _ => &self.default_route,
        }
    }

    /// Returns the destinations with explicit routes.
    pub fn known_destinations(&self) -> impl Iterator<Item = &NodeId> {
        self.routes.keys()
    }

    /// Returns the default route.
    pub fn default_route(&self) -> &[LinkId] {
        &self.default_route
    }

    /// Removes explicit routes, keeping the default one.
    pub fn clear_routes(&mut self) {
        self.routes.clear();
    }

    /// Removes all routes.
    pub fn clear(&mut self) {
        self.routes.clear();
        self.default_route.clear();
    }
}

/// Per-flow next-hop memory of a node.
///
/// A missing entry means that no route was computed yet.
#[derive(Clone, Debug, Default)]
pub struct ForwardingTable {
    entries: FxHashMap<FlowKey, NodeId>,
}

impl ForwardingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the next hop for the flow, replacing the previous one.
    pub fn add(&mut self, key: FlowKey, next_hop: NodeId) {
        self.entries.insert(key, next_hop);
    }

    pub fn get(&self, key: &FlowKey) -> Option<NodeId> {
        self.entries.get(key).copied()
    }

    pub fn remove(&mut self, key: &FlowKey) -> Option<NodeId> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_falls_back_to_default() {
        let mut table = RoutingTable::new();
        table.add_route(7, 1);
        table.add_route(7, 2);
        table.add_route(7, 1);
        table.set_default_route(vec![5]);
        assert_eq!(table.route(7), &[1, 2]);
        assert_eq!(table.route(8), &[5]);
        table.clear();
        assert!(table.route(7).is_empty());
    }

    #[test]
    fn forwarding_entries() {
        let mut table = ForwardingTable::new();
        let key = FlowKey::new(1, 2, 3);
        assert_eq!(table.get(&key), None);
        table.add(key, 10);
        table.add(key, 11);
        assert_eq!(table.get(&key), Some(11));
        assert_eq!(table.get(&FlowKey::new(1, 2, -1)), None);
        assert_eq!(table.remove(&key), Some(11));
        assert!(table.is_empty());
    }
}
