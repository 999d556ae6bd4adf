//! Mapping of flows onto the physical network.
//!
//! Paths are not stored explicitly: each node on a path keeps the next hop for the flow in its forwarding table.
//! The concrete node and link sequence is obtained by replaying these entries.

use std::collections::BTreeMap;

use crate::error::NetworkError;
use crate::flow::{EndpointId, FlowId, FlowKey};
use crate::link::LinkId;
use crate::node::NodeId;
use crate::policy::LinkSelectionPolicy;
use crate::topology::Topology;

/// Resolves endpoints to the hosts they are placed on.
pub trait HostResolver {
    fn find_host(&self, endpoint: EndpointId) -> Option<NodeId>;
}

/// Placement of endpoints on hosts.
#[derive(Clone, Debug, Default)]
pub struct EndpointPlacement {
    hosts: BTreeMap<EndpointId, NodeId>,
}

impl EndpointPlacement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places the endpoint on the host, returns the previous host.
    pub fn set_location(&mut self, endpoint: EndpointId, host: NodeId) -> Option<NodeId> {
        self.hosts.insert(endpoint, host)
    }

    pub fn remove_location(&mut self, endpoint: EndpointId) -> Option<NodeId> {
        self.hosts.remove(&endpoint)
    }

    /// Returns endpoints placed on the host.
    pub fn endpoints_on(&self, host: NodeId) -> impl Iterator<Item = EndpointId> + '_ {
        self.hosts.iter().filter(move |(_, h)| **h == host).map(|(e, _)| *e)
    }
}

impl HostResolver for EndpointPlacement {
    fn find_host(&self, endpoint: EndpointId) -> Option<NodeId> {
        self.hosts.get(&endpoint).copied()
    }
}

/// Concrete path of a flow: `nodes.len() == links.len() + 1` and `links[i]` connects `nodes[i]` and `nodes[i + 1]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    pub nodes: Vec<NodeId>,
    pub links: Vec<LinkId>,
}

/// Builds and maintains per-flow forwarding entries using a [`LinkSelectionPolicy`].
pub struct VirtualNetworkMapper {
    policy: LinkSelectionPolicy,
}

impl VirtualNetworkMapper {
    pub fn new(policy: LinkSelectionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &LinkSelectionPolicy {
        &self.policy
    }

    /// Returns the host of the endpoint.
    pub fn resolve_host(hosts: &dyn HostResolver, endpoint: EndpointId) -> Result<NodeId, NetworkError> {
        hosts
            .find_host(endpoint)
            .ok_or(NetworkError::EndpointUnresolved { endpoint })
    }

    /// Installs forwarding entries for the flow on every node from the source host to the destination host.
    pub fn build_path(
        &mut self,
        topology: &mut Topology,
        hosts: &dyn HostResolver,
        src: EndpointId,
        dst: EndpointId,
        flow: FlowId,
    ) -> Result<(), NetworkError> {
        let src_host = Self::resolve_host(hosts, src)?;
        let dst_host = Self::resolve_host(hosts, dst)?;
        let key = FlowKey::new(src, dst, flow);

        if src_host == dst_host {
            topology.node_mut(src_host).forwarding_table_mut().add(key, src_host);
            return Ok(());
        }

        let mut node = src_host;
        let mut hops = 0;
        while node != dst_host {
            let next_hop = self.select_next_hop(topology, key, src_host, dst_host, node)?;
            topology.node_mut(node).forwarding_table_mut().add(key, next_hop);
            node = next_hop;
            hops += 1;
            if hops > topology.node_count() {
                return Err(routing_loop(node, key));
            }
        }
        Ok(())
    }

    /// Re-validates the flow path starting from `node`.
    ///
    /// The policy is queried at each hop. Once its choice differs from the existing entry (or `force_rebuild`
    /// is set), the entry is overwritten and every following hop is rebuilt. Hops before the first divergence
    /// are left untouched. Does nothing for static policies. Returns true if any entry has changed.
    #[allow(clippy::too_many_arguments)]
    pub fn refresh_path(
        &mut self,
        topology: &mut Topology,
        hosts: &dyn HostResolver,
        node: NodeId,
        src: EndpointId,
        dst: EndpointId,
        flow: FlowId,
        force_rebuild: bool,
    ) -> Result<bool, NetworkError> {
        if !self.policy.is_dynamic() {
            return Ok(false);
        }
        let src_host = Self::resolve_host(hosts, src)?;
        let dst_host = Self::resolve_host(hosts, dst)?;
        let key = FlowKey::new(src, dst, flow);

        let mut node = node;
        let mut force_rebuild = force_rebuild;
        let mut changed = false;
        let mut hops = 0;
        while node != dst_host {
            let next_hop = self.select_next_hop(topology, key, src_host, dst_host, node)?;
            let current = topology.node(node).forwarding_table().get(&key);
            if force_rebuild || current != Some(next_hop) {
                topology.node_mut(node).forwarding_table_mut().add(key, next_hop);
                changed = true;
                force_rebuild = true;
            }
            node = next_hop;
            hops += 1;
            if hops > topology.node_count() {
                return Err(routing_loop(node, key));
            }
        }
        Ok(changed)
    }

    /// Replays forwarding entries of the flow from `origin` until a host is reached.
    pub fn resolve_concrete_path(
        &self,
        topology: &Topology,
        src: EndpointId,
        dst: EndpointId,
        flow: FlowId,
        origin: NodeId,
    ) -> Result<ResolvedPath, NetworkError> {
        let key = FlowKey::new(src, dst, flow);
        let mut nodes = vec![origin];
        let mut links = Vec::new();
        let mut node = origin;
        loop {
            let next_hop = topology
                .node(node)
                .forwarding_table()
                .get(&key)
                .ok_or_else(|| NetworkError::BrokenChain {
                    node,
                    key,
                    reason: "no forwarding entry".to_string(),
                })?;
            if next_hop == node {
                // loopback
                break;
            }
            let link = topology.link_between(node, next_hop).ok_or_else(|| NetworkError::BrokenChain {
                node,
                key,
                reason: format!("no link to next hop {}", next_hop),
            })?;
            nodes.push(next_hop);
            links.push(link);
            if topology.node(next_hop).is_host() {
                break;
            }
            if links.len() > topology.node_count() {
                return Err(routing_loop(next_hop, key));
            }
            node = next_hop;
        }
        Ok(ResolvedPath { nodes, links })
    }

    /// Removes forwarding entries of the flow along its current path from `origin` and builds a new path.
    ///
    /// Used when migration changes the hosts of the flow endpoints.
    #[allow(clippy::too_many_arguments)]
    pub fn rebuild_for_flow(
        &mut self,
        topology: &mut Topology,
        hosts: &dyn HostResolver,
        src: EndpointId,
        dst: EndpointId,
        flow: FlowId,
        origin: NodeId,
    ) -> Result<(), NetworkError> {
        self.remove_path(topology, src, dst, flow, origin);
        self.build_path(topology, hosts, src, dst, flow)
    }

    /// Removes forwarding entries of the flow reachable from `origin`. Returns the nodes which held an entry.
    pub fn remove_path(
        &self,
        topology: &mut Topology,
        src: EndpointId,
        dst: EndpointId,
        flow: FlowId,
        origin: NodeId,
    ) -> Vec<NodeId> {
        let key = FlowKey::new(src, dst, flow);
        let mut cleared = Vec::new();
        let mut node = origin;
        while let Some(next_hop) = topology.node_mut(node).forwarding_table_mut().remove(&key) {
            cleared.push(node);
            if next_hop == node || cleared.len() > topology.node_count() {
                break;
            }
            node = next_hop;
        }
        cleared
    }

    fn select_next_hop(
        &mut self,
        topology: &Topology,
        key: FlowKey,
        src_host: NodeId,
        dst_host: NodeId,
        node: NodeId,
    ) -> Result<NodeId, NetworkError> {
        let candidates = topology.node(node).routing_table().route(dst_host);
        if candidates.is_empty() {
            return Err(NetworkError::NoRouteToHost { node, dst_host, key });
        }
        let link = self
            .policy
            .select_link(candidates, key.flow, src_host, dst_host, node, topology);
        Ok(topology.link(link).other_end(node))
    }
}

fn routing_loop(node: NodeId, key: FlowKey) -> NetworkError {
    NetworkError::BrokenChain {
        node,
        key,
        reason: "routing loop".to_string(),
    }
}
