//! Network link.

use indexmap::IndexMap;

use crate::channel::ChannelId;
use crate::flow::{is_dedicated, FlowId};
use crate::node::NodeId;
use crate::timeseries::{TimeSeries, TimeSeriesError};

/// Unique link id, index of the link in the [`Topology`](crate::Topology).
pub type LinkId = usize;

/// Bandwidth figures of a channel registered on a link direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelUsage {
    pub flow: FlowId,
    pub requested: f64,
    pub allocated: f64,
}

impl ChannelUsage {
    pub fn is_dedicated(&self) -> bool {
        is_dedicated(self.flow)
    }
}

#[derive(Clone, Debug)]
struct LinkDirection {
    channels: IndexMap<ChannelId, ChannelUsage>,
    rate: TimeSeries,
}

impl LinkDirection {
    fn new(max_age: f64) -> Self {
        Self {
            channels: IndexMap::new(),
            rate: TimeSeries::new(max_age),
        }
    }
}

/// Undirected physical link between two nodes.
///
/// Each direction is shared independently among the channels routed over it: dedicated channels get
/// their requested bandwidth (scaled down if the link is oversubscribed), shared channels split equally
/// whatever remains.
#[derive(Clone, Debug)]
pub struct Link {
    id: LinkId,
    nodes: (NodeId, NodeId),
    bandwidth: f64,
    latency: f64,
    directions: [LinkDirection; 2],
}

impl Link {
    pub(crate) fn new(id: LinkId, node1: NodeId, node2: NodeId, bandwidth: f64, latency: f64, max_age: f64) -> Self {
        Self {
            id,
            nodes: (node1, node2),
            bandwidth,
            latency,
            directions: [LinkDirection::new(max_age), LinkDirection::new(max_age)],
        }
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Returns the link endpoints.
    pub fn nodes(&self) -> (NodeId, NodeId) {
        self.nodes
    }

    /// Returns the link capacity in each direction.
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Returns the propagation latency.
    pub fn latency(&self) -> f64 {
        self.latency
    }

    /// Returns true if the node is one of the link endpoints.
    pub fn connects(&self, node: NodeId) -> bool {
        self.nodes.0 == node || self.nodes.1 == node
    }

    /// Returns the endpoint opposite to `node`.
    pub fn other_end(&self, node: NodeId) -> NodeId {
        if node == self.nodes.0 {
            self.nodes.1
        } else {
            assert_eq!(node, self.nodes.1, "Node {} is not connected by link {}", node, self.id);
            self.nodes.0
        }
    }

    fn direction(&self, from: NodeId) -> &LinkDirection {
        &self.directions[self.direction_index(from)]
    }

    fn direction_mut(&mut self, from: NodeId) -> &mut LinkDirection {
        let idx = self.direction_index(from);
        &mut self.directions[idx]
    }

    fn direction_index(&self, from: NodeId) -> usize {
        if from == self.nodes.0 {
            0
        } else {
            assert_eq!(from, self.nodes.1, "Node {} is not connected by link {}", from, self.id);
            1
        }
    }

    // Channel registry ------------------------------------------------------------------------------------------------

    /// Registers a channel in the direction leaving `from`. Returns false if it was already registered.
    pub(crate) fn add_channel(&mut self, from: NodeId, channel: ChannelId, usage: ChannelUsage) -> bool {
        self.direction_mut(from).channels.insert(channel, usage).is_none()
    }

    /// Deregisters a channel. Returns false if it was not registered.
    pub(crate) fn remove_channel(&mut self, from: NodeId, channel: ChannelId) -> bool {
        self.direction_mut(from).channels.shift_remove(&channel).is_some()
    }

    pub(crate) fn update_channel(&mut self, from: NodeId, channel: ChannelId, requested: f64, allocated: f64) {
        if let Some(usage) = self.direction_mut(from).channels.get_mut(&channel) {
            usage.requested = requested;
            usage.allocated = allocated;
        }
    }

    /// Returns the channels registered in the direction leaving `from`, in registration order.
    pub fn channels(&self, from: NodeId) -> impl Iterator<Item = (ChannelId, &ChannelUsage)> + '_ {
        self.direction(from).channels.iter().map(|(id, usage)| (*id, usage))
    }

    pub fn has_channel(&self, from: NodeId, channel: ChannelId) -> bool {
        self.direction(from).channels.contains_key(&channel)
    }

    /// Returns true if any channel is registered in either direction.
    pub fn is_active(&self) -> bool {
        self.directions.iter().any(|d| !d.channels.is_empty())
    }

    pub fn channel_count(&self, from: NodeId) -> usize {
        self.direction(from).channels.len()
    }

    pub fn dedicated_channel_count(&self, from: NodeId) -> usize {
        self.channels(from).filter(|(_, u)| u.is_dedicated()).count()
    }

    pub fn shared_channel_count(&self, from: NodeId) -> usize {
        self.channel_count(from) - self.dedicated_channel_count(from)
    }

    pub fn requested_dedicated_bandwidth(&self, from: NodeId) -> f64 {
        self.channels(from)
            .filter(|(_, u)| u.is_dedicated())
            .map(|(_, u)| u.requested)
            .sum()
    }

    pub fn allocated_dedicated_bandwidth(&self, from: NodeId) -> f64 {
        self.channels(from)
            .filter(|(_, u)| u.is_dedicated())
            .map(|(_, u)| u.allocated)
            .sum()
    }

    pub fn allocated_shared_bandwidth(&self, from: NodeId) -> f64 {
        self.channels(from)
            .filter(|(_, u)| !u.is_dedicated())
            .map(|(_, u)| u.allocated)
            .sum()
    }

    // Bandwidth sharing -----------------------------------------------------------------------------------------------

    /// Returns the multiplier applied to dedicated requests when their sum exceeds the link capacity.
    pub fn dedicated_adjustment_factor(&self, from: NodeId) -> f64 {
        let requested = self.requested_dedicated_bandwidth(from);
        if requested > self.bandwidth {
            self.bandwidth / requested
        } else {
            1.
        }
    }

    /// Returns the capacity not taken by dedicated channels.
    pub fn free_bandwidth(&self, from: NodeId) -> f64 {
        self.bandwidth - self.allocated_dedicated_bandwidth(from)
    }

    /// Returns the share of free capacity for each shared channel.
    pub fn shared_bandwidth_per_channel(&self, from: NodeId) -> f64 {
        let shared = self.shared_channel_count(from).max(1);
        self.free_bandwidth(from) / shared as f64
    }

    /// Returns the capacity divided equally among all registered channels.
    pub fn fair_share(&self, from: NodeId) -> f64 {
        self.bandwidth / self.channel_count(from).max(1) as f64
    }

    /// Returns the largest bandwidth a dedicated channel with the given request may be granted on this hop
    /// while the sum of dedicated allocations stays within the capacity.
    pub fn surplus_ceiling(&self, from: NodeId, requested: f64) -> f64 {
        let factor = self.dedicated_adjustment_factor(from);
        let dedicated = self.dedicated_channel_count(from).max(1);
        let unrequested = (self.bandwidth - self.requested_dedicated_bandwidth(from) * factor).max(0.);
        requested * factor + unrequested / dedicated as f64
    }

    // Monitoring ------------------------------------------------------------------------------------------------------

    /// Returns the history of data rate in the direction leaving `from`.
    pub fn rate_history(&self, from: NodeId) -> &TimeSeries {
        &self.direction(from).rate
    }

    pub(crate) fn record_rate(&mut self, from: NodeId, rate: f64, time: f64) -> Result<(), TimeSeriesError> {
        self.direction_mut(from).rate.add(rate, time)
    }

    /// Returns the average utilization (rate relative to capacity) of the direction leaving `from` over `[start, end]`.
    pub fn utilization(&self, from: NodeId, start: f64, end: f64) -> f64 {
        self.direction(from).rate.average_value(start, end) / self.bandwidth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(flow: FlowId, requested: f64) -> ChannelUsage {
        ChannelUsage {
            flow,
            requested,
            allocated: requested,
        }
    }

    #[test]
    fn directions_are_independent() {
        let mut link = Link::new(0, 1, 2, 1000., 0.1, 10.);
        assert!(link.add_channel(1, 10, usage(5, 100.)));
        assert!(!link.add_channel(1, 10, usage(5, 100.)));
        assert!(link.add_channel(2, 11, usage(-1, 0.)));
        assert_eq!(link.channel_count(1), 1);
        assert_eq!(link.shared_channel_count(2), 1);
        assert_eq!(link.free_bandwidth(1), 900.);
        assert_eq!(link.free_bandwidth(2), 1000.);
        assert!(link.remove_channel(1, 10));
        assert!(!link.remove_channel(1, 10));
        assert!(link.is_active());
        assert!(link.remove_channel(2, 11));
        assert!(!link.is_active());
    }

    #[test]
    fn oversubscribed_link_reports_factor() {
        let mut link = Link::new(0, 1, 2, 1000., 0., 10.);
        link.add_channel(1, 1, usage(1, 600.));
        assert_eq!(link.dedicated_adjustment_factor(1), 1.);
        link.add_channel(1, 2, usage(2, 1400.));
        assert_eq!(link.dedicated_adjustment_factor(1), 0.5);
    }

    #[test]
    fn surplus_ceiling_keeps_capacity() {
        let mut link = Link::new(0, 1, 2, 1000., 0., 10.);
        link.add_channel(1, 1, usage(1, 900.));
        link.add_channel(1, 2, usage(2, 50.));
        let total = link.surplus_ceiling(1, 900.) + link.surplus_ceiling(1, 50.);
        assert!((total - 1000.).abs() < 1e-9);
        assert_eq!(link.fair_share(1), 500.);
    }

    #[test]
    #[should_panic]
    fn foreign_node_is_rejected() {
        let link = Link::new(0, 1, 2, 1000., 0., 10.);
        link.channel_count(3);
    }
}
