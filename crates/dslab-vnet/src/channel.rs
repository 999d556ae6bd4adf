//! Bandwidth reservation of a flow over a concrete path.

use std::fmt;

use crate::context::NetworkContext;
use crate::error::NetworkError;
use crate::flow::FlowKey;
use crate::link::{ChannelUsage, LinkId};
use crate::mapper::ResolvedPath;
use crate::node::NodeId;
use crate::scheduler::{Transmission, TransmissionId, TransmissionScheduler};
use crate::timeseries::TimeSeries;
use crate::topology::Topology;
use crate::{log_debug, log_warn};

/// Unique channel id.
pub type ChannelId = usize;

/// Directional bandwidth reservation of a single flow over a multi-hop path.
///
/// A channel computes the bandwidth it is entitled to from the capacity of the links on its path and the
/// contention on them. How this bandwidth is divided among transmissions inside the channel is up to
/// its [`TransmissionScheduler`].
///
/// Channels of flows with id `-1` are shared, all others are dedicated.
pub struct Channel {
    id: ChannelId,
    key: FlowKey,
    nodes: Vec<NodeId>,
    links: Vec<LinkId>,
    latency: f64,
    requested_bandwidth: f64,
    allocated_bandwidth: f64,
    scheduler: Box<dyn TransmissionScheduler>,
    throughput: TimeSeries,
    unlogged_bytes: f64,
    last_throughput: f64,
    registered: bool,
}

impl Channel {
    /// Creates a channel over the path. The channel is not registered on links until [`Self::initialize`].
    ///
    /// Dedicated channels start with the requested bandwidth, shared ones with the smallest link capacity
    /// on the path.
    pub fn new(
        id: ChannelId,
        key: FlowKey,
        path: ResolvedPath,
        requested_bandwidth: f64,
        topology: &Topology,
        scheduler: Box<dyn TransmissionScheduler>,
        max_age: f64,
    ) -> Self {
        let mut channel = Self {
            id,
            key,
            nodes: Vec::new(),
            links: Vec::new(),
            latency: 0.,
            requested_bandwidth,
            allocated_bandwidth: 0.,
            scheduler,
            throughput: TimeSeries::new(max_age),
            unlogged_bytes: 0.,
            last_throughput: 0.,
            registered: false,
        };
        channel.set_path(path, topology);
        channel.allocated_bandwidth = if channel.is_dedicated() {
            requested_bandwidth
        } else {
            channel.path_capacity(topology)
        };
        channel
    }

    fn set_path(&mut self, path: ResolvedPath, topology: &Topology) {
        assert_eq!(
            path.nodes.len(),
            path.links.len() + 1,
            "Path of channel {} must have one more node than links",
            self.id
        );
        self.latency = path.links.iter().map(|l| topology.link(*l).latency()).sum();
        self.nodes = path.nodes;
        self.links = path.links;
    }

    /// Smallest link capacity on the path, or the host bandwidth for a loopback channel.
    fn path_capacity(&self, topology: &Topology) -> f64 {
        self.links
            .iter()
            .map(|l| topology.link(*l).bandwidth())
            .reduce(f64::min)
            .unwrap_or_else(|| topology.node(self.nodes[0]).bandwidth())
    }

    fn usage(&self) -> ChannelUsage {
        ChannelUsage {
            flow: self.key.flow,
            requested: self.requested_bandwidth,
            allocated: self.allocated_bandwidth,
        }
    }

    /// Iterates over `(link, node the hop leaves)` pairs of the path.
    fn hops(&self) -> impl Iterator<Item = (LinkId, NodeId)> + '_ {
        self.links.iter().copied().zip(self.nodes.iter().copied())
    }

    // Registration ----------------------------------------------------------------------------------------------------

    /// Registers the channel on every link of its path and refreshes monitors of the path nodes.
    pub fn initialize(&mut self, topology: &mut Topology, ctx: &NetworkContext) -> Result<(), NetworkError> {
        if self.registered {
            return Ok(());
        }
        let usage = self.usage();
        for (link, from) in self.hops() {
            topology.link_mut(link).add_channel(from, self.id, usage);
        }
        self.registered = true;
        self.scheduler.set_bandwidth(self.allocated_bandwidth);
        for &node in self.nodes.iter() {
            topology.refresh_node_monitor(node, ctx.time())?;
        }
        log_debug!(ctx, "channel {} ({}) registered on links {:?}", self.id, self.key, self.links);
        Ok(())
    }

    /// Deregisters the channel from the links of its path. Calling it on a terminated channel does nothing.
    pub fn terminate(&mut self, topology: &mut Topology, ctx: &NetworkContext) -> Result<(), NetworkError> {
        if !self.registered {
            return Ok(());
        }
        for (link, from) in self.hops() {
            topology.link_mut(link).remove_channel(from, self.id);
        }
        self.registered = false;
        for &node in self.nodes.iter() {
            topology.refresh_node_monitor(node, ctx.time())?;
        }
        log_debug!(ctx, "channel {} ({}) deregistered", self.id, self.key);
        Ok(())
    }

    /// Moves the channel to a new path keeping its bandwidth accounting.
    pub fn update_route(
        &mut self,
        path: ResolvedPath,
        topology: &mut Topology,
        ctx: &NetworkContext,
    ) -> Result<(), NetworkError> {
        let was_registered = self.registered;
        self.terminate(topology, ctx)?;
        self.set_path(path, topology);
        if was_registered {
            self.initialize(topology, ctx)?;
        }
        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    // Bandwidth -------------------------------------------------------------------------------------------------------

    /// Recomputes the bandwidth of the channel according to its kind.
    pub fn adjust_bandwidth(
        &mut self,
        topology: &mut Topology,
        grant_surplus: bool,
        ctx: &NetworkContext,
    ) -> Result<bool, NetworkError> {
        if self.is_dedicated() {
            self.adjust_dedicated(topology, grant_surplus, ctx)
        } else {
            self.adjust_shared(topology, ctx)
        }
    }

    /// Recomputes the bandwidth of a dedicated channel. Returns true if it has changed.
    ///
    /// The requested bandwidth is scaled by the smallest adjustment factor along the path. With `grant_surplus`
    /// the channel may also get more than requested, up to the smallest per-channel share of the path.
    pub fn adjust_dedicated(
        &mut self,
        topology: &mut Topology,
        grant_surplus: bool,
        ctx: &NetworkContext,
    ) -> Result<bool, NetworkError> {
        if !self.registered || self.links.is_empty() {
            return Ok(false);
        }
        let mut factor: f64 = 1.;
        let mut lowest_share = f64::INFINITY;
        for (link, from) in self.hops() {
            let link = topology.link(link);
            factor = factor.min(link.dedicated_adjustment_factor(from));
            let mut share = link.fair_share(from);
            if grant_surplus {
                share = share.min(link.surplus_ceiling(from, self.requested_bandwidth));
            }
            lowest_share = lowest_share.min(share);
        }
        let mut target = self.requested_bandwidth * factor;
        if factor < 1. && target != self.allocated_bandwidth {
            log_warn!(
                ctx,
                "channel {} ({}) is oversubscribed: gets {:.3} of requested {:.3}",
                self.id,
                self.key,
                target,
                self.requested_bandwidth
            );
        }
        if grant_surplus && lowest_share > self.requested_bandwidth {
            target = lowest_share;
        }
        self.change_bandwidth(target, topology, ctx)
    }

    /// Recomputes the bandwidth of a shared channel as the smallest fair share of free capacity along the path.
    /// Returns true if it has changed.
    pub fn adjust_shared(&mut self, topology: &mut Topology, ctx: &NetworkContext) -> Result<bool, NetworkError> {
        if !self.registered || self.links.is_empty() {
            return Ok(false);
        }
        let target = self
            .hops()
            .map(|(link, from)| topology.link(link).shared_bandwidth_per_channel(from))
            .fold(f64::INFINITY, f64::min);
        if target <= 0. {
            return Err(NetworkError::NonPositiveBandwidth {
                channel: self.id,
                bandwidth: target,
            });
        }
        self.change_bandwidth(target, topology, ctx)
    }

    /// Sets the allocated bandwidth. Progress of transmissions is flushed with the old bandwidth first.
    pub fn change_bandwidth(
        &mut self,
        bandwidth: f64,
        topology: &mut Topology,
        ctx: &NetworkContext,
    ) -> Result<bool, NetworkError> {
        if bandwidth == self.allocated_bandwidth {
            return Ok(false);
        }
        if !bandwidth.is_finite() {
            return Err(NetworkError::NonFiniteBandwidth {
                channel: self.id,
                bandwidth,
            });
        }
        if bandwidth <= 0. {
            return Err(NetworkError::NonPositiveBandwidth {
                channel: self.id,
                bandwidth,
            });
        }
        self.update_packet_processing(ctx.time());
        self.scheduler.set_bandwidth(bandwidth);
        self.allocated_bandwidth = bandwidth;
        self.sync_usage(topology);
        Ok(true)
    }

    /// Administrative update of the requested bandwidth. The allocation changes on the next adjustment.
    pub fn set_requested_bandwidth(&mut self, bandwidth: f64, topology: &mut Topology) {
        self.requested_bandwidth = bandwidth;
        self.sync_usage(topology);
    }

    fn sync_usage(&self, topology: &mut Topology) {
        if !self.registered {
            return;
        }
        for (link, from) in self.hops() {
            topology
                .link_mut(link)
                .update_channel(from, self.id, self.requested_bandwidth, self.allocated_bandwidth);
        }
    }

    // Transmissions ---------------------------------------------------------------------------------------------------

    pub fn add_transmission(&mut self, transmission: Transmission, time: f64) {
        self.update_packet_processing(time);
        self.scheduler.add_transmission(transmission, time);
    }

    pub fn remove_transmission(&mut self, id: TransmissionId, time: f64) -> Option<Transmission> {
        self.update_packet_processing(time);
        self.scheduler.remove_transmission(id, time)
    }

    /// Advances transmissions to the given time, returns the number of bytes processed.
    pub fn update_packet_processing(&mut self, time: f64) -> f64 {
        let processed = self.scheduler.update_packet_processing(time);
        self.unlogged_bytes += processed;
        processed
    }

    pub fn next_finish_time(&self) -> f64 {
        self.scheduler.next_finish_time()
    }

    pub fn active_transmission_count(&self) -> usize {
        self.scheduler.active_count()
    }

    pub fn completed_transmission_count(&self) -> usize {
        self.scheduler.completed().len()
    }

    pub fn timed_out_transmission_count(&self) -> usize {
        self.scheduler.timed_out().len()
    }

    /// Returns and forgets completed transmissions.
    pub fn take_completed(&mut self) -> Vec<Transmission> {
        let completed = self.scheduler.completed().to_vec();
        self.scheduler.reset_completed();
        completed
    }

    /// Returns and forgets timed out transmissions.
    pub fn take_timed_out(&mut self) -> Vec<Transmission> {
        let timed_out = self.scheduler.timed_out().to_vec();
        self.scheduler.reset_timed_out();
        timed_out
    }

    pub fn set_timeout(&mut self, timeout: f64) {
        self.scheduler.set_timeout(timeout);
    }

    // Monitoring ------------------------------------------------------------------------------------------------------

    /// Records the data rate achieved since the previous call, which may differ from the allocated bandwidth.
    ///
    /// With a non-positive window nothing is recorded, the processed bytes are carried over to the next call
    /// and the previous rate is returned.
    pub fn record_throughput(&mut self, log_time: f64, window: f64) -> Result<f64, NetworkError> {
        self.update_packet_processing(log_time);
        if window <= 0. {
            return Ok(self.last_throughput);
        }
        let rate = self.unlogged_bytes / window;
        self.unlogged_bytes = 0.;
        self.throughput.add(rate, log_time)?;
        self.last_throughput = rate;
        Ok(rate)
    }

    /// Returns the history of achieved data rate.
    pub fn throughput(&self) -> &TimeSeries {
        &self.throughput
    }

    /// Returns the rate recorded at the last monitoring tick.
    pub fn last_throughput(&self) -> f64 {
        self.last_throughput
    }

    // Accessors -------------------------------------------------------------------------------------------------------

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn key(&self) -> FlowKey {
        self.key
    }

    pub fn is_dedicated(&self) -> bool {
        crate::flow::is_dedicated(self.key.flow)
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    /// Returns the node where the channel starts.
    pub fn source(&self) -> NodeId {
        self.nodes[0]
    }

    /// Sum of link latencies along the path.
    pub fn latency(&self) -> f64 {
        self.latency
    }

    pub fn requested_bandwidth(&self) -> f64 {
        self.requested_bandwidth
    }

    pub fn allocated_bandwidth(&self) -> f64 {
        self.allocated_bandwidth
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "channel {} ({}) nodes={:?} links={:?} requested={:.3} allocated={:.3} active={}",
            self.id,
            self.key,
            self.nodes,
            self.links,
            self.requested_bandwidth,
            self.allocated_bandwidth,
            self.scheduler.active_count()
        )
    }
}
