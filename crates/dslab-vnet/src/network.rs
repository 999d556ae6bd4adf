//! Virtual network component.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;
use sugars::boxed;

use crate::channel::{Channel, ChannelId};
use crate::config::NetworkConfig;
use crate::context::NetworkContext;
use crate::error::NetworkError;
use crate::flow::{EndpointId, FlowConfig, FlowKey};
use crate::mapper::{EndpointPlacement, HostResolver, VirtualNetworkMapper};
use crate::node::NodeId;
use crate::policy::LinkSelectionPolicy;
use crate::scheduler::{FairShareScheduler, Transmission, TransmissionId, TransmissionScheduler};
use crate::sink::{LogSink, StdoutLogSink};
use crate::topology::Topology;
use crate::{log_debug, log_error, log_info, log_trace, log_warn};

/// Creates a transmission scheduler for each new channel.
pub type SchedulerFactory = Box<dyn Fn() -> Box<dyn TransmissionScheduler>>;

/// Transmissions which left the channels during [`VirtualNetwork::process_transmissions`].
#[derive(Debug, Default)]
pub struct ProcessedTransmissions {
    pub completed: Vec<(ChannelId, Transmission)>,
    pub timed_out: Vec<(ChannelId, Transmission)>,
}

/// Network of a simulated datacenter.
///
/// Admits flows by building their paths and opening channels over them, keeps the channel bandwidth consistent
/// with link contention and reroutes flows when their endpoints migrate or when a dynamic link selection policy
/// prefers other links.
///
/// Bandwidth is recomputed only on explicit events (admission, teardown, migration, path refresh, bandwidth update).
pub struct VirtualNetwork {
    topology: Topology,
    mapper: VirtualNetworkMapper,
    placement: EndpointPlacement,
    channels: BTreeMap<ChannelId, Channel>,
    channel_by_key: FxHashMap<FlowKey, ChannelId>,
    config: NetworkConfig,
    scheduler_factory: SchedulerFactory,
    sink: Box<dyn LogSink>,
    next_channel_id: ChannelId,
    next_transmission_id: TransmissionId,
    last_monitoring_time: f64,
    ctx: NetworkContext,
}

impl VirtualNetwork {
    /// Creates network over the topology. Routing tables of the topology must be filled already.
    pub fn new(topology: Topology, config: NetworkConfig, ctx: NetworkContext) -> Self {
        let policy = LinkSelectionPolicy::from_config_str(&config.link_selection_policy, config.seed);
        log_info!(
            ctx,
            "created network with {} nodes, {} links and {:?} link selection policy",
            topology.node_count(),
            topology.link_count(),
            policy
        );
        Self {
            topology,
            mapper: VirtualNetworkMapper::new(policy),
            placement: EndpointPlacement::new(),
            channels: BTreeMap::new(),
            channel_by_key: FxHashMap::default(),
            config,
            scheduler_factory: boxed!(fair_share_scheduler),
            sink: boxed!(StdoutLogSink::new()),
            next_channel_id: 0,
            next_transmission_id: 0,
            last_monitoring_time: ctx.time(),
            ctx,
        }
    }

    /// Replaces the sink receiving monitoring rows.
    pub fn with_sink(mut self, sink: Box<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replaces the scheduler used by channels opened afterwards.
    pub fn with_scheduler_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn TransmissionScheduler> + 'static,
    {
        self.scheduler_factory = boxed!(factory);
        self
    }

    // Placement -------------------------------------------------------------------------------------------------------

    /// Places the endpoint on the host. Existing channels are not rerouted, see [`Self::migrate_endpoint`].
    pub fn set_location(&mut self, endpoint: EndpointId, host: NodeId) {
        assert!(
            self.topology.node(host).is_host(),
            "Endpoint {} can't be placed on {} which is not a host",
            endpoint,
            self.topology.node(host).name()
        );
        self.placement.set_location(endpoint, host);
    }

    pub fn remove_location(&mut self, endpoint: EndpointId) -> Option<NodeId> {
        self.placement.remove_location(endpoint)
    }

    pub fn placement(&self) -> &EndpointPlacement {
        &self.placement
    }

    // Channels --------------------------------------------------------------------------------------------------------

    /// Admits the flow: builds its path, opens a channel over it and readjusts bandwidth of all channels.
    ///
    /// If the flow already has a channel, its id is returned.
    pub fn open_channel(&mut self, flow: FlowConfig) -> Result<ChannelId, NetworkError> {
        let key = flow.key();
        if let Some(&id) = self.channel_by_key.get(&key) {
            log_warn!(self.ctx, "flow {} already has channel {}", key, id);
            return Ok(id);
        }
        let result = self.try_open_channel(&flow);
        self.check(result, format_args!("flow {} not admitted", key))
    }

    fn try_open_channel(&mut self, flow: &FlowConfig) -> Result<ChannelId, NetworkError> {
        let key = flow.key();
        let id = self.next_channel_id;
        if flow.is_dedicated() {
            check_bandwidth(id, flow.bandwidth)?;
        }
        if let Err(err) = self
            .mapper
            .build_path(&mut self.topology, &self.placement, key.src, key.dst, key.flow)
        {
            self.remove_partial_path(key);
            return Err(err);
        }
        let src_host = VirtualNetworkMapper::resolve_host(&self.placement, key.src)?;
        let path = self
            .mapper
            .resolve_concrete_path(&self.topology, key.src, key.dst, key.flow, src_host)?;

        let mut channel = Channel::new(
            id,
            key,
            path,
            flow.bandwidth,
            &self.topology,
            (self.scheduler_factory)(),
            self.config.time_series_max_age,
        );
        if let Some(timeout) = self.config.transmission_timeout {
            channel.set_timeout(timeout);
        }
        channel.initialize(&mut self.topology, &self.ctx)?;
        if flow.latency > 0. && channel.latency() > flow.latency {
            log_warn!(
                self.ctx,
                "channel {} for flow {} has latency {:.3} above requested {:.3}",
                id,
                key,
                channel.latency(),
                flow.latency
            );
        }
        self.next_channel_id += 1;
        self.channels.insert(id, channel);
        self.channel_by_key.insert(key, id);
        self.adjust_channels()?;
        Ok(id)
    }

    /// Closes the channel, drops the forwarding entries of its flow and readjusts bandwidth of other channels.
    ///
    /// Returns the closed channel with transmissions which were still in progress.
    pub fn close_channel(&mut self, id: ChannelId) -> Result<Channel, NetworkError> {
        let result = self.try_close_channel(id);
        self.check(result, format_args!("can't close channel {}", id))
    }

    fn try_close_channel(&mut self, id: ChannelId) -> Result<Channel, NetworkError> {
        let mut channel = self.channels.remove(&id).ok_or(NetworkError::UnknownChannel(id))?;
        let key = channel.key();
        self.channel_by_key.remove(&key);
        channel.update_packet_processing(self.ctx.time());
        channel.terminate(&mut self.topology, &self.ctx)?;
        self.mapper
            .remove_path(&mut self.topology, key.src, key.dst, key.flow, channel.source());
        self.adjust_channels()?;
        log_debug!(self.ctx, "closed channel {} of flow {}", id, key);
        Ok(channel)
    }

    /// Moves the endpoint to another host and rebuilds paths of all flows it takes part in.
    ///
    /// A flow whose path can't be rebuilt keeps its channel without a route until the next migration,
    /// the first such error is returned after all flows are processed.
    pub fn migrate_endpoint(&mut self, endpoint: EndpointId, host: NodeId) -> Result<(), NetworkError> {
        self.set_location(endpoint, host);
        let affected: Vec<ChannelId> = self
            .channels
            .values()
            .filter(|c| c.key().src == endpoint || c.key().dst == endpoint)
            .map(|c| c.id())
            .collect();
        log_debug!(
            self.ctx,
            "endpoint {} migrated to {}, rerouting {} channels",
            endpoint,
            self.topology.node(host).name(),
            affected.len()
        );

        let mut unrouted = None;
        for id in affected {
            let mut channel = match self.channels.remove(&id) {
                Some(channel) => channel,
                None => continue,
            };
            let result = self.rebuild_channel_path(&mut channel);
            self.channels.insert(id, channel);
            if let Err(err) = result {
                self.report(&err, format_args!("channel {} lost its route after migration", id));
                if err.is_fatal() {
                    return Err(err);
                }
                unrouted.get_or_insert(err);
            }
        }
        let result = self.adjust_channels();
        self.check(result, "bandwidth adjustment failed")?;
        unrouted.map_or(Ok(()), Err)
    }

    fn rebuild_channel_path(&mut self, channel: &mut Channel) -> Result<(), NetworkError> {
        let key = channel.key();
        let origin = channel.source();
        channel.terminate(&mut self.topology, &self.ctx)?;
        let rebuilt = self
            .mapper
            .rebuild_for_flow(&mut self.topology, &self.placement, key.src, key.dst, key.flow, origin);
        if let Err(err) = rebuilt {
            self.remove_partial_path(key);
            return Err(err);
        }
        let src_host = VirtualNetworkMapper::resolve_host(&self.placement, key.src)?;
        let path = self
            .mapper
            .resolve_concrete_path(&self.topology, key.src, key.dst, key.flow, src_host)?;
        channel.update_route(path, &mut self.topology, &self.ctx)?;
        channel.initialize(&mut self.topology, &self.ctx)
    }

    fn remove_partial_path(&mut self, key: FlowKey) {
        if let Some(src_host) = self.placement.find_host(key.src) {
            self.mapper
                .remove_path(&mut self.topology, key.src, key.dst, key.flow, src_host);
        }
    }

    /// Re-validates paths of all channels against a dynamic link selection policy and reroutes the changed ones.
    ///
    /// Returns the number of rerouted channels. Does nothing for static policies.
    /// If some flow can't be routed, the other channels are still refreshed and readjusted,
    /// then the first such error is returned.
    pub fn refresh_dynamic_paths(&mut self) -> Result<usize, NetworkError> {
        if !self.mapper.policy().is_dynamic() {
            return Ok(0);
        }
        let ids: Vec<ChannelId> = self.channels.keys().copied().collect();
        let mut rerouted = 0;
        let mut failed = None;
        for id in ids {
            let mut channel = match self.channels.remove(&id) {
                Some(channel) => channel,
                None => continue,
            };
            let result = self.refresh_channel_path(&mut channel);
            self.channels.insert(id, channel);
            match result {
                Ok(true) => rerouted += 1,
                Ok(false) => {}
                Err(err) => {
                    self.report(&err, format_args!("can't refresh path of channel {}", id));
                    if err.is_fatal() {
                        return Err(err);
                    }
                    failed.get_or_insert(err);
                }
            }
        }
        if rerouted > 0 || failed.is_some() {
            log_debug!(self.ctx, "rerouted {} channels", rerouted);
            let result = self.adjust_channels();
            self.check(result, "bandwidth adjustment failed")?;
        }
        failed.map_or(Ok(rerouted), Err)
    }

    fn refresh_channel_path(&mut self, channel: &mut Channel) -> Result<bool, NetworkError> {
        if !channel.is_registered() || channel.links().is_empty() {
            return Ok(false);
        }
        let key = channel.key();
        let source = channel.source();
        // the channel must not see its own load while its path is re-evaluated
        channel.terminate(&mut self.topology, &self.ctx)?;
        let changed = match self.mapper.refresh_path(
            &mut self.topology,
            &self.placement,
            source,
            key.src,
            key.dst,
            key.flow,
            false,
        ) {
            Ok(changed) => changed,
            Err(err) => {
                channel.initialize(&mut self.topology, &self.ctx)?;
                return Err(err);
            }
        };
        if changed {
            let path = self
                .mapper
                .resolve_concrete_path(&self.topology, key.src, key.dst, key.flow, source)?;
            for node in channel.nodes().iter().filter(|n| !path.nodes.contains(n)) {
                self.topology.node_mut(*node).forwarding_table_mut().remove(&key);
            }
            log_trace!(self.ctx, "channel {} moved to nodes {:?}", channel.id(), path.nodes);
            channel.update_route(path, &mut self.topology, &self.ctx)?;
        }
        channel.initialize(&mut self.topology, &self.ctx)?;
        Ok(changed)
    }

    /// Recomputes bandwidth of all channels, dedicated ones first. Returns the number of changed channels.
    pub fn adjust_all_channels(&mut self) -> Result<usize, NetworkError> {
        let result = self.adjust_channels();
        self.check(result, "bandwidth adjustment failed")
    }

    fn adjust_channels(&mut self) -> Result<usize, NetworkError> {
        let grant_surplus = self.config.grant_surplus_bandwidth;
        let mut changed = 0;
        for dedicated in [true, false] {
            for channel in self.channels.values_mut().filter(|c| c.is_dedicated() == dedicated) {
                if channel.adjust_bandwidth(&mut self.topology, grant_surplus, &self.ctx)? {
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    /// Administrative update of the bandwidth requested by the channel flow.
    pub fn update_flow_bandwidth(&mut self, id: ChannelId, bandwidth: f64) -> Result<(), NetworkError> {
        let result = self.try_update_flow_bandwidth(id, bandwidth);
        self.check(result, format_args!("can't update bandwidth of channel {}", id))
    }

    fn try_update_flow_bandwidth(&mut self, id: ChannelId, bandwidth: f64) -> Result<(), NetworkError> {
        check_bandwidth(id, bandwidth)?;
        let channel = self.channels.get_mut(&id).ok_or(NetworkError::UnknownChannel(id))?;
        channel.set_requested_bandwidth(bandwidth, &mut self.topology);
        self.adjust_channels()?;
        Ok(())
    }

    // Transmissions ---------------------------------------------------------------------------------------------------

    /// Starts a transmission of `size` bytes in the channel.
    pub fn add_transmission(&mut self, id: ChannelId, size: f64) -> Result<TransmissionId, NetworkError> {
        let time = self.ctx.time();
        let transmission_id = self.next_transmission_id;
        let channel = self.channels.get_mut(&id).ok_or(NetworkError::UnknownChannel(id))?;
        channel.add_transmission(
            Transmission {
                id: transmission_id,
                size,
                start_time: time,
            },
            time,
        );
        self.next_transmission_id += 1;
        log_trace!(self.ctx, "transmission {} of {} bytes added to channel {}", transmission_id, size, id);
        Ok(transmission_id)
    }

    /// Cancels an active transmission.
    pub fn remove_transmission(
        &mut self,
        id: ChannelId,
        transmission: TransmissionId,
    ) -> Result<Option<Transmission>, NetworkError> {
        let time = self.ctx.time();
        let channel = self.channels.get_mut(&id).ok_or(NetworkError::UnknownChannel(id))?;
        Ok(channel.remove_transmission(transmission, time))
    }

    /// Advances transmissions in all channels to the current time and collects the finished ones.
    pub fn process_transmissions(&mut self) -> ProcessedTransmissions {
        let time = self.ctx.time();
        let mut processed = ProcessedTransmissions::default();
        for channel in self.channels.values_mut() {
            channel.update_packet_processing(time);
            let id = channel.id();
            processed
                .completed
                .extend(channel.take_completed().into_iter().map(|t| (id, t)));
            for transmission in channel.take_timed_out() {
                log_warn!(self.ctx, "transmission {} in channel {} timed out", transmission.id, id);
                processed.timed_out.push((id, transmission));
            }
        }
        processed
    }

    /// Returns the earliest completion time among active transmissions, or infinity.
    pub fn next_finish_time(&self) -> f64 {
        self.channels
            .values()
            .map(|c| c.next_finish_time())
            .fold(f64::INFINITY, f64::min)
    }

    // Monitoring ------------------------------------------------------------------------------------------------------

    /// Records throughput of channels and rates of link directions achieved during the last `window` seconds
    /// and refreshes node monitors. A row per channel and per loaded link direction goes to the sink.
    pub fn record_utilization(&mut self, window: f64) -> Result<(), NetworkError> {
        let result = self.try_record_utilization(window);
        self.check(result, "utilization recording failed")
    }

    fn try_record_utilization(&mut self, window: f64) -> Result<(), NetworkError> {
        let time = self.ctx.time();
        let mut rates = FxHashMap::default();
        for channel in self.channels.values_mut() {
            let rate = channel.record_throughput(time, window)?;
            rates.insert(channel.id(), rate);
            let key = channel.key();
            self.sink.append_line(
                &self.ctx,
                "channel_throughput",
                format!(
                    "{},{},{},{},{:.3},{:.3}",
                    channel.id(),
                    key.src,
                    key.dst,
                    key.flow,
                    channel.allocated_bandwidth(),
                    rate
                ),
            );
        }

        for link_id in 0..self.topology.link_count() {
            let (node1, node2) = self.topology.link(link_id).nodes();
            for (from, to) in [(node1, node2), (node2, node1)] {
                let link = self.topology.link(link_id);
                let loaded = link.channel_count(from) > 0;
                let rate: f64 = link
                    .channels(from)
                    .map(|(channel, _)| rates.get(&channel).copied().unwrap_or(0.))
                    .sum();
                let bandwidth = link.bandwidth();
                self.topology.link_mut(link_id).record_rate(from, rate, time)?;
                if loaded {
                    self.sink.append_line(
                        &self.ctx,
                        "link_utilization",
                        format!("{},{},{},{:.3},{:.3}", link_id, from, to, rate, rate / bandwidth),
                    );
                }
            }
        }

        for node in 0..self.topology.node_count() {
            self.topology.refresh_node_monitor(node, time)?;
        }
        self.last_monitoring_time = time;
        Ok(())
    }

    /// Records utilization if the configured monitoring interval has passed since the previous record.
    /// Returns true if it was recorded.
    pub fn on_monitoring_tick(&mut self) -> Result<bool, NetworkError> {
        let window = self.ctx.time() - self.last_monitoring_time;
        if window < self.config.monitoring_interval {
            return Ok(false);
        }
        self.record_utilization(window)?;
        Ok(true)
    }

    /// Saves rows collected by the sink.
    pub fn save_log(&self, path: &str) -> Result<(), std::io::Error> {
        self.sink.save_log(path)
    }

    // Diagnostics -----------------------------------------------------------------------------------------------------

    /// Describes all channels and loaded link directions.
    pub fn dump_state(&self) -> String {
        let mut dump = format!("network state at {:.3}:\n", self.ctx.time());
        for channel in self.channels.values() {
            dump.push_str(&format!("  {}\n", channel));
        }
        for link in self.topology.links() {
            let (node1, node2) = link.nodes();
            for (from, to) in [(node1, node2), (node2, node1)] {
                if link.channel_count(from) == 0 {
                    continue;
                }
                dump.push_str(&format!(
                    "  link {} {}->{} capacity={:.3} dedicated={} (requested {:.3}, allocated {:.3}) shared={} (allocated {:.3})\n",
                    link.id(),
                    from,
                    to,
                    link.bandwidth(),
                    link.dedicated_channel_count(from),
                    link.requested_dedicated_bandwidth(from),
                    link.allocated_dedicated_bandwidth(from),
                    link.shared_channel_count(from),
                    link.allocated_shared_bandwidth(from),
                ));
            }
        }
        dump
    }

    fn report(&self, err: &NetworkError, action: impl fmt::Display) {
        if err.is_fatal() {
            log_error!(self.ctx, "{}: {}\n{}", action, err, self.dump_state());
        } else {
            log_warn!(self.ctx, "{}: {}", action, err);
        }
    }

    fn check<T>(&self, result: Result<T, NetworkError>, action: impl fmt::Display) -> Result<T, NetworkError> {
        if let Err(err) = &result {
            self.report(err, action);
        }
        result
    }

    // Accessors -------------------------------------------------------------------------------------------------------

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn mapper(&self) -> &VirtualNetworkMapper {
        &self.mapper
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(&id)
    }

    /// Returns the id of the channel opened for the flow.
    pub fn channel_id(&self, key: &FlowKey) -> Option<ChannelId> {
        self.channel_by_key.get(key).copied()
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> + '_ {
        self.channels.values()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl HostResolver for VirtualNetwork {
    fn find_host(&self, endpoint: EndpointId) -> Option<NodeId> {
        self.placement.find_host(endpoint)
    }
}

fn fair_share_scheduler() -> Box<dyn TransmissionScheduler> {
    boxed!(FairShareScheduler::new())
}

fn check_bandwidth(channel: ChannelId, bandwidth: f64) -> Result<(), NetworkError> {
    if !bandwidth.is_finite() {
        return Err(NetworkError::NonFiniteBandwidth { channel, bandwidth });
    }
    if bandwidth <= 0. {
        return Err(NetworkError::NonPositiveBandwidth { channel, bandwidth });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::context::ManualClock;
    use crate::routing::build_ecmp_routes;

    fn network(config: NetworkConfig) -> (VirtualNetwork, ManualClock, NodeId, NodeId) {
        let mut topology = Topology::new(config.time_series_max_age);
        let a = topology.add_host("a", 1000.);
        let s = topology.add_switch("s", 1000.);
        let b = topology.add_host("b", 1000.);
        topology.add_link(a, s, 1000., 0.5);
        topology.add_link(s, b, 1000., 0.5);
        build_ecmp_routes(&mut topology);
        let clock = ManualClock::new();
        let ctx = NetworkContext::new("net", Rc::new(clock.clone()));
        let mut net = VirtualNetwork::new(topology, config, ctx);
        net.set_location(1, a);
        net.set_location(2, b);
        (net, clock, a, b)
    }

    #[test]
    fn duplicate_flow_reuses_channel() {
        let (mut net, _, _, _) = network(NetworkConfig::default());
        let id = net.open_channel(FlowConfig::dedicated(1, 2, 0, 100., 0.)).unwrap();
        assert_eq!(net.open_channel(FlowConfig::dedicated(1, 2, 0, 300., 0.)).unwrap(), id);
        assert_eq!(net.channel_count(), 1);
        assert_eq!(net.channel_id(&FlowKey::new(1, 2, 0)), Some(id));
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let (mut net, _, _, _) = network(NetworkConfig::default());
        let err = net.open_channel(FlowConfig::dedicated(1, 2, 0, 0., 0.)).unwrap_err();
        assert!(matches!(err, NetworkError::NonPositiveBandwidth { .. }));
        let err = net
            .open_channel(FlowConfig::dedicated(1, 2, 0, f64::INFINITY, 0.))
            .unwrap_err();
        assert!(matches!(err, NetworkError::NonFiniteBandwidth { .. }));
        assert_eq!(
            net.open_channel(FlowConfig::shared(1, 3)).unwrap_err(),
            NetworkError::EndpointUnresolved { endpoint: 3 }
        );
        assert!(matches!(net.close_channel(5), Err(NetworkError::UnknownChannel(5))));
        assert_eq!(net.channel_count(), 0);
    }

    #[test]
    fn close_removes_forwarding_entries() {
        let (mut net, _, a, _) = network(NetworkConfig::default());
        let id = net.open_channel(FlowConfig::shared(1, 2)).unwrap();
        let key = FlowKey::new(1, 2, -1);
        assert!(net.topology().node(a).forwarding_table().get(&key).is_some());
        let channel = net.close_channel(id).unwrap();
        assert!(!channel.is_registered());
        for node in net.topology().nodes() {
            assert!(node.forwarding_table().get(&key).is_none());
        }
        assert!(net.topology().links().iter().all(|l| !l.is_active()));
    }

    #[test]
    fn monitoring_tick_respects_interval() {
        let mut config = NetworkConfig::default();
        config.monitoring_interval = 10.;
        let (mut net, clock, _, _) = network(config);
        net.open_channel(FlowConfig::shared(1, 2)).unwrap();
        clock.set_time(5.);
        assert!(!net.on_monitoring_tick().unwrap());
        clock.set_time(10.);
        assert!(net.on_monitoring_tick().unwrap());
        clock.set_time(15.);
        assert!(!net.on_monitoring_tick().unwrap());
    }

    #[test]
    fn state_dump_lists_channels_and_links() {
        let (mut net, _, _, _) = network(NetworkConfig::default());
        net.open_channel(FlowConfig::dedicated(1, 2, 0, 400., 0.)).unwrap();
        net.open_channel(FlowConfig::shared(1, 2)).unwrap();
        let dump = net.dump_state();
        assert!(dump.contains("channel 0 (1->2 #0)"));
        assert!(dump.contains("channel 1 (1->2 #-1)"));
        assert!(dump.contains("dedicated=1 (requested 400.000, allocated 400.000) shared=1 (allocated 600.000)"));
    }
}
