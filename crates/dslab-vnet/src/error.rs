//! Network errors.

use thiserror::Error;

use crate::channel::ChannelId;
use crate::flow::{EndpointId, FlowKey};
use crate::node::NodeId;
use crate::timeseries::TimeSeriesError;

/// Errors produced by path construction and bandwidth allocation.
///
/// [`EndpointUnresolved`](NetworkError::EndpointUnresolved) and [`NoRouteToHost`](NetworkError::NoRouteToHost)
/// are recoverable at the flow level: the flow is simply not admitted or rerouted.
/// All other variants signal an inconsistent model and should stop the simulation run, see [`NetworkError::is_fatal`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NetworkError {
    #[error("endpoint {endpoint} is not placed on any host")]
    EndpointUnresolved { endpoint: EndpointId },

    #[error("no route from node {node} to host {dst_host} for flow {key}")]
    NoRouteToHost { node: NodeId, dst_host: NodeId, key: FlowKey },

    #[error("broken forwarding chain for flow {key} at node {node}: {reason}")]
    BrokenChain { node: NodeId, key: FlowKey, reason: String },

    #[error("channel {channel} got non-positive bandwidth {bandwidth}")]
    NonPositiveBandwidth { channel: ChannelId, bandwidth: f64 },

    #[error("channel {channel} got non-finite bandwidth {bandwidth}")]
    NonFiniteBandwidth { channel: ChannelId, bandwidth: f64 },

    #[error("unknown channel {0}")]
    UnknownChannel(ChannelId),

    #[error(transparent)]
    TimeSeries(#[from] TimeSeriesError),
}

impl NetworkError {
    /// Returns true if the error indicates a modeling defect and the current run must be aborted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NetworkError::BrokenChain { .. }
                | NetworkError::NonPositiveBandwidth { .. }
                | NetworkError::NonFiniteBandwidth { .. }
                | NetworkError::TimeSeries(_)
        )
    }
}
