//! Flow identifiers and static flow requirements.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a traffic endpoint (normally a virtual machine).
pub type EndpointId = u32;

/// Flow identifier.
pub type FlowId = i32;

/// Flow id reserved for default best-effort traffic which is carried by shared channels.
pub const DEFAULT_FLOW_ID: FlowId = -1;

/// Returns true if flows with the given id get an admission-controlled dedicated channel.
pub fn is_dedicated(flow: FlowId) -> bool {
    flow != DEFAULT_FLOW_ID
}

/// Key identifying a flow in forwarding tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowKey {
    pub src: EndpointId,
    pub dst: EndpointId,
    pub flow: FlowId,
}

impl FlowKey {
    pub fn new(src: EndpointId, dst: EndpointId, flow: FlowId) -> Self {
        Self { src, dst, flow }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}->{} #{}", self.src, self.dst, self.flow)
    }
}

/// Static requirement of a flow between two endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    pub src: EndpointId,
    pub dst: EndpointId,
    pub flow: FlowId,
    /// Requested bandwidth, ignored for shared flows.
    pub bandwidth: f64,
    /// Requested latency, informational.
    pub latency: f64,
}

impl FlowConfig {
    /// Creates requirement of a dedicated flow.
    pub fn dedicated(src: EndpointId, dst: EndpointId, flow: FlowId, bandwidth: f64, latency: f64) -> Self {
        assert!(is_dedicated(flow), "Flow id {} is reserved for shared flows", flow);
        Self {
            src,
            dst,
            flow,
            bandwidth,
            latency,
        }
    }

    /// Creates requirement of a default best-effort flow.
    pub fn shared(src: EndpointId, dst: EndpointId) -> Self {
        Self {
            src,
            dst,
            flow: DEFAULT_FLOW_ID,
            bandwidth: 0.,
            latency: 0.,
        }
    }

    pub fn key(&self) -> FlowKey {
        FlowKey::new(self.src, self.dst, self.flow)
    }

    pub fn is_dedicated(&self) -> bool {
        is_dedicated(self.flow)
    }

    /// Administrative update of the requested bandwidth.
    pub fn set_bandwidth(&mut self, bandwidth: f64) {
        self.bandwidth = bandwidth;
    }
}
