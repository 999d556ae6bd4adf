#![doc = include_str!("../README.md")]

pub mod channel;
pub mod config;
pub mod context;
pub mod error;
pub mod flow;
pub mod forwarding;
pub mod link;
pub mod log;
pub mod mapper;
pub mod network;
pub mod node;
pub mod policy;
pub mod routing;
pub mod scheduler;
pub mod sink;
pub mod timeseries;
pub mod topology;

// Re-export for using in macros
pub use colored;

pub use channel::{Channel, ChannelId};
pub use config::NetworkConfig;
pub use context::{Clock, ManualClock, NetworkContext};
pub use error::NetworkError;
pub use flow::{EndpointId, FlowConfig, FlowId, FlowKey, DEFAULT_FLOW_ID};
pub use link::{Link, LinkId};
pub use mapper::{EndpointPlacement, HostResolver, ResolvedPath, VirtualNetworkMapper};
pub use network::{ProcessedTransmissions, SchedulerFactory, VirtualNetwork};
pub use node::{Address, Node, NodeId, NodeKind};
pub use policy::LinkSelectionPolicy;
pub use scheduler::{FairShareScheduler, Transmission, TransmissionId, TransmissionScheduler};
pub use sink::{CsvLogSink, LogSink, StdoutLogSink};
pub use timeseries::{TimeSeries, TimeSeriesError};
pub use topology::Topology;
