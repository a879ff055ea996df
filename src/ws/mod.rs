//! Telemetry server websocket protocol client implement

mod client;
pub mod message;
pub mod router;
pub mod transport;

pub use client::{BackoffPolicy, ConnectionState, Manager};
pub use message::{AlertEvent, AlertSource, Directive, InboundFrame, SensorData, TelemetryRecord};
pub use transport::{ConnectError, Connector, InboundStream, OutboundSink, WebsocketConnector};
