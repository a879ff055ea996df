//! # Fleetlink
//!
//! Live vehicle telemetry for fleet dashboards: one push connection to the
//! telemetry server, a subscription per tracked vehicle, and a merged snapshot of
//! the last known readings of every vehicle.
//!
//! ```no_run
//! # async fn run() -> fleetlink::Result<()> {
//! let config = fleetlink::Config::from_env().map_err(|source| fleetlink::Error::LoadConfigFailed { source })?;
//! let session = fleetlink::Session::start(&config, Some("token"), |alert: &fleetlink::AlertEvent| {
//!     println!("{} {}", alert.vehicle_id, alert.category);
//! })
//! .await?;
//!
//! println!("{}", session.manager().status());
//! # Ok(())
//! # }
//! ```

#![deny(missing_debug_implementations, missing_docs)]
#![forbid(unsafe_code)]

pub mod alert;
pub mod api;
pub mod config;
pub mod store;
pub mod ws;

mod error;
mod session;

pub use alert::AlertHandler;
pub use config::Config;
pub use error::{Error, Result};
pub use session::Session;
pub use store::{Snapshot, TelemetryStore};
pub use ws::{AlertEvent, ConnectionState, Manager, TelemetryRecord};
