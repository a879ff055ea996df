mod inner;

pub use inner::{BackoffPolicy, ConnectionState};

use std::{fmt::Debug, sync::Arc};

use inner::ClientInner;

use crate::{
    alert::AlertHandler,
    config::{Config, Endpoint},
    store::Snapshot,
    ws::{
        message::TelemetryRecord,
        transport::{Connector, WebsocketConnector},
    },
};

/// Live telemetry connection manager.
///
/// Keeps one push connection to the telemetry server, subscribes every vehicle of
/// the roster after each successful connect, and merges pushed readings over the
/// baseline. Transport failures are retried following the [`BackoffPolicy`] and
/// only ever show up as [`ConnectionState`] changes.
///
/// The manager spawns its transport and timer tasks on the current tokio runtime,
/// so control operations must be called from within one. Cloning gives another
/// handle to the same connection; when the last handle is dropped the transport is
/// closed.
pub struct Manager<C = WebsocketConnector> {
    inner: Arc<ClientInner<C>>,
}

impl<C> Clone for Manager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C> Debug for Manager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.inner.state.lock();
        f.debug_struct("Manager")
            .field("endpoint", &self.inner.endpoint)
            .field("state", &st.handle.state)
            .field("attempt_count", &st.handle.attempt_count)
            .field("roster", &st.roster.len())
            .finish()
    }
}

impl Manager<WebsocketConnector> {
    /// Create a manager connecting over websocket, as described by `config`
    pub fn from_config<H: AlertHandler>(config: &Config, handler: H) -> Self {
        Self::new(
            config.endpoint.clone(),
            config.backoff,
            WebsocketConnector,
            handler,
        )
    }
}

impl<C: Connector> Manager<C> {
    /// Create a manager using a custom transport connector
    pub fn new<H: AlertHandler>(
        endpoint: Endpoint,
        backoff: BackoffPolicy,
        connector: C,
        handler: H,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner::new(
                connector,
                endpoint,
                backoff,
                Arc::new(handler),
            )),
        }
    }

    /// Open the connection using `token`.
    ///
    /// A no-op when `token` is absent or empty, when an attempt is already in
    /// flight, when the transport is already open, or when the attempt ceiling has
    /// been reached (see [`force_reconnect`](Self::force_reconnect)).
    pub fn connect(&self, token: Option<&str>) {
        self.inner.connect(token)
    }

    /// Tear the connection down: unsubscribe everything, close the transport with a
    /// normal code, cancel any pending retry. Safe to call in any state, any number
    /// of times.
    pub fn disconnect(&self) {
        self.inner.disconnect()
    }

    /// Reset the attempt counter and connect again with the last token, unless a
    /// healthy transport is open or an attempt is in flight.
    pub fn force_reconnect(&self) {
        self.inner.force_reconnect()
    }

    /// Replace the vehicle roster. Only vehicles not yet subscribed on the current
    /// connection get a subscribe directive.
    pub fn set_entities<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner
            .set_entities(ids.into_iter().map(Into::into).collect())
    }

    /// Merge a baseline, e.g. the REST vehicle listing, under the live data.
    pub fn seed<I>(&self, records: I)
    where
        I: IntoIterator<Item = TelemetryRecord>,
    {
        self.inner.state.lock().store.seed(records)
    }

    /// current connection state
    pub fn status(&self) -> ConnectionState {
        self.inner.state.lock().handle.state
    }

    /// true while an attempt is in flight
    pub fn is_loading(&self) -> bool {
        self.status() == ConnectionState::Connecting
    }

    /// attempts made since the last successful connect
    pub fn attempt_count(&self) -> u32 {
        self.inner.state.lock().handle.attempt_count
    }

    /// Last known telemetry of every vehicle seen. Kept across disconnects.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.state.lock().store.snapshot()
    }

    /// Last known telemetry of one vehicle.
    pub fn record(&self, vehicle_id: &str) -> Option<TelemetryRecord> {
        self.inner.state.lock().store.get(vehicle_id).cloned()
    }

    /// Vehicles subscribed on the current connection, sorted.
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.state.lock().subscriptions.snapshot()
    }
}
