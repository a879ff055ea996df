mod backoff;
mod state;
mod streaming;
mod subscription;

pub use backoff::BackoffPolicy;
pub use state::ConnectionState;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    alert::SharedHandler,
    config::Endpoint,
    store::TelemetryStore,
    ws::{
        message::{Directive, Outbound},
        router,
        transport::{redact, Connector},
    },
};
use state::ConnectionHandle;
use subscription::SubscriptionTracker;

/// websocket close code for a normal, caller initiated closure
pub(crate) const NORMAL_CLOSE: u16 = 1000;

pub(crate) struct ClientInner<C> {
    pub connector: C,
    pub endpoint: Endpoint,
    pub backoff: BackoffPolicy,
    pub handler: SharedHandler,
    pub state: Mutex<ManagerState>,
}

#[derive(Debug, Default)]
pub(crate) struct ManagerState {
    pub handle: ConnectionHandle,
    pub roster: Vec<String>,
    pub subscriptions: SubscriptionTracker,
    pub store: TelemetryStore,
    /// queue into the live transport, present only while connected
    pub outbound: Option<mpsc::UnboundedSender<Outbound>>,
    /// pending backoff timer
    pub retry: Option<JoinHandle<()>>,
    /// set by disconnect, suppresses automatic retries
    pub stopped: bool,
}

impl ManagerState {
    fn is_live(&self) -> bool {
        self.handle.state == ConnectionState::Connected && self.outbound.is_some()
    }

    fn send(&self, directives: Vec<Directive>) {
        if let Some(ref tx) = self.outbound {
            for directive in directives {
                log::trace!("Queue {:?}", directive);
                if tx.send(Outbound::Directive(directive)).is_err() {
                    log::debug!("Transport task already stopped, drop queued directives");
                    return;
                }
            }
        }
    }

    fn cancel_retry(&mut self) {
        if let Some(retry) = self.retry.take() {
            log::debug!("Cancel pending retry");
            retry.abort();
        }
    }

    fn close_transport(&mut self, code: u16) {
        if let Some(tx) = self.outbound.take() {
            log::debug!("Close transport with code {}", code);
            let _ = tx.send(Outbound::Close { code });
        }
    }
}

impl<C: Connector> ClientInner<C> {
    pub fn new(
        connector: C,
        endpoint: Endpoint,
        backoff: BackoffPolicy,
        handler: SharedHandler,
    ) -> Self {
        Self {
            connector,
            endpoint,
            backoff,
            handler,
            state: Mutex::new(ManagerState::default()),
        }
    }

    pub fn connect(self: &Arc<Self>, token: Option<&str>) {
        let mut guard = self.state.lock();
        self.connect_locked(&mut guard, token);
    }

    fn connect_locked(self: &Arc<Self>, st: &mut ManagerState, token: Option<&str>) {
        let token = match token.filter(|t| !t.is_empty()) {
            Some(t) => t,
            None => {
                log::warn!("No token available, connection not permitted");
                return;
            }
        };

        match st.handle.state {
            ConnectionState::Connecting => {
                log::debug!("Connect ignored, an attempt is already in flight");
                return;
            }
            ConnectionState::Connected if st.outbound.is_some() => {
                log::debug!("Connect ignored, transport already open");
                return;
            }
            _ => {}
        }

        if !self.backoff.permits(st.handle.attempt_count) {
            log::warn!(
                "Connect refused, {} attempt(s) made without success",
                st.handle.attempt_count
            );
            return;
        }

        st.stopped = false;
        st.cancel_retry();
        st.close_transport(NORMAL_CLOSE);
        st.subscriptions.clear();

        let generation = st.handle.begin_attempt(token);
        let url = self.endpoint.url_with_token(token);

        log::info!(
            "Connecting {} (attempt {}/{})",
            redact(&url),
            st.handle.attempt_count,
            self.backoff.max_attempts
        );

        tokio::spawn(streaming::run(Arc::downgrade(self), generation, url));
    }

    pub fn disconnect(&self) {
        let mut guard = self.state.lock();
        let st = &mut *guard;

        st.stopped = true;
        st.cancel_retry();

        let unsubscribes = st.subscriptions.drain_unsubscribes();
        st.send(unsubscribes);
        st.close_transport(NORMAL_CLOSE);

        st.handle.abandon();
        st.handle.attempt_count = 0;
        st.handle.move_to(ConnectionState::Disconnected);

        log::info!("Disconnected by caller");
    }

    pub fn force_reconnect(self: &Arc<Self>) {
        let mut guard = self.state.lock();
        let st = &mut *guard;

        if st.is_live() {
            log::debug!("Force reconnect ignored, transport is healthy");
            return;
        }
        if st.handle.state == ConnectionState::Connecting {
            log::debug!("Force reconnect ignored, an attempt is already in flight");
            return;
        }

        log::info!("Force reconnect, reset attempt counter");
        st.handle.attempt_count = 0;

        let token = st.handle.last_token.clone();
        self.connect_locked(st, token.as_deref());
    }

    pub fn set_entities(&self, ids: Vec<String>) {
        let mut guard = self.state.lock();
        let st = &mut *guard;

        let mut roster: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            if !id.is_empty() && !roster.contains(&id) {
                roster.push(id);
            }
        }
        st.roster = roster;

        let connected = st.is_live();
        let directives = st.subscriptions.on_entities_changed(&st.roster, connected);
        st.send(directives);
    }

    /// transport open event, false if the transport is stale and must be closed
    pub(super) fn on_open(&self, generation: u64, tx: mpsc::UnboundedSender<Outbound>) -> bool {
        let mut guard = self.state.lock();
        let st = &mut *guard;

        if !st.handle.is_current(generation) {
            return false;
        }

        st.handle.on_open();
        st.subscriptions.clear();
        st.outbound = Some(tx);

        let directives = st.subscriptions.on_connected(&st.roster);
        st.send(directives);

        log::info!("Connected, live telemetry streaming");
        true
    }

    /// one inbound text frame, processed fully before the next
    pub(super) fn on_text(&self, generation: u64, raw: &str) {
        let routed = router::route(raw);
        if routed.is_dropped() {
            return;
        }

        let alert = {
            let mut st = self.state.lock();
            if !st.handle.is_current(generation) {
                log::trace!("Drop frame from a closed transport");
                return;
            }
            routed.apply(&mut st.store)
        };

        if let Some(alert) = alert {
            self.handler.on_alert(&alert);
        }
    }

    /// transport close or error event
    pub(super) fn on_down(self: &Arc<Self>, generation: u64, code: Option<u16>) {
        let mut guard = self.state.lock();
        let st = &mut *guard;

        if !st.handle.is_current(generation) {
            return;
        }

        st.outbound = None;
        st.subscriptions.clear();
        st.handle.move_to(ConnectionState::Disconnected);

        if code == Some(NORMAL_CLOSE) {
            log::info!("Transport closed normally, no retry");
            return;
        }
        if st.stopped {
            return;
        }

        match self.backoff.next_delay(st.handle.attempt_count) {
            Some(delay) => {
                log::info!("Transport lost (code {:?}), retry in {:?}", code, delay);
                self.schedule_retry(st, generation, delay);
            }
            None => {
                log::warn!(
                    "Transport lost (code {:?}), giving up after {} attempt(s)",
                    code,
                    st.handle.attempt_count
                );
                st.handle.move_to(ConnectionState::GivenUp);
            }
        }
    }

    fn schedule_retry(
        self: &Arc<Self>,
        st: &mut ManagerState,
        generation: u64,
        delay: std::time::Duration,
    ) {
        let inner = Arc::downgrade(self);
        st.cancel_retry();
        st.retry = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                inner.retry(generation);
            }
        }));
    }

    fn retry(self: &Arc<Self>, generation: u64) {
        let mut guard = self.state.lock();
        let st = &mut *guard;

        // this task owns the handle; dropping it does not abort anything
        st.retry = None;

        if st.stopped
            || !st.handle.is_current(generation)
            || st.handle.state != ConnectionState::Disconnected
        {
            log::debug!("Stale retry timer fired, ignore");
            return;
        }

        let token = st.handle.last_token.clone();
        self.connect_locked(st, token.as_deref());
    }
}
