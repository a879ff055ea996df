#![allow(dead_code)]

use std::{collections::VecDeque, sync::Arc};

use fleetlink::{
    config::Endpoint,
    ws::{
        message::{MessageStreamSinkError, Outbound, TransportEvent},
        BackoffPolicy, ConnectError, Connector, Directive, InboundStream, OutboundSink,
    },
    AlertEvent, Manager, TelemetryRecord,
};
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use url::Url;

pub type ServerTx = mpsc::UnboundedSender<Result<TransportEvent, MessageStreamSinkError>>;

#[derive(Debug, Clone, Copy)]
pub enum Plan {
    Accept,
    Refuse,
    Hang,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub plans: VecDeque<Plan>,
    pub urls: Vec<String>,
    pub servers: Vec<ServerTx>,
    pub sent: Vec<(usize, Outbound)>,
}

#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    pub state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn plan(&self, plans: &[Plan]) {
        self.state.lock().plans.extend(plans.iter().copied());
    }

    pub fn connects(&self) -> usize {
        self.state.lock().urls.len()
    }

    pub fn url(&self, n: usize) -> String {
        self.state.lock().urls[n].clone()
    }

    pub fn push(&self, conn: usize, event: TransportEvent) {
        let _ = self.state.lock().servers[conn].send(Ok(event));
    }

    pub fn push_text(&self, conn: usize, value: serde_json::Value) {
        self.push(conn, TransportEvent::Text(value.to_string()));
    }

    pub fn sent(&self, conn: usize) -> Vec<Outbound> {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|(c, _)| *c == conn)
            .map(|(_, o)| o.clone())
            .collect()
    }

    pub fn subscribes(&self, conn: usize) -> Vec<String> {
        self.sent(conn)
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Directive(Directive::Subscribe { vehicle_id }) => Some(vehicle_id),
                _ => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &Url) -> Result<(OutboundSink, InboundStream), ConnectError> {
        let plan = {
            let mut st = self.state.lock();
            st.urls.push(url.to_string());
            st.plans.pop_front().unwrap_or(Plan::Refuse)
        };

        match plan {
            Plan::Refuse => Err(ConnectError::new(url, "connection refused")),
            Plan::Hang => futures_util::future::pending().await,
            Plan::Accept => {
                let (tx, rx) = mpsc::unbounded_channel();
                let conn = {
                    let mut st = self.state.lock();
                    st.servers.push(tx);
                    st.servers.len() - 1
                };

                let state = self.state.clone();
                let sink: OutboundSink = Box::pin(futures_util::sink::unfold(
                    (),
                    move |(), item: Outbound| {
                        let state = state.clone();
                        async move {
                            state.lock().sent.push((conn, item));
                            Ok::<_, MessageStreamSinkError>(())
                        }
                    },
                ));

                let stream = futures_util::stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|event| (event, rx))
                })
                .boxed();

                Ok((sink, stream))
            }
        }
    }
}

pub type Alerts = Arc<Mutex<Vec<AlertEvent>>>;

pub fn manager(connector: &MockConnector) -> (Manager<MockConnector>, Alerts) {
    let alerts: Alerts = Arc::default();
    let sink = alerts.clone();
    let manager = Manager::new(
        "ws://telemetry.test/live".parse::<Endpoint>().unwrap(),
        BackoffPolicy::default(),
        connector.clone(),
        move |alert: &AlertEvent| sink.lock().push(alert.clone()),
    );
    (manager, alerts)
}

pub fn record(id: &str, speed: f64) -> TelemetryRecord {
    TelemetryRecord {
        vehicle_id: id.to_string(),
        speed: Some(speed),
        ..Default::default()
    }
}

/// let spawned tasks run until they block
pub async fn settle() {
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
}

