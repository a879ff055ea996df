//! Transport seam between the connection manager and the network.

use std::pin::Pin;

use futures_util::{stream::BoxStream, Sink, StreamExt};
use snafu::prelude::*;
use tokio_tungstenite as websocket;
use url::Url;

use super::message::{MessageStreamSink, MessageStreamSinkError, Outbound, TransportEvent};

pub(crate) type WebsocketClient =
    websocket::WebSocketStream<websocket::MaybeTlsStream<tokio::net::TcpStream>>;

/// Write half of an open transport
pub type OutboundSink = Pin<Box<dyn Sink<Outbound, Error = MessageStreamSinkError> + Send>>;

/// Read half of an open transport
pub type InboundStream = BoxStream<'static, Result<TransportEvent, MessageStreamSinkError>>;

/// Error when open a transport
#[derive(Debug, Snafu)]
#[snafu(display("connect telemetry endpoint {endpoint} failed: {source}"))]
pub struct ConnectError {
    /// connected endpoint, without query
    pub endpoint: String,
    /// source error
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl ConnectError {
    /// Wrap any error raised while opening `url`.
    pub fn new<E>(url: &Url, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            endpoint: redact(url),
            source: source.into(),
        }
    }
}

/// Endpoint url with the query (and so the bearer token) stripped, safe to log.
pub(crate) fn redact(url: &Url) -> String {
    let mut u = url.clone();
    u.set_query(None);
    u.to_string()
}

/// Something that can open a push transport to the telemetry server.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a transport to `url`. A returned pair counts as the transport "open" event.
    async fn connect(&self, url: &Url) -> Result<(OutboundSink, InboundStream), ConnectError>;
}

/// [`Connector`] over a real websocket connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebsocketConnector;

#[async_trait::async_trait]
impl Connector for WebsocketConnector {
    async fn connect(&self, url: &Url) -> Result<(OutboundSink, InboundStream), ConnectError> {
        log::debug!("Connecting telemetry endpoint: {}", redact(url));

        let (ws, _) = websocket::connect_async(url.as_str())
            .await
            .map_err(|e| ConnectError::new(url, e))?;

        let (sink, stream) = MessageStreamSink::new(ws).split();

        Ok((Box::pin(sink), stream.boxed()))
    }
}
