use std::{borrow::Cow, task::Poll};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use snafu::prelude::*;
use tokio_tungstenite::tungstenite::{
    self as websocket,
    protocol::{frame::coding::CloseCode, CloseFrame},
};

use super::Directive;
use crate::ws::transport::WebsocketClient;

/// Error when read/write transport stream/sink
#[derive(Debug, Snafu)]
#[snafu(module(error), context(suffix(false)))]
pub enum MessageStreamSinkError {
    /// underlying websocket stream broken
    #[snafu(display("underlying websocket stream broken: {source}"))]
    Websocket {
        /// source error
        source: websocket::Error,
    },

    /// received a non-text data frame
    #[snafu(display("received a non-text type frame"))]
    NotTextFrame,

    /// the peer side of an in-memory transport went away
    #[snafu(display("transport closed: {reason}"))]
    Closed {
        /// why the transport is gone
        reason: String,
    },
}

impl MessageStreamSinkError {
    /// Check if this error will make the stream/sink stop
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Websocket { .. } => true,
            Self::NotTextFrame => false,
            Self::Closed { .. } => true,
        }
    }
}

/// What a transport reports upward
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// one text frame, still undecoded
    Text(String),
    /// the transport is closed, with the close code if the peer sent one
    Closed {
        /// websocket close code
        code: Option<u16>,
    },
}

/// What the manager asks a transport to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// a subscription directive
    Directive(Directive),
    /// close handshake with the given code
    Close {
        /// websocket close code
        code: u16,
    },
}

/// Telemetry websocket frame stream/sink
#[derive(Debug)]
pub struct MessageStreamSink {
    ws: WebsocketClient,
}

impl MessageStreamSink {
    /// Construct a new stream with underlying websocket connection.
    pub fn new(ws: WebsocketClient) -> Self {
        Self { ws }
    }
}

impl Stream for MessageStreamSink {
    type Item = Result<TransportEvent, MessageStreamSinkError>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        loop {
            let frame = match self.ws.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Ready(Some(frame)) => frame.context(error::Websocket)?,
            };

            let result = match frame {
                websocket::Message::Text(data) => Ok(TransportEvent::Text(data)),
                websocket::Message::Close(close) => Ok(TransportEvent::Closed {
                    code: close.map(|c| u16::from(c.code)),
                }),
                // tungstenite answers pings itself
                websocket::Message::Ping(_) | websocket::Message::Pong(_) => continue,
                _ => Err(MessageStreamSinkError::NotTextFrame),
            };

            return Poll::Ready(Some(result));
        }
    }
}

impl Sink<Outbound> for MessageStreamSink {
    type Error = MessageStreamSinkError;

    fn poll_ready(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        self.ws
            .poll_ready_unpin(cx)
            .map_err(|e| Self::Error::Websocket { source: e })
    }

    fn start_send(mut self: std::pin::Pin<&mut Self>, item: Outbound) -> Result<(), Self::Error> {
        let frame = match item {
            Outbound::Directive(directive) => websocket::Message::Text(directive.encode()),
            Outbound::Close { code } => websocket::Message::Close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: Cow::Borrowed(""),
            })),
        };
        self.ws
            .start_send_unpin(frame)
            .map_err(|e| Self::Error::Websocket { source: e })
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        self.ws
            .poll_flush_unpin(cx)
            .map_err(|e| Self::Error::Websocket { source: e })
    }

    fn poll_close(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Result<(), Self::Error>> {
        self.ws
            .poll_close_unpin(cx)
            .map_err(|e| Self::Error::Websocket { source: e })
    }
}
