use std::sync::Weak;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use url::Url;

use super::{ClientInner, NORMAL_CLOSE};
use crate::ws::{
    message::{Outbound, TransportEvent},
    transport::{Connector, OutboundSink},
};

async fn close(sink: &mut OutboundSink, code: u16) {
    if let Err(err) = sink.send(Outbound::Close { code }).await {
        log::debug!("Send close frame failed: {}", err);
    }
}

/// Background task owning one transport, from opening it to its terminal event.
///
/// Every event is reported with `generation`; the manager ignores the ones that no
/// longer belong to its current transport.
pub(super) async fn run<C: Connector>(inner: Weak<ClientInner<C>>, generation: u64, url: Url) {
    log::debug!("Transport task {} start", generation);

    let (mut sink, mut stream) = {
        let client = match inner.upgrade() {
            Some(c) => c,
            None => return,
        };

        let limit = client.backoff.connect_timeout;
        match tokio::time::timeout(limit, client.connector.connect(&url)).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(err)) => {
                log::warn!("Open transport failed: {}", err);
                client.on_down(generation, None);
                return;
            }
            Err(_) => {
                log::warn!("Open transport timeout after {:?}", limit);
                client.on_down(generation, None);
                return;
            }
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();

    let accepted = match inner.upgrade() {
        Some(client) => client.on_open(generation, tx),
        None => false,
    };
    if !accepted {
        log::debug!("Transport {} opened after being abandoned, close it", generation);
        close(&mut sink, NORMAL_CLOSE).await;
        return;
    }

    loop {
        tokio::select! {
            biased;

            // directives queued by the manager, in order
            outbound = rx.recv() => {
                match outbound {
                    Some(Outbound::Close { code }) => {
                        close(&mut sink, code).await;
                        log::debug!("Transport {} closed by manager", generation);
                        break;
                    }
                    Some(message) => {
                        if let Err(err) = sink.send(message).await {
                            log::warn!("Transport broken when send directive: {}", err);
                            if let Some(client) = inner.upgrade() {
                                client.on_down(generation, None);
                            }
                            break;
                        }
                    }
                    None => {
                        log::debug!("Manager dropped, close transport {}", generation);
                        close(&mut sink, NORMAL_CLOSE).await;
                        break;
                    }
                }
            }

            // new frame received
            event = stream.next() => {
                let client = match inner.upgrade() {
                    Some(c) => c,
                    None => {
                        close(&mut sink, NORMAL_CLOSE).await;
                        break;
                    }
                };

                match event {
                    Some(Ok(TransportEvent::Text(raw))) => client.on_text(generation, &raw),
                    Some(Ok(TransportEvent::Closed { code })) => {
                        log::debug!("Transport {} closed by server, code {:?}", generation, code);
                        client.on_down(generation, code);
                        break;
                    }
                    Some(Err(err)) if !err.is_fatal() => {
                        log::warn!("Transport error happened but ignored: {}", err);
                    }
                    Some(Err(err)) => {
                        log::warn!("Transport broken when receive frame: {}", err);
                        client.on_down(generation, None);
                        break;
                    }
                    None => {
                        log::warn!("Transport {} ended without close frame", generation);
                        client.on_down(generation, None);
                        break;
                    }
                }
            }
        }
    }

    log::debug!("Transport task {} stop", generation);
}
