//! Native/Desktop WebSocket transport using tokio-tungstenite.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use concord_shared::Frame;
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{ReconnectConfig, SocketError, Transport, TransportEvent};

/// One `open()` .. `close()` lifetime of the transport.
struct Session {
    outbound: UnboundedSender<Frame>,
    stop: Arc<AtomicBool>,
}

/// WebSocket transport with automatic reconnection (Native implementation)
pub struct WsTransport {
    url: String,
    reconnect: ReconnectConfig,
    events: UnboundedSender<TransportEvent>,
    session: RefCell<Option<Session>>,
}

impl WsTransport {
    pub fn new(
        url: impl Into<String>,
        reconnect: ReconnectConfig,
        events: UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            url: url.into(),
            reconnect,
            events,
            session: RefCell::new(None),
        }
    }
}

impl Transport for WsTransport {
    fn open(&self) {
        let mut session = self.session.borrow_mut();
        // A finished session drops its receiver, which closes the sender.
        if session.as_ref().is_some_and(|s| !s.outbound.is_closed()) {
            return;
        }

        let (outbound, receiver) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        *session = Some(Session {
            outbound,
            stop: stop.clone(),
        });

        tokio::spawn(run_session(
            self.url.clone(),
            self.reconnect.clone(),
            self.events.clone(),
            receiver,
            stop,
        ));
    }

    fn close(&self) {
        if let Some(session) = self.session.borrow_mut().take() {
            session.stop.store(true, Ordering::SeqCst);
            // Dropping the sender ends the write side, which closes the socket.
            session.outbound.close_channel();
        }
    }

    fn send(&self, frame: Frame) -> Result<(), SocketError> {
        let session = self.session.borrow();
        let session = session.as_ref().ok_or(SocketError::Closed)?;
        session
            .outbound
            .unbounded_send(frame)
            .map_err(|_| SocketError::Closed)
    }
}

/// Connect, pump frames both ways, and reconnect until stopped or out of attempts.
async fn run_session(
    url: String,
    reconnect: ReconnectConfig,
    events: UnboundedSender<TransportEvent>,
    mut outbound: UnboundedReceiver<Frame>,
    stop: Arc<AtomicBool>,
) {
    let mut attempt = 0u32;

    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }

        match connect_async(&url).await {
            Ok((ws_stream, _response)) => {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                attempt = 0;
                crate::log_info!("Socket connected to {}", url);
                let _ = events.unbounded_send(TransportEvent::Opened);

                let (mut write, mut read) = ws_stream.split();

                loop {
                    tokio::select! {
                        incoming = read.next() => match incoming {
                            Some(Ok(Message::Text(text))) => match Frame::parse(text.as_str()) {
                                Ok(frame) => {
                                    let _ = events.unbounded_send(TransportEvent::Frame(frame));
                                }
                                Err(e) => crate::log_error!("Dropping socket message: {}", e),
                            },
                            Some(Ok(Message::Close(_))) | None => {
                                crate::log_info!("Socket to {} received close", url);
                                break;
                            }
                            Some(Ok(_)) => {
                                // Ping/pong are answered by tungstenite; binary is unused.
                            }
                            Some(Err(e)) => {
                                crate::log_error!("Socket read error: {}", e);
                                break;
                            }
                        },
                        outgoing = outbound.next() => match outgoing {
                            Some(frame) => match frame.to_text() {
                                Ok(json) => {
                                    crate::log_debug!("Sending to {}: {}", url, json);
                                    if let Err(e) = write.send(Message::text(json)).await {
                                        crate::log_error!("Send failed: {}", e);
                                        break;
                                    }
                                }
                                Err(e) => crate::log_error!("Serialize failed: {}", e),
                            },
                            None => {
                                let _ = write.close().await;
                                break;
                            }
                        },
                    }
                }

                // The manager already reported a client-side close.
                if stop.load(Ordering::SeqCst) {
                    crate::log_info!("Socket to {} closed by client", url);
                    break;
                }
                let _ = events.unbounded_send(TransportEvent::Closed {
                    reason: "transport close".to_string(),
                });

                let delay = reconnect.delay_for_attempt(0);
                crate::log_info!("Socket to {} closed, reconnecting in {}ms", url, delay);
                tokio::time::sleep(tokio::time::Duration::from_millis(delay as u64)).await;
            }
            Err(e) => {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                crate::log_error!("Socket error for {}: {}", url, e);
                let _ = events.unbounded_send(TransportEvent::Error {
                    message: e.to_string(),
                });

                if reconnect.exhausted(attempt) {
                    crate::log_error!(
                        "Giving up on {} after {} reconnect attempts",
                        url,
                        reconnect.max_attempts
                    );
                    break;
                }

                let delay = reconnect.delay_for_attempt(attempt);
                crate::log_info!(
                    "Reconnecting to {} in {}ms (attempt {})",
                    url,
                    delay,
                    attempt + 1
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(delay as u64)).await;
                attempt += 1;
            }
        }
    }
}
