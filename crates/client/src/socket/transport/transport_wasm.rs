//! WASM/Web WebSocket transport using web_sys::WebSocket.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use concord_shared::Frame;
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::StreamExt;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{js_sys, CloseEvent, MessageEvent, WebSocket};

use super::{ReconnectConfig, SocketError, Transport, TransportEvent};

struct Session {
    outbound: UnboundedSender<Frame>,
    stop: Rc<Cell<bool>>,
    socket: Rc<RefCell<Option<WebSocket>>>,
}

/// WebSocket transport with automatic reconnection (WASM implementation)
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
        if session.as_ref().is_some_and(|s| !s.outbound.is_closed()) {
            return;
        }

        let (outbound, receiver) = unbounded();
        let stop = Rc::new(Cell::new(false));
        let socket = Rc::new(RefCell::new(None));
        *session = Some(Session {
            outbound,
            stop: stop.clone(),
            socket: socket.clone(),
        });

        spawn_local(run_session(
            absolute_socket_url(&self.url),
            self.reconnect.clone(),
            self.events.clone(),
            receiver,
            stop,
            socket,
        ));
    }

    fn close(&self) {
        if let Some(session) = self.session.borrow_mut().take() {
            session.stop.set(true);
            session.outbound.close_channel();
            if let Some(ws) = session.socket.borrow_mut().take() {
                let _ = ws.close();
            }
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

/// Resolve an origin-relative socket path against the page origin.
fn absolute_socket_url(url: &str) -> String {
    if url.contains("://") {
        return url.to_string();
    }
    let origin = web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_default();
    let ws_origin = if let Some(rest) = origin.strip_prefix("https://") {
        format!("wss://{rest}")
    } else {
        origin.replacen("http://", "ws://", 1)
    };
    let path = if url.starts_with('/') {
        url.to_string()
    } else {
        format!("/{url}")
    };
    format!("{}{}", ws_origin.trim_end_matches('/'), path)
}

async fn run_session(
    url: String,
    reconnect: ReconnectConfig,
    events: UnboundedSender<TransportEvent>,
    outbound: UnboundedReceiver<Frame>,
    stop: Rc<Cell<bool>>,
    socket: Rc<RefCell<Option<WebSocket>>>,
) {
    spawn_local(send_loop(outbound, socket.clone(), url.clone()));
    let mut attempt = 0u32;

    loop {
        if stop.get() {
            break;
        }

        match connect_websocket(&url, events.clone()).await {
            Ok(ws) => {
                if stop.get() {
                    let _ = ws.close();
                    break;
                }
                attempt = 0;
                crate::log_info!("Socket connected to {}", url);
                *socket.borrow_mut() = Some(ws.clone());
                let _ = events.unbounded_send(TransportEvent::Opened);

                let (close_tx, mut close_rx) = unbounded::<String>();
                let onclose_callback = Closure::wrap(Box::new(move |e: CloseEvent| {
                    let reason = if e.reason().is_empty() {
                        format!("Code {}", e.code())
                    } else {
                        e.reason()
                    };
                    let _ = close_tx.unbounded_send(reason);
                }) as Box<dyn FnMut(CloseEvent)>);
                ws.set_onclose(Some(onclose_callback.as_ref().unchecked_ref()));
                onclose_callback.forget();

                let reason = close_rx
                    .next()
                    .await
                    .unwrap_or_else(|| "transport close".to_string());
                socket.borrow_mut().take();

                // The manager already reported a client-side close.
                if stop.get() {
                    crate::log_info!("Socket to {} closed by client", url);
                    break;
                }
                crate::log_info!("Socket to {} closed: {}", url, reason);
                let _ = events.unbounded_send(TransportEvent::Closed { reason });

                gloo_timers::future::TimeoutFuture::new(reconnect.delay_for_attempt(0)).await;
            }
            Err(e) => {
                if stop.get() {
                    break;
                }
                crate::log_error!("Socket error for {}: {}", url, e);
                let _ = events.unbounded_send(TransportEvent::Error { message: e });

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
                gloo_timers::future::TimeoutFuture::new(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Write outbound frames to whichever socket is currently open. Ends when the
/// session's sender is closed.
async fn send_loop(
    mut outbound: UnboundedReceiver<Frame>,
    socket: Rc<RefCell<Option<WebSocket>>>,
    url: String,
) {
    while let Some(frame) = outbound.next().await {
        let ws = socket.borrow().clone();
        // readyState 1 = OPEN
        let Some(ws) = ws.filter(|ws| ws.ready_state() == 1) else {
            crate::log_debug!("Socket to {} not open, dropping {}", url, frame.event);
            continue;
        };
        match frame.to_text() {
            Ok(json) => {
                crate::log_debug!("Sending to {}: {}", url, json);
                if let Err(e) = ws.send_with_str(&json) {
                    crate::log_error!("Send failed: {:?}", e);
                }
            }
            Err(e) => crate::log_error!("Serialize failed: {}", e),
        }
    }
}

/// Open a WebSocket and wait until it is ready, forwarding incoming frames.
async fn connect_websocket(
    url: &str,
    events: UnboundedSender<TransportEvent>,
) -> Result<WebSocket, String> {
    let ws = WebSocket::new(url).map_err(|e| format!("Failed to create WebSocket: {:?}", e))?;

    let is_open = Rc::new(Cell::new(false));
    let error_reason = Rc::new(RefCell::new(None::<String>));

    let is_open_clone = is_open.clone();
    let onopen_callback = Closure::wrap(Box::new(move |_: web_sys::Event| {
        is_open_clone.set(true);
    }) as Box<dyn FnMut(web_sys::Event)>);
    ws.set_onopen(Some(onopen_callback.as_ref().unchecked_ref()));
    onopen_callback.forget();

    let error_reason_close = error_reason.clone();
    let onclose_callback = Closure::wrap(Box::new(move |e: CloseEvent| {
        *error_reason_close.borrow_mut() = Some(format!("Closed before open (code {})", e.code()));
    }) as Box<dyn FnMut(CloseEvent)>);
    ws.set_onclose(Some(onclose_callback.as_ref().unchecked_ref()));
    onclose_callback.forget();

    let error_reason_err = error_reason.clone();
    let onerror_callback = Closure::wrap(Box::new(move |_: web_sys::ErrorEvent| {
        *error_reason_err.borrow_mut() = Some("WebSocket error".to_string());
    }) as Box<dyn FnMut(web_sys::ErrorEvent)>);
    ws.set_onerror(Some(onerror_callback.as_ref().unchecked_ref()));
    onerror_callback.forget();

    let onmessage_callback = Closure::wrap(Box::new(move |e: MessageEvent| {
        if let Ok(text) = e.data().dyn_into::<js_sys::JsString>() {
            let text: String = text.into();
            match Frame::parse(&text) {
                Ok(frame) => {
                    let _ = events.unbounded_send(TransportEvent::Frame(frame));
                }
                Err(e) => crate::log_error!("Dropping socket message: {}", e),
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);
    ws.set_onmessage(Some(onmessage_callback.as_ref().unchecked_ref()));
    onmessage_callback.forget();

    // 5 second timeout
    for _ in 0..500 {
        if is_open.get() {
            return Ok(ws);
        }
        if let Some(reason) = error_reason.borrow().clone() {
            return Err(reason);
        }
        gloo_timers::future::TimeoutFuture::new(10).await;
    }

    let _ = ws.close();
    Err("Connection timeout".to_string())
}
