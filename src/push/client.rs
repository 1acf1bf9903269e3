//! Push socket client
//!
//! Connects to the server's websocket endpoint with the same trust material
//! as the HTTP sessions and invokes every registered handler, in registration
//! order, for each text message. Async handlers are awaited before the next
//! handler runs. A dropped socket is not reconnected.

use crate::{Result, session::TlsTrust};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type PushSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PushSink = SplitSink<PushSocket, Message>;

/// Handler awaited for every push message
#[async_trait]
pub trait AsyncPushHandler: Send + Sync {
    /// Handle one message
    async fn handle(&self, message: String);
}

#[async_trait]
impl<F, Fut> AsyncPushHandler for F
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, message: String) {
        (self)(message).await
    }
}

#[derive(Clone)]
enum PushHandler {
    Sync(Arc<dyn Fn(&str) + Send + Sync>),
    Async(Arc<dyn AsyncPushHandler>),
}

impl PushHandler {
    async fn call(&self, message: &str) {
        match self {
            PushHandler::Sync(handler) => handler(message),
            PushHandler::Async(handler) => handler.handle(message.to_string()).await,
        }
    }
}

/// Websocket client for server push messages
pub struct PushClient {
    trust: TlsTrust,
    handlers: Arc<RwLock<Vec<PushHandler>>>,
    sink: Arc<tokio::sync::Mutex<Option<PushSink>>>,
    connected: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for PushClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushClient")
            .field("handlers", &self.handler_count())
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl PushClient {
    /// Create a disconnected client
    pub fn new(trust: TlsTrust) -> Self {
        Self {
            trust,
            handlers: Arc::new(RwLock::new(Vec::new())),
            sink: Arc::new(tokio::sync::Mutex::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Register a handler called synchronously for each message
    pub fn register<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.push_handler(PushHandler::Sync(Arc::new(handler)));
    }

    /// Register a handler awaited for each message
    pub fn register_async<H>(&self, handler: H)
    where
        H: AsyncPushHandler + 'static,
    {
        self.push_handler(PushHandler::Async(Arc::new(handler)));
    }

    fn push_handler(&self, handler: PushHandler) {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(handler);
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the socket is open
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Open the socket and start dispatching messages
    ///
    /// An existing connection is closed first.
    pub async fn connect(&self, url: &str) -> Result<()> {
        self.close().await;

        let connector = if url.starts_with("wss://") {
            Some(Connector::NativeTls(self.trust.native_connector()?))
        } else {
            None
        };

        let (socket, _) =
            tokio_tungstenite::connect_async_tls_with_config(url, None, false, connector)
                .await
                .map_err(|e| crate::Error::push(format!("Failed to connect push socket: {}", e)))?;

        info!("Connected push socket");
        let (sink, stream) = socket.split();
        *self.sink.lock().await = Some(sink);
        self.connected.store(true, Ordering::Release);

        let task = tokio::spawn(receive_loop(
            stream,
            self.handlers.clone(),
            self.sink.clone(),
            self.connected.clone(),
        ));
        if let Some(previous) = self
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(task)
        {
            previous.abort();
        }

        Ok(())
    }

    /// Send a text message
    pub async fn send(&self, text: impl Into<String>) -> Result<()> {
        let mut sink = self.sink.lock().await;
        let Some(sink) = sink.as_mut().filter(|_| self.is_connected()) else {
            return Err(crate::Error::PushNotConnected);
        };
        sink.send(Message::Text(text.into()))
            .await
            .map_err(|e| crate::Error::push(format!("Failed to send push message: {}", e)))
    }

    /// Stop dispatching and close the socket
    pub async fn close(&self) {
        if let Some(task) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
        self.connected.store(false, Ordering::Release);

        if let Some(mut sink) = self.sink.lock().await.take() {
            if let Err(e) = sink.close().await {
                debug!("Push socket close: {}", e);
            }
            info!("Closed push socket");
        }
    }
}

impl Drop for PushClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
    }
}

async fn receive_loop(
    mut stream: SplitStream<PushSocket>,
    handlers: Arc<RwLock<Vec<PushHandler>>>,
    sink: Arc<tokio::sync::Mutex<Option<PushSink>>>,
    connected: Arc<AtomicBool>,
) {
    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => text,
                Err(_) => {
                    debug!("Ignoring non UTF-8 binary push message");
                    continue;
                }
            },
            Ok(Message::Close(frame)) => {
                debug!(?frame, "Push socket closed by server");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("Push socket error: {}", e);
                break;
            }
        };

        // Handlers registered while dispatching apply from the next message
        let snapshot = handlers.read().unwrap_or_else(|e| e.into_inner()).clone();
        for handler in &snapshot {
            handler.call(&text).await;
        }
    }

    connected.store(false, Ordering::Release);
    sink.lock().await.take();
    debug!("Push receive loop ended");
}
