//! Server transport
//!
//! [`JmriClient`] speaks the JMRI JSON protocol over a websocket. One reader
//! task decodes text frames and hands them to the [`MessageCallback`]; a
//! heartbeat task pings the server at the period announced in its `hello`.
//! Writes share one sink behind a tokio mutex.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::protocol::{ServerEvent, ServerRequest, DEFAULT_HEARTBEAT_MS};

/// Receives every JSON message pushed by the server
pub type MessageCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// Connection to the automation server
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// Open the connection; `on_message` is called from the reader task
    async fn connect(&self, on_message: MessageCallback) -> Result<()>;

    async fn send_message(&self, message: Value) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    fn is_connected(&self) -> bool;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type SharedSink = Arc<Mutex<Option<WsSink>>>;

/// Heartbeat announced by a `hello` message
fn hello_heartbeat(message: &Value) -> Option<u64> {
    match ServerEvent::decode(message) {
        Ok(ServerEvent::Hello { heartbeat_ms }) => Some(heartbeat_ms),
        _ => None,
    }
}

async fn write(sink: &SharedSink, message: &Value) -> Result<()> {
    let mut guard = sink.lock().await;
    let sink = guard
        .as_mut()
        .ok_or_else(|| anyhow::anyhow!("Not connected to server"))?;
    sink.send(Message::Text(message.to_string()))
        .await
        .context("Failed to send message")?;
    trace!("Sent: {}", message);
    Ok(())
}

/// JMRI JSON websocket client
pub struct JmriClient {
    url: String,
    sink: SharedSink,
    connected: Arc<AtomicBool>,
    heartbeat: Arc<watch::Sender<u64>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl JmriClient {
    pub fn new(url: impl Into<String>) -> Self {
        let (heartbeat, _) = watch::channel(DEFAULT_HEARTBEAT_MS);
        Self {
            url: url.into(),
            sink: Arc::new(Mutex::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
            heartbeat: Arc::new(heartbeat),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current heartbeat period in milliseconds
    pub fn heartbeat_ms(&self) -> u64 {
        *self.heartbeat.borrow()
    }

    fn spawn_reader(
        &self,
        mut source: futures::stream::SplitStream<WsStream>,
        on_message: MessageCallback,
    ) -> JoinHandle<()> {
        let connected = Arc::clone(&self.connected);
        let heartbeat = Arc::clone(&self.heartbeat);
        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<Value>(&text) {
                        Ok(value) => {
                            if let Some(ms) = hello_heartbeat(&value) {
                                debug!("Server heartbeat {} ms", ms);
                                heartbeat.send_replace(ms.max(1));
                            }
                            on_message(value);
                        }
                        Err(e) => warn!("Invalid JSON from server: {}", e),
                    },
                    Ok(Message::Close(frame)) => {
                        info!("Server closed connection: {:?}", frame);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
            connected.store(false, Ordering::SeqCst);
            debug!("Reader task terminated");
        })
    }

    fn spawn_heartbeat(&self) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        let connected = Arc::clone(&self.connected);
        let mut period = self.heartbeat.subscribe();
        let ping = ServerRequest::Ping.to_json();
        tokio::spawn(async move {
            loop {
                let ms = *period.borrow_and_update();
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_millis(ms)) => {
                        if !connected.load(Ordering::SeqCst) {
                            break;
                        }
                        if let Err(e) = write(&sink, &ping).await {
                            warn!("Heartbeat failed: {}", e);
                            break;
                        }
                    }
                    changed = period.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("Heartbeat task terminated");
        })
    }
}

#[async_trait]
impl Transport for JmriClient {
    fn name(&self) -> &str {
        "jmri"
    }

    async fn connect(&self, on_message: MessageCallback) -> Result<()> {
        self.disconnect().await?;

        info!("Connecting to JMRI at {}", self.url);
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", self.url))?;
        let (sink, source) = stream.split();
        *self.sink.lock().await = Some(sink);
        self.connected.store(true, Ordering::SeqCst);

        let reader = self.spawn_reader(source, on_message);
        let heartbeat = self.spawn_heartbeat();
        self.tasks.lock().await.extend([reader, heartbeat]);

        info!("Connected to JMRI");
        Ok(())
    }

    async fn send_message(&self, message: Value) -> Result<()> {
        write(&self.sink, &message).await
    }

    async fn disconnect(&self) -> Result<()> {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        if let Some(mut sink) = self.sink.lock().await.take() {
            if let Err(e) = sink.close().await {
                debug!("Close failed: {}", e);
            }
            info!("Disconnected from JMRI");
        }
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
