//! WebSocket transport: owns the connection to the ICL, demultiplexes
//! inbound frames into JSON responses and binary telemetry, and exposes a
//! correlated request/response primitive.
//!
//! Grounded on the teacher's `UplinkSession` (a tokio-tungstenite client
//! session wrapper) for the connect/send/receive shape, generalized here to
//! a oneshot-per-request correlator (§4.1 strategy (b)) instead of a single
//! in-order "await next matching message" loop, since the ICL can answer
//! concurrent in-flight commands out of order.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use icl_protocol::{BinaryFrame, Command, Response};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Default request timeout, per §5.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for long-running device operations (homing, wavelength moves).
pub const LONG_OPERATION_TIMEOUT: Duration = Duration::from_secs(180);

const BINARY_QUEUE_CAPACITY: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>>;

/// Sink for telemetry-plane binary frames, installed with
/// [`Transport::register_binary_callback`].
pub type BinaryCallback = Box<dyn Fn(BinaryFrame) + Send + Sync>;

struct OpenState {
    write: tokio::sync::Mutex<SplitSink<WsStream, Message>>,
    pending: PendingMap,
    reader_task: JoinHandle<()>,
    binary_worker: JoinHandle<()>,
}

/// The WebSocket connection to the ICL.
///
/// `open`/`close`/`send` mutate the connection state behind an internal
/// async mutex; `request_with_response` registers a waiter before sending so
/// a response that arrives unusually fast can never race ahead of it.
pub struct Transport {
    inner: tokio::sync::Mutex<Option<OpenState>>,
    binary_callback: Arc<Mutex<Option<BinaryCallback>>>,
    cancelled: Mutex<HashSet<u64>>,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    pub fn new() -> Self {
        Transport {
            inner: tokio::sync::Mutex::new(None),
            binary_callback: Arc::new(Mutex::new(None)),
            cancelled: Mutex::new(HashSet::new()),
        }
    }

    /// Connects to the ICL at `uri` (e.g. `ws://127.0.0.1:25010`) and starts
    /// the reader and binary-worker tasks.
    pub async fn open(&self, uri: &str) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.is_some() {
            return Err(Error::AlreadyOpen);
        }

        let request = uri
            .into_client_request()
            .map_err(|source| Error::InvalidUri {
                uri: uri.to_owned(),
                source,
            })?;
        let (ws, _response) =
            tokio_tungstenite::connect_async(request)
                .await
                .map_err(|source| Error::ConnectFailed {
                    uri: uri.to_owned(),
                    source,
                })?;
        let (write, read) = ws.split();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (binary_tx, binary_rx) = mpsc::channel(BINARY_QUEUE_CAPACITY);

        let binary_worker = tokio::spawn(binary_worker_loop(
            binary_rx,
            Arc::clone(&self.binary_callback),
        ));
        let reader_task = tokio::spawn(reader_loop(read, Arc::clone(&pending), binary_tx));

        *guard = Some(OpenState {
            write: tokio::sync::Mutex::new(write),
            pending,
            reader_task,
            binary_worker,
        });
        info!(uri, "transport opened");
        Ok(())
    }

    /// Requests a graceful close, stops the reader and binary worker, and
    /// fails every pending waiter with [`Error::Closed`].
    pub async fn close(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let state = guard.take().ok_or(Error::NotOpen)?;

        {
            let mut write = state.write.lock().await;
            let _ = write.send(Message::Close(None)).await;
        }
        state.reader_task.abort();
        state.binary_worker.abort();
        state.pending.lock().unwrap().clear();
        self.cancelled.lock().unwrap().clear();
        *self.binary_callback.lock().unwrap() = None;

        info!("transport closed");
        Ok(())
    }

    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Serializes and transmits `command` without waiting for a reply.
    pub async fn send(&self, command: &Command) -> Result<()> {
        let guard = self.inner.lock().await;
        let state = guard.as_ref().ok_or(Error::NotOpen)?;
        let json = serde_json::to_string(command).expect("Command always serializes");
        let mut write = state.write.lock().await;
        debug!(id = command.id, command = %command.command, "sending command");
        write
            .send(Message::Text(json.into()))
            .await
            .map_err(|source| Error::SendFailed {
                id: command.id,
                command: command.command.clone(),
                source,
            })
    }

    /// Sends `command` and waits up to `timeout` for the response whose id
    /// matches. The waiter is registered before the send completes, and is
    /// removed on timeout — orphaned responses arriving afterward are
    /// silently discarded by the reader.
    pub async fn request_with_response(
        &self,
        command: Command,
        timeout: Duration,
    ) -> Result<Response> {
        let id = command.id;
        let name = command.command.clone();
        let (tx, rx) = oneshot::channel();

        {
            let guard = self.inner.lock().await;
            let state = guard.as_ref().ok_or(Error::NotOpen)?;
            state.pending.lock().unwrap().insert(id, tx);
        }

        if let Err(e) = self.send(&command).await {
            self.forget_waiter(id).await;
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => {
                if self.cancelled.lock().unwrap().remove(&id) {
                    Err(Error::Cancelled { id, command: name })
                } else {
                    Err(Error::Closed { id, command: name })
                }
            }
            Err(_) => {
                self.forget_waiter(id).await;
                Err(Error::Timeout {
                    id,
                    command: name,
                    timeout,
                })
            }
        }
    }

    async fn forget_waiter(&self, id: u64) {
        if let Some(state) = self.inner.lock().await.as_ref() {
            state.pending.lock().unwrap().remove(&id);
        }
    }

    /// Cancels a request that is still awaiting its response, e.g. one whose
    /// caller gave up before the timeout. The waiting `request_with_response`
    /// call (if any) fails with [`Error::Cancelled`] instead of hanging or
    /// silently timing out. Returns `false` if `id` has already completed,
    /// timed out, or never existed.
    pub async fn cancel(&self, id: u64) -> bool {
        let Some(state) = self.inner.lock().await.as_ref().map(|s| Arc::clone(&s.pending)) else {
            return false;
        };
        let waiter = state.lock().unwrap().remove(&id);
        let Some(tx) = waiter else {
            return false;
        };
        self.cancelled.lock().unwrap().insert(id);
        drop(tx);
        true
    }

    /// Installs the single sink for binary telemetry frames. Cleared by
    /// `close()`.
    pub fn register_binary_callback<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(BinaryFrame) + Send + Sync + 'static,
    {
        let mut guard = self.binary_callback.lock().unwrap();
        if guard.is_some() {
            return Err(Error::CallbackAlreadyRegistered);
        }
        *guard = Some(Box::new(callback));
        Ok(())
    }
}

async fn reader_loop(mut read: SplitStream<WsStream>, pending: PendingMap, binary_tx: mpsc::Sender<Vec<u8>>) {
    loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => match Response::from_json(&text) {
                Ok(response) => {
                    let waiter = pending.lock().unwrap().remove(&response.id);
                    match waiter {
                        Some(tx) => {
                            let _ = tx.send(response);
                        }
                        None => {
                            warn!(id = response.id, command = %response.command, "discarding response with no waiter");
                        }
                    }
                }
                Err(e) => warn!(error = %e, "discarding malformed response JSON"),
            },
            Some(Ok(Message::Binary(bytes))) => {
                debug!(len = bytes.len(), "binary frame received");
                if binary_tx.try_send(bytes.into()).is_err() {
                    warn!("binary queue full or closed, dropping frame");
                }
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
            Some(Ok(Message::Close(_))) | None => {
                debug!("ICL closed the connection");
                break;
            }
            Some(Err(e)) => {
                warn!(error = %e, "websocket read error");
                break;
            }
        }
    }

    for (_, tx) in pending.lock().unwrap().drain() {
        drop(tx);
    }
}

async fn binary_worker_loop(
    mut rx: mpsc::Receiver<Vec<u8>>,
    callback: Arc<Mutex<Option<BinaryCallback>>>,
) {
    while let Some(raw) = rx.recv().await {
        match BinaryFrame::parse(&raw) {
            Ok(frame) => {
                debug!(
                    magic = frame.magic(),
                    message_type = frame.message_type(),
                    element_count = frame.element_count(),
                    "dispatching binary frame"
                );
                if let Some(cb) = callback.lock().unwrap().as_ref() {
                    cb(frame);
                }
            }
            Err(e) => warn!(error = %e, "discarding malformed binary frame"),
        }
    }
}
