// An in-process fake ICL: accepts a WebSocket connection on
// ws://127.0.0.1:<random>, parses inbound JSON as `icl_protocol::Command`,
// and replies according to an `IclResponder`. Also supports injecting raw
// binary frames and severing the connection, to exercise the transport's
// timeout, FIFO, and shutdown-race behaviour.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use icl_protocol::Command;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, warn};

use crate::responder::{IclResponder, ResponseAction};

enum Outbound {
    Json(String),
    Binary(Vec<u8>),
    Close,
}

/// A running fake ICL server.
///
/// Dropping this struct aborts the accept loop; in-flight connections are
/// not forcibly closed (matching a real process exit), so tests that need a
/// clean FIN should call [`FakeIclServer::close_connection`] first.
pub struct FakeIclServer {
    addr: SocketAddr,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    commands_seen: Arc<Mutex<Vec<Command>>>,
    _accept_task: JoinHandle<()>,
}

impl FakeIclServer {
    /// Binds to a random local port and starts accepting connections.
    ///
    /// Only one connection is serviced at a time (a fresh physical
    /// instrument has exactly one ICL client), matching the library's own
    /// assumption that it is not expected to serve concurrent clients.
    pub async fn start(responder: impl IclResponder + 'static) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let responder = Arc::new(responder);
        let commands_seen = Arc::new(Mutex::new(Vec::new()));

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let accept_commands_seen = Arc::clone(&commands_seen);
        let accept_task = tokio::spawn(Self::accept_loop(
            listener,
            responder,
            accept_commands_seen,
            outbound_rx,
        ));

        Ok(FakeIclServer {
            addr,
            outbound_tx,
            commands_seen,
            _accept_task: accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Pushes a raw binary frame to the (single) connected client.
    pub fn send_binary(&self, bytes: Vec<u8>) {
        let _ = self.outbound_tx.send(Outbound::Binary(bytes));
    }

    /// Severs the connection, simulating a peer-initiated close mid-session.
    pub fn close_connection(&self) {
        let _ = self.outbound_tx.send(Outbound::Close);
    }

    /// Snapshot of every command the server has parsed so far, in arrival order.
    pub fn commands_seen(&self) -> Vec<Command> {
        self.commands_seen.lock().unwrap().clone()
    }

    async fn accept_loop(
        listener: TcpListener,
        responder: Arc<dyn IclResponder>,
        commands_seen: Arc<Mutex<Vec<Command>>>,
        mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    ) {
        // Only the first connection is handled; the outbound channel's
        // receiver is moved into it so later connections (not expected in
        // practice) simply get no injected binary/close traffic.
        let Ok((stream, _peer)) = listener.accept().await else {
            return;
        };

        let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
            return;
        };
        let (mut write, mut read) = ws.split();

        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Outbound>();

        loop {
            tokio::select! {
                incoming = read.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let command: Command = match serde_json::from_str(&text) {
                                Ok(c) => c,
                                Err(e) => { warn!(error = %e, "fake ICL: malformed command JSON"); continue; }
                            };
                            commands_seen.lock().unwrap().push(command.clone());
                            let action = responder.respond(&command);
                            Self::apply_action(command.id, command.command.clone(), action, reply_tx.clone());
                        }
                        Some(Ok(Message::Ping(data))) => { let _ = write.send(Message::Pong(data)).await; }
                        Some(Ok(Message::Close(_))) | None => { debug!("fake ICL: client closed"); break; }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => { warn!(error = %e, "fake ICL: ws error"); break; }
                    }
                }
                Some(out) = outbound_rx.recv() => {
                    if Self::write_outbound(&mut write, out).await.is_err() { break; }
                }
                Some(out) = reply_rx.recv() => {
                    if Self::write_outbound(&mut write, out).await.is_err() { break; }
                }
            }
        }
    }

    fn apply_action(
        id: u64,
        command: String,
        action: ResponseAction,
        reply_tx: mpsc::UnboundedSender<Outbound>,
    ) {
        match action {
            ResponseAction::Reply { results, errors } => {
                let json = build_response_json(id, &command, results, errors);
                let _ = reply_tx.send(Outbound::Json(json));
            }
            ResponseAction::ReplyAfter {
                delay,
                results,
                errors,
            } => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let json = build_response_json(id, &command, results, errors);
                    let _ = reply_tx.send(Outbound::Json(json));
                });
            }
            ResponseAction::Ignore => {}
        }
    }

    async fn write_outbound<S>(
        write: &mut futures_util::stream::SplitSink<S, Message>,
        out: Outbound,
    ) -> Result<(), ()>
    where
        S: futures_util::Sink<Message> + Unpin,
    {
        let result = match out {
            Outbound::Json(text) => write.send(Message::Text(text.into())).await,
            Outbound::Binary(bytes) => write.send(Message::Binary(bytes.into())).await,
            Outbound::Close => {
                let _ = write.send(Message::Close(None)).await;
                return Err(());
            }
        };
        result.map_err(|_| ())
    }
}

fn build_response_json(
    id: u64,
    command: &str,
    results: serde_json::Value,
    errors: Vec<String>,
) -> String {
    serde_json::json!({
        "id": id,
        "command": command,
        "results": results,
        "errors": errors,
    })
    .to_string()
}
