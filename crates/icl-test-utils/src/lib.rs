// icl-test-utils: an in-process fake ICL for integration-testing the
// transport and device layers without real spectroscopy hardware.
//
// `FakeIclServer` binds a real TCP listener on 127.0.0.1 and speaks the same
// JSON-command / JSON-response / binary-frame protocol as the real ICL.
// `IclResponder` (and the canned `ScriptedResponder`) decide how it answers;
// `ResponseAction::ReplyAfter` and `::Ignore` let tests reproduce the
// out-of-order and no-reply cases a real ICL can also produce.

pub mod responder;
pub mod server;

pub use responder::{IclResponder, ResponseAction, ScriptedResponder};
pub use server::FakeIclServer;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    use icl_protocol::Command;
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::protocol::Message;

    async fn connect(
        server: &FakeIclServer,
    ) -> tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>> {
        let (ws, _) = tokio_tungstenite::connect_async(server.ws_url())
            .await
            .expect("fake ICL should accept the connection");
        ws
    }

    #[tokio::test]
    async fn server_starts_and_reports_a_real_port() {
        let server = FakeIclServer::start(ScriptedResponder::new()).await.unwrap();
        assert_ne!(server.local_addr().port(), 0);
        assert!(server.ws_url().starts_with("ws://127.0.0.1:"));
    }

    #[tokio::test]
    async fn replies_to_a_scripted_command() {
        use futures_util::{SinkExt, StreamExt};

        let responder = ScriptedResponder::new()
            .on_ok("ccd_getChipTemperature", json!({"temperature": -65.0}));
        let server = FakeIclServer::start(responder).await.unwrap();
        let mut ws = connect(&server).await;

        let cmd = Command::new("ccd_getChipTemperature", json!({"index": 0}));
        let id = cmd.id;
        ws.send(Message::Text(serde_json::to_string(&cmd).unwrap().into()))
            .await
            .unwrap();

        let reply = ws.next().await.unwrap().unwrap();
        let Message::Text(text) = reply else {
            panic!("expected a text frame")
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["id"], id);
        assert_eq!(value["results"]["temperature"], -65.0);

        assert_eq!(server.commands_seen().len(), 1);
        assert_eq!(server.commands_seen()[0].command, "ccd_getChipTemperature");
    }

    #[tokio::test]
    async fn unscripted_command_gets_bare_success() {
        use futures_util::{SinkExt, StreamExt};

        let server = FakeIclServer::start(ScriptedResponder::new()).await.unwrap();
        let mut ws = connect(&server).await;

        let cmd = Command::new("icl_info", json!({}));
        ws.send(Message::Text(serde_json::to_string(&cmd).unwrap().into()))
            .await
            .unwrap();

        let reply = ws.next().await.unwrap().unwrap();
        let Message::Text(text) = reply else {
            panic!("expected a text frame")
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value["errors"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ignore_produces_no_reply() {
        use futures_util::{SinkExt, StreamExt};

        let responder = ScriptedResponder::new().on("ccd_open", vec![ResponseAction::ignore()]);
        let server = FakeIclServer::start(responder).await.unwrap();
        let mut ws = connect(&server).await;

        let cmd = Command::new("ccd_open", json!({"index": 0}));
        ws.send(Message::Text(serde_json::to_string(&cmd).unwrap().into()))
            .await
            .unwrap();

        let outcome = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
        assert!(outcome.is_err(), "an ignored command must not produce a reply");
    }

    #[tokio::test]
    async fn replies_arrive_out_of_order_when_delayed() {
        use futures_util::{SinkExt, StreamExt};

        let responder = ScriptedResponder::new()
            .on(
                "slow",
                vec![ResponseAction::ok_after(Duration::from_millis(60), json!({}))],
            )
            .on("fast", vec![ResponseAction::ok(json!({}))]);
        let server = FakeIclServer::start(responder).await.unwrap();
        let mut ws = connect(&server).await;

        let slow = Command::new("slow", json!({}));
        let fast = Command::new("fast", json!({}));
        let fast_id = fast.id;

        ws.send(Message::Text(serde_json::to_string(&slow).unwrap().into()))
            .await
            .unwrap();
        ws.send(Message::Text(serde_json::to_string(&fast).unwrap().into()))
            .await
            .unwrap();

        let first = ws.next().await.unwrap().unwrap();
        let Message::Text(text) = first else {
            panic!("expected a text frame")
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["id"], fast_id, "the un-delayed reply should arrive first");
    }

    #[tokio::test]
    async fn send_binary_delivers_raw_bytes() {
        use futures_util::StreamExt;

        let server = FakeIclServer::start(ScriptedResponder::new()).await.unwrap();
        let mut ws = connect(&server).await;

        server.send_binary(vec![1, 2, 3, 4]);

        let frame = ws.next().await.unwrap().unwrap();
        match frame {
            Message::Binary(bytes) => assert_eq!(bytes.as_ref(), &[1, 2, 3, 4]),
            other => panic!("expected a binary frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_connection_severs_the_stream() {
        use futures_util::StreamExt;

        let server = FakeIclServer::start(ScriptedResponder::new()).await.unwrap();
        let mut ws = connect(&server).await;

        server.close_connection();

        let next = ws.next().await;
        match next {
            Some(Ok(Message::Close(_))) | None => {}
            other => panic!("expected the stream to close, got {other:?}"),
        }
    }
}
