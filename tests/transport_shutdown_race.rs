//! S6 (shutdown race): a request racing a concurrent `close()` must fail
//! with `Closed`, never `Timeout`, and the reader task must actually stop.

use std::sync::Arc;
use std::time::Duration;

use icl_client::transport::Transport;
use icl_client::Error;
use icl_protocol::Command;
use icl_test_utils::{FakeIclServer, ResponseAction};
use serde_json::json;

#[tokio::test]
async fn close_during_an_in_flight_request_yields_closed_not_timeout() {
    // Never replies, so the only way the request resolves is via close().
    let responder = |_: &Command| ResponseAction::ignore();
    let server = FakeIclServer::start(responder).await.unwrap();

    let transport = Arc::new(Transport::new());
    transport.open(&server.ws_url()).await.unwrap();

    let request_transport = Arc::clone(&transport);
    let request = tokio::spawn(async move {
        request_transport
            .request_with_response(Command::new("ccd_open", json!({})), Duration::from_secs(5))
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    transport.close().await.unwrap();

    let result = request.await.unwrap();
    assert!(matches!(result, Err(Error::Closed { .. })), "expected Closed, got {result:?}");
    assert!(!transport.is_open().await);
}
