//! A request cancelled before the ICL replies must fail with `Cancelled`,
//! distinct from `Closed` (peer-initiated) and `Timeout` (no response in
//! time).

use std::sync::Arc;
use std::time::Duration;

use icl_client::transport::Transport;
use icl_client::Error;
use icl_protocol::Command;
use icl_test_utils::{FakeIclServer, ResponseAction};
use serde_json::json;

#[tokio::test]
async fn cancelling_an_in_flight_request_yields_cancelled() {
    // Never replies, so the only way the request resolves is via cancel().
    let responder = |_: &Command| ResponseAction::ignore();
    let server = FakeIclServer::start(responder).await.unwrap();

    let transport = Arc::new(Transport::new());
    transport.open(&server.ws_url()).await.unwrap();

    let command = Command::new("ccd_open", json!({}));
    let id = command.id;

    let request_transport = Arc::clone(&transport);
    let request = tokio::spawn(async move {
        request_transport
            .request_with_response(command, Duration::from_secs(5))
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(transport.cancel(id).await);

    let result = request.await.unwrap();
    assert!(matches!(result, Err(Error::Cancelled { .. })), "expected Cancelled, got {result:?}");
}

#[tokio::test]
async fn cancelling_an_unknown_id_is_a_no_op() {
    let responder = |_: &Command| ResponseAction::ignore();
    let server = FakeIclServer::start(responder).await.unwrap();

    let transport = Transport::new();
    transport.open(&server.ws_url()).await.unwrap();

    assert!(!transport.cancel(999).await);
}
