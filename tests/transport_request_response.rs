//! S1 (fake server — CCD open/close) and S2 (timeout).

use std::time::{Duration, Instant};

use icl_client::transport::Transport;
use icl_protocol::Command;
use icl_test_utils::{FakeIclServer, ScriptedResponder};
use serde_json::json;

#[tokio::test]
async fn open_then_close_round_trips_through_the_fake_icl() {
    let responder = ScriptedResponder::new()
        .on_ok("ccd_open", json!({}))
        .on_ok("ccd_isOpen", json!({ "open": true }))
        .on_ok("ccd_close", json!({}));
    let server = FakeIclServer::start(responder).await.unwrap();

    let transport = Transport::new();
    transport.open(&server.ws_url()).await.unwrap();

    let open = transport
        .request_with_response(Command::new("ccd_open", json!({ "index": 0 })), Duration::from_secs(1))
        .await
        .unwrap();
    assert!(!open.has_errors());

    let status = transport
        .request_with_response(Command::new("ccd_isOpen", json!({ "index": 0 })), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(status.results["open"], true);

    transport
        .request_with_response(Command::new("ccd_close", json!({ "index": 0 })), Duration::from_secs(1))
        .await
        .unwrap();

    transport.close().await.unwrap();
}

#[tokio::test]
async fn unanswered_command_times_out_within_its_budget_and_forgets_the_waiter() {
    let responder = ScriptedResponder::new().on("ccd_open", vec![icl_test_utils::ResponseAction::ignore()]);
    let server = FakeIclServer::start(responder).await.unwrap();

    let transport = Transport::new();
    transport.open(&server.ws_url()).await.unwrap();

    let started = Instant::now();
    let err = transport
        .request_with_response(Command::new("ccd_open", json!({})), Duration::from_secs(1))
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, icl_client::Error::Timeout { .. }));
    assert!(elapsed >= Duration::from_secs(1), "timed out too early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1200), "timed out too late: {elapsed:?}");

    // A late reply for the forgotten id must not panic the reader loop.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(transport.is_open().await);
}
