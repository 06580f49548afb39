//! S3 (correlated burst): a hundred concurrent requests against a fake ICL
//! that replies out of order with varying delays must each resolve to the
//! response carrying their own id.

use std::sync::Arc;
use std::time::Duration;

use icl_client::transport::Transport;
use icl_protocol::Command;
use icl_test_utils::{FakeIclServer, ResponseAction};
use serde_json::json;

#[tokio::test]
async fn concurrent_requests_never_cross_wires() {
    // Deterministic (not random) per-id delay, reversed relative to send
    // order, so replies arrive out of order without pulling in a `rand`
    // dependency just for this one test.
    let responder = move |command: &Command| {
        let delay = Duration::from_millis(10 + (37 * command.id) % 40);
        ResponseAction::ok_after(delay, json!({ "echo": command.id }))
    };
    let server = FakeIclServer::start(responder).await.unwrap();

    let transport = Arc::new(Transport::new());
    transport.open(&server.ws_url()).await.unwrap();

    let mut handles = Vec::with_capacity(100);
    for _ in 0..100 {
        let transport = Arc::clone(&transport);
        handles.push(tokio::spawn(async move {
            let command = Command::new("ccd_getChipTemperature", json!({}));
            let id = command.id;
            let response = transport
                .request_with_response(command, Duration::from_secs(2))
                .await
                .unwrap();
            (id, response)
        }));
    }

    for handle in handles {
        let (id, response) = handle.await.unwrap();
        assert_eq!(response.id, id);
        assert_eq!(response.results["echo"], id);
    }
}
