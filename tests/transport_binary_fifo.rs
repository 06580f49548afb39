//! Invariant 4 (binary FIFO): frames delivered by the server in order must
//! reach the callback in that same order, regardless of delivery rate.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use icl_client::transport::Transport;
use icl_protocol::BinaryFrame;
use icl_test_utils::{FakeIclServer, ScriptedResponder};

fn frame_bytes(tag: u16) -> Vec<u8> {
    let mut bytes = vec![0u8; 18];
    bytes[10..12].copy_from_slice(&tag.to_le_bytes());
    bytes
}

#[tokio::test]
async fn frames_arrive_in_send_order() {
    let server = FakeIclServer::start(ScriptedResponder::new()).await.unwrap();
    let transport = Transport::new();
    transport.open(&server.ws_url()).await.unwrap();

    let seen: Arc<Mutex<Vec<u16>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_for_cb = Arc::clone(&seen);
    transport
        .register_binary_callback(move |frame: BinaryFrame| seen_for_cb.lock().unwrap().push(frame.tags()[0]))
        .unwrap();

    for tag in 0..20u16 {
        server.send_binary(frame_bytes(tag));
    }

    tokio::time::sleep(Duration::from_millis(100)).await;

    let observed = seen.lock().unwrap().clone();
    let expected: Vec<u16> = (0..20).collect();
    assert_eq!(observed, expected);
}
