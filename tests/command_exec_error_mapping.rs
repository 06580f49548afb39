//! S5 (error mapping): an ICL error string with an uncatalogued code must
//! surface as a synthetic CRITICAL [`icl_client::Error::Icl`].

use std::time::Duration;

use icl_client::catalogue::ErrorCatalogue;
use icl_client::command_exec::execute_command;
use icl_client::transport::Transport;
use icl_client::Error;
use icl_protocol::{Command, Severity};
use icl_test_utils::{FakeIclServer, ResponseAction, ScriptedResponder};
use serde_json::json;

#[tokio::test]
async fn uncatalogued_fatal_error_fails_the_call_as_critical() {
    let responder = ScriptedResponder::new()
        .on("ccd_open", vec![icl_test_utils::ResponseAction::error("[E];-1;ICL error: no parser found")]);
    let server = FakeIclServer::start(responder).await.unwrap();

    let transport = Transport::new();
    transport.open(&server.ws_url()).await.unwrap();
    let catalogue = ErrorCatalogue::empty();

    let command = Command::new("ccd_open", json!({ "index": 0 }));
    let err = execute_command(&transport, &catalogue, command, Duration::from_secs(1))
        .await
        .unwrap_err();

    match err {
        Error::Icl { code, message, severity, .. } => {
            assert_eq!(code, -1);
            assert_eq!(message, "ICL error: no parser found");
            assert_eq!(severity, Severity::Critical);
        }
        other => panic!("expected Error::Icl, got {other:?}"),
    }
}

#[tokio::test]
async fn non_fatal_catalogued_error_does_not_fail_the_call() {
    let db = r#"{"errors": [{"number": 42, "text": "device busy", "level": "warning"}]}"#;
    let catalogue = ErrorCatalogue::from_json(db).unwrap();

    let responder =
        ScriptedResponder::new().on("ccd_setGain", vec![icl_test_utils::ResponseAction::error("[E];42;device busy")]);
    let server = FakeIclServer::start(responder).await.unwrap();

    let transport = Transport::new();
    transport.open(&server.ws_url()).await.unwrap();

    let command = Command::new("ccd_setGain", json!({ "index": 0, "gain": 1 }));
    let response = execute_command(&transport, &catalogue, command, Duration::from_secs(1))
        .await
        .unwrap();
    assert!(response.has_errors());
}

#[tokio::test]
async fn a_fatal_error_past_the_first_still_fails_the_call() {
    let db = r#"{"errors": [
        {"number": 1, "text": "device busy", "level": "warning"},
        {"number": 2, "text": "shutter jammed", "level": "fatal"}
    ]}"#;
    let catalogue = ErrorCatalogue::from_json(db).unwrap();

    let responder = ScriptedResponder::new().on(
        "ccd_open",
        vec![ResponseAction::Reply {
            results: json!({}),
            errors: vec!["[E];1;device busy".to_owned(), "[E];2;shutter jammed".to_owned()],
        }],
    );
    let server = FakeIclServer::start(responder).await.unwrap();

    let transport = Transport::new();
    transport.open(&server.ws_url()).await.unwrap();

    let command = Command::new("ccd_open", json!({ "index": 0 }));
    let err = execute_command(&transport, &catalogue, command, Duration::from_secs(1))
        .await
        .unwrap_err();

    match err {
        Error::Icl { code, severity, .. } => {
            assert_eq!(code, 2);
            assert_eq!(severity, Severity::Critical);
        }
        other => panic!("expected Error::Icl, got {other:?}"),
    }
}
