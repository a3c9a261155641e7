//! Shared helpers for the end-to-end test suites.
#![allow(dead_code)] // each test binary uses a different subset

use std::net::SocketAddr;
use std::time::Duration;

use labeld_core::Frame;
use labeld_testkit::TestLabeler;

/// Serve a labeler's router on an ephemeral local port.
pub async fn spawn(labeler: &TestLabeler) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let router = labeler.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    addr
}

/// Wait until `count` subscribers are registered, or panic.
pub async fn await_subscribers(labeler: &TestLabeler, count: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let live = labeler
            .state
            .broadcaster
            .subscriber_count(labeld_server::LABELS_STREAM)
            .await;
        if live >= count {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {count} subscribers (have {live})"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Extract `seq` from a `#labels` frame.
pub fn frame_seq(frame: &Frame) -> i64 {
    let Frame::Message { body, .. } = frame else {
        panic!("expected message frame, got {frame:?}");
    };
    match cbor_to_json(body) {
        serde_json::Value::Object(map) => map
            .get("seq")
            .and_then(serde_json::Value::as_i64)
            .expect("seq"),
        other => panic!("frame body is not a map: {other:?}"),
    }
}

/// Extract the label objects from a `#labels` frame as JSON.
pub fn frame_labels(frame: &Frame) -> Vec<serde_json::Value> {
    let Frame::Message { body, .. } = frame else {
        panic!("expected message frame, got {frame:?}");
    };
    match cbor_to_json(body) {
        serde_json::Value::Object(map) => map
            .get("labels")
            .and_then(serde_json::Value::as_array)
            .expect("labels")
            .clone(),
        other => panic!("frame body is not a map: {other:?}"),
    }
}

/// Convert a display-form CBOR value to JSON for easy assertions.
pub fn cbor_to_json(value: &ciborium::value::Value) -> serde_json::Value {
    use ciborium::value::Value as C;
    match value {
        C::Integer(i) => serde_json::json!(i64::try_from(i128::from(*i)).expect("integer range")),
        C::Text(t) => serde_json::Value::String(t.clone()),
        C::Bool(b) => serde_json::Value::Bool(*b),
        C::Null => serde_json::Value::Null,
        C::Array(items) => serde_json::Value::Array(items.iter().map(cbor_to_json).collect()),
        C::Map(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(k, v)| {
                    let C::Text(key) = k else {
                        panic!("non-text map key in display form: {k:?}");
                    };
                    (key.clone(), cbor_to_json(v))
                })
                .collect(),
        ),
        other => panic!("unexpected CBOR in display form: {other:?}"),
    }
}
