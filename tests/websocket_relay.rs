//! WebSocket upgrade relay tests.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

mod common;

#[tokio::test]
async fn websocket_messages_flow_both_ways() {
    let (backend, _closed) = common::start_ws_echo_backend().await;
    let (proxy, _shutdown) = common::spawn_proxy(common::config(&[("ws", backend)], &[], "ws")).await;

    let (mut ws, response) = tokio_tungstenite::connect_async(format!("ws://{}/socket", proxy))
        .await
        .unwrap();
    assert_eq!(response.status(), 101);

    for text in ["hello", "second message"] {
        ws.send(Message::text(text)).await.unwrap();
        let echoed = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(echoed.to_text().unwrap(), text);
    }

    ws.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();
    let echoed = ws.next().await.unwrap().unwrap();
    assert_eq!(echoed.into_data().as_ref(), &[1u8, 2, 3]);
}

#[tokio::test]
async fn dropping_client_closes_upstream_within_grace() {
    let (backend, mut closed) = common::start_ws_echo_backend().await;
    let mut config = common::config(&[("ws", backend)], &[], "ws");
    config.timeouts.upgrade_grace_secs = 1;
    let (proxy, _shutdown) = common::spawn_proxy(config).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/", proxy))
        .await
        .unwrap();
    ws.send(Message::text("ping")).await.unwrap();
    assert_eq!(ws.next().await.unwrap().unwrap().to_text().unwrap(), "ping");

    drop(ws);

    tokio::time::timeout(Duration::from_secs(3), closed.recv())
        .await
        .expect("upstream connection should close after the client left")
        .unwrap();
}

#[tokio::test]
async fn websocket_to_unknown_host_is_rejected() {
    let (backend, _closed) = common::start_ws_echo_backend().await;
    let (proxy, _shutdown) = common::spawn_proxy(common::config(
        &[("ws", backend)],
        &[("chat.example.com", Some("ws"), vec!["10.0.0.99"])],
        "ws",
    ))
    .await;

    let err = tokio_tungstenite::connect_async(format!("ws://{}/", proxy))
        .await
        .unwrap_err();

    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 404);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn refused_upgrade_is_returned_as_is() {
    let backend = common::start_mock_backend("no upgrades here").await;
    let (proxy, _shutdown) = common::spawn_proxy(common::config(&[("plain", backend)], &[], "plain")).await;

    let err = tokio_tungstenite::connect_async(format!("ws://{}/", proxy))
        .await
        .unwrap_err();

    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 200);
        }
        other => panic!("unexpected error: {other}"),
    }
}
