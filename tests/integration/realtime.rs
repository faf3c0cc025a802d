//! Realtime broadcast over a live listener, plus runtime shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, Stream, StreamExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use server_vitals::config::Config;
use server_vitals::server::{ServerRuntime, ShutdownTrigger};
use server_vitals::Result;

use super::{fixed_probe, RecordingTerminator};

struct Running {
    runtime: Arc<ServerRuntime>,
    addr: SocketAddr,
    serving: JoinHandle<Result<ShutdownTrigger>>,
}

async fn start(config: Config, terminator: Arc<RecordingTerminator>) -> Running {
    let runtime = Arc::new(ServerRuntime::new(config, fixed_probe(), terminator));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let serving = {
        let runtime = runtime.clone();
        tokio::spawn(async move { runtime.serve(listener).await })
    };

    Running {
        runtime,
        addr,
        serving,
    }
}

async fn wait_for_connections(runtime: &ServerRuntime, expected: usize) {
    for _ in 0..100 {
        if runtime.state().connections.len() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} realtime connections", expected);
}

async fn next_text<S>(stream: &mut S) -> String
where
    S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    let message = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("timed out waiting for broadcast")
        .expect("stream ended")
        .expect("websocket error");
    match message {
        Message::Text(text) => text,
        other => panic!("unexpected frame: {:?}", other),
    }
}

#[tokio::test]
async fn message_is_broadcast_to_every_client() {
    let terminator = Arc::new(RecordingTerminator::default());
    let running = start(Config::default(), terminator).await;
    let url = format!("ws://{}/socket", running.addr);

    let (mut alice, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let (mut bob, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    wait_for_connections(&running.runtime, 2).await;

    alice
        .send(Message::Text("hello everyone".to_string()))
        .await
        .unwrap();

    assert_eq!(next_text(&mut bob).await, "hello everyone");
    assert_eq!(next_text(&mut alice).await, "hello everyone");

    bob.close(None).await.unwrap();
    wait_for_connections(&running.runtime, 1).await;

    running
        .runtime
        .shutdown_signal()
        .trigger(ShutdownTrigger::Signal("SIGTERM"));
    running.serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn upgrade_from_foreign_origin_is_refused() {
    let config = Config {
        client_url: Some("https://app.example.com".to_string()),
        ..Config::default()
    };
    let terminator = Arc::new(RecordingTerminator::default());
    let running = start(config, terminator).await;

    let mut request = format!("ws://{}/socket", running.addr)
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert("origin", "https://evil.example.com".parse().unwrap());

    match tokio_tungstenite::connect_async(request).await {
        Err(WsError::Http(response)) => assert_eq!(response.status().as_u16(), 401),
        other => panic!("expected refusal, got {:?}", other.map(|_| ())),
    }

    running
        .runtime
        .shutdown_signal()
        .trigger(ShutdownTrigger::Signal("SIGTERM"));
    running.serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn signal_shutdown_closes_clients_and_exits_with_two() {
    let terminator = Arc::new(RecordingTerminator::default());
    let running = start(Config::default(), terminator.clone()).await;
    let url = format!("ws://{}/socket", running.addr);

    let (_client, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    wait_for_connections(&running.runtime, 1).await;

    running
        .runtime
        .shutdown_signal()
        .trigger(ShutdownTrigger::Signal("SIGINT"));
    let trigger = running.serving.await.unwrap().unwrap();
    running.runtime.shutdown(trigger.exit_code());

    assert!(running.runtime.state().connections.is_empty());
    assert_eq!(*terminator.codes.lock(), vec![2]);
}

#[tokio::test]
async fn panicking_realtime_task_exits_with_one() {
    let terminator = Arc::new(RecordingTerminator::default());
    let running = start(Config::default(), terminator.clone()).await;

    let task = tokio::spawn(async { panic!("relay crashed") });
    running
        .runtime
        .shutdown_signal()
        .supervise_panics("realtime connection", task);

    let trigger = tokio::time::timeout(Duration::from_secs(10), running.serving)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(
        trigger,
        ShutdownTrigger::UncaughtFault("realtime connection: relay crashed".into())
    );

    running.runtime.shutdown(trigger.exit_code());
    assert_eq!(*terminator.codes.lock(), vec![1]);
}
