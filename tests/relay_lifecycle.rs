//! End-to-end tests against an in-process relay over real sockets

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use camrelay::{
    ChannelSink, ControllerConfig, HttpRegistrar, MjpegPlayer, PlayerConfig, ReconnectPolicy,
    Registrar, RegistrarConfig, ResolutionError, SourceKind, SourceResolver, StartOutcome,
    StreamController, StreamPhase, ViewState,
};

/// Minimal relay: status API plus a short-lived MJPEG stream on every path
struct FakeRelay {
    base_url: String,
    registered: Arc<AtomicBool>,
    status_hits: Arc<AtomicUsize>,
    stream_hits: Arc<AtomicUsize>,
}

impl FakeRelay {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let relay = Self {
            base_url: base_url.clone(),
            registered: Arc::new(AtomicBool::new(true)),
            status_hits: Arc::new(AtomicUsize::new(0)),
            stream_hits: Arc::new(AtomicUsize::new(0)),
        };

        let registered = relay.registered.clone();
        let status_hits = relay.status_hits.clone();
        let stream_hits = relay.stream_hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                let registered = registered.clone();
                let status_hits = status_hits.clone();
                let stream_hits = stream_hits.clone();
                let base_url = base_url.clone();
                tokio::spawn(async move {
                    handle(socket, &base_url, &registered, &status_hits, &stream_hits).await;
                });
            }
        });

        relay
    }

    fn status_hits(&self) -> usize {
        self.status_hits.load(Ordering::SeqCst)
    }

    fn stream_hits(&self) -> usize {
        self.stream_hits.load(Ordering::SeqCst)
    }
}

async fn handle(
    mut socket: TcpStream,
    base_url: &str,
    registered: &AtomicBool,
    status_hits: &AtomicUsize,
    stream_hits: &AtomicUsize,
) {
    let mut buf = vec![0u8; 4096];
    let n = socket.read(&mut buf).await.unwrap_or(0);
    let request = String::from_utf8_lossy(&buf[..n]);
    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

    if path == "/api/camera_status" {
        status_hits.fetch_add(1, Ordering::SeqCst);
        let body = if registered.load(Ordering::SeqCst) {
            format!(
                r#"{{"status":"Connected via Ngrok","stream_url":"{}/stream"}}"#,
                base_url
            )
        } else {
            r#"{"status":"Disconnected","stream_url":null}"#.to_string()
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let _ = socket.write_all(response.as_bytes()).await;
        return;
    }

    stream_hits.fetch_add(1, Ordering::SeqCst);
    let mut response = b"HTTP/1.1 200 OK\r\n\
        Content-Type: multipart/x-mixed-replace; boundary=frame\r\n\
        Connection: close\r\n\r\n"
        .to_vec();
    for fill in 0..3u8 {
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.resize(256, fill);
        response.extend_from_slice(
            format!(
                "--frame\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
                jpeg.len()
            )
            .as_bytes(),
        );
        response.extend_from_slice(&jpeg);
        response.extend_from_slice(b"\r\n");
    }
    let _ = socket.write_all(&response).await;
    // Dropping the socket ends the stream
}

struct Viewer {
    controller: StreamController,
    frames: tokio::sync::watch::Receiver<Option<camrelay::JpegFrame>>,
    view: tokio::sync::watch::Receiver<ViewState>,
}

fn viewer(relay: &FakeRelay, config: ControllerConfig) -> Viewer {
    let registrar_config = RegistrarConfig::new(relay.base_url.clone());
    let endpoints = registrar_config.relay_endpoints();
    let registrar: Arc<dyn Registrar> = Arc::new(HttpRegistrar::new(registrar_config).unwrap());

    let (sink, commands) = ChannelSink::new();
    let controller = StreamController::new(
        config,
        SourceResolver::new(registrar, endpoints),
        Arc::new(sink),
    );

    let player = MjpegPlayer::new(PlayerConfig::default(), controller.reporter()).unwrap();
    let frames = player.frames();
    let view = player.view();
    player.spawn(commands);

    Viewer {
        controller,
        frames,
        view,
    }
}

async fn wait_for(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn test_proxy_stream_delivers_frames() {
    let relay = FakeRelay::start().await;
    let viewer = viewer(&relay, ControllerConfig::default());

    let outcome = viewer.controller.start().await.unwrap();

    assert_eq!(
        outcome,
        StartOutcome::Streaming(format!("{}/stream_proxy", relay.base_url))
    );
    wait_for(|| viewer.frames.borrow().is_some()).await;
    assert_eq!(relay.status_hits(), 0);

    viewer.controller.stop();
}

#[tokio::test]
async fn test_tunnel_stream_recovers_after_end() {
    let relay = FakeRelay::start().await;
    let viewer = viewer(
        &relay,
        ControllerConfig::new()
            .source_kind(SourceKind::Tunnel)
            .reconnect(ReconnectPolicy::fixed(Duration::from_millis(50))),
    );

    let outcome = viewer.controller.start().await.unwrap();
    assert_eq!(
        outcome,
        StartOutcome::Streaming(format!("{}/stream", relay.base_url))
    );

    // Every stream ends after three frames; each reconnect resolves again
    wait_for(|| relay.stream_hits() >= 3).await;
    assert!(relay.status_hits() >= 3);
    assert!(viewer.controller.stats().reconnects_scheduled >= 2);
    assert!(viewer.frames.borrow().is_some());

    assert!(viewer.controller.stop());
    tokio::time::sleep(Duration::from_millis(100)).await;
    let hits = relay.stream_hits();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(relay.stream_hits(), hits);
    assert_eq!(viewer.controller.snapshot().phase, StreamPhase::Idle);
    assert_eq!(*viewer.view.borrow(), ViewState::Blank);
}

#[tokio::test]
async fn test_unregistered_tunnel_fails_fast() {
    let relay = FakeRelay::start().await;
    relay.registered.store(false, Ordering::SeqCst);
    let viewer = viewer(&relay, ControllerConfig::new().source_kind(SourceKind::Tunnel));

    let err = viewer.controller.start().await.unwrap_err();

    assert_eq!(err, ResolutionError::NoTunnelRegistered);
    assert_eq!(viewer.controller.snapshot().phase, StreamPhase::Idle);
    assert_eq!(relay.stream_hits(), 0);
}

#[tokio::test]
async fn test_source_switch_picks_up_new_source() {
    let relay = FakeRelay::start().await;
    let viewer = viewer(
        &relay,
        ControllerConfig::new().source_switch_grace(Duration::from_millis(50)),
    );
    viewer.controller.start().await.unwrap();

    viewer.controller.change_source(SourceKind::Local);
    let expected = format!("{}/local_stream_proxy", relay.base_url);
    wait_for(|| viewer.controller.snapshot().current_url.as_deref() == Some(expected.as_str()))
        .await;

    assert_eq!(viewer.controller.snapshot().source_kind, SourceKind::Local);
    viewer.controller.stop();
}
