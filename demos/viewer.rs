//! Headless stream viewer
//!
//! Run with: cargo run --example viewer [BASE_URL] [SOURCE] [REFRESH_SECS]
//!
//! Examples:
//!   cargo run --example viewer                                   # proxy via 127.0.0.1:5000
//!   cargo run --example viewer http://192.168.1.20:5000 local    # relay's local endpoint
//!   cargo run --example viewer http://127.0.0.1:5000 ngrok 30    # registered tunnel, refresh every 30s
//!
//! SOURCE is one of `proxy`, `local` or `ngrok`. REFRESH_SECS must be one
//! of 0, 5, 10, 30 or 60.
//!
//! The viewer prints lifecycle events, camera status and a frame counter.
//! Press Ctrl+C to stop.

use std::sync::Arc;
use std::time::Duration;

use camrelay::{
    ChannelSink, ControllerConfig, HttpRegistrar, MjpegPlayer, PlayerConfig, Registrar,
    RegistrarConfig, SourceKind, SourceResolver, StatusPoller, StatusPollerConfig,
    StreamController, StreamEvent, REFRESH_RATE_OPTIONS,
};

fn print_usage() {
    eprintln!("Usage: viewer [BASE_URL] [proxy|local|ngrok] [REFRESH_SECS]");
    eprintln!("  REFRESH_SECS: one of {:?}", REFRESH_RATE_OPTIONS);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage();
        return Ok(());
    }

    let base_url = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| "http://127.0.0.1:5000".to_string());
    let source: SourceKind = match args.get(2).map(|s| s.parse()) {
        Some(Ok(kind)) => kind,
        Some(Err(e)) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
        None => SourceKind::Proxy,
    };
    let refresh_secs: u32 = match args.get(3).map(|s| s.parse::<u32>()) {
        Some(Ok(secs)) if REFRESH_RATE_OPTIONS.contains(&secs) => secs,
        Some(_) => {
            eprintln!("Error: unsupported refresh period");
            print_usage();
            std::process::exit(1);
        }
        None => 0,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("camrelay=info".parse()?)
                .add_directive("viewer=info".parse()?),
        )
        .init();

    let registrar_config = RegistrarConfig::new(base_url.clone());
    let endpoints = registrar_config.relay_endpoints();
    let registrar: Arc<dyn Registrar> = Arc::new(HttpRegistrar::new(registrar_config)?);

    let (sink, commands) = ChannelSink::new();
    let controller = StreamController::new(
        ControllerConfig::new()
            .source_kind(source)
            .refresh_period_secs(refresh_secs),
        SourceResolver::new(registrar.clone(), endpoints),
        Arc::new(sink),
    );

    let player = MjpegPlayer::new(PlayerConfig::default(), controller.reporter())?;
    let mut frames = player.frames();
    let mut view = player.view();
    let player_counters = player.counters();
    let player_task = player.spawn(commands);

    let poller = StatusPoller::new(StatusPollerConfig::default(), registrar);
    let mut status = poller.subscribe();
    let poller_task = poller.spawn();

    let mut events = controller.subscribe();

    println!("Viewing {} from {}", source, base_url);
    if let Err(e) = controller.start().await {
        eprintln!("Could not start stream: {}", e);
    }

    let mut frame_count = 0u64;
    let mut report = tokio::time::interval(Duration::from_secs(5));

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(StreamEvent::ReconnectScheduled { attempt, delay }) => {
                    println!("Reconnecting in {:?} (attempt {})", delay, attempt);
                }
                Ok(StreamEvent::ReconnectAbandoned { attempts }) => {
                    println!("Gave up after {} reconnect attempts", attempts);
                }
                Ok(event) => println!("Event: {:?}", event),
                Err(_) => {}
            },
            Ok(()) = frames.changed() => {
                if frames.borrow_and_update().is_some() {
                    frame_count += 1;
                }
            }
            Ok(()) = view.changed() => {
                println!("View: {:?}", *view.borrow_and_update());
            }
            Ok(()) = status.changed() => {
                if let Some(snapshot) = status.borrow_and_update().as_ref() {
                    println!(
                        "Camera: {:?} tunnel={}",
                        snapshot.connection_state,
                        snapshot.stream_url.as_deref().unwrap_or("none")
                    );
                }
            }
            _ = report.tick() => {
                let stats = controller.stats();
                let playback = player_counters.snapshot();
                println!(
                    "Frames: {} ({:.1} fps, {} kbit/s) starts={} refreshes={} failures={}",
                    frame_count,
                    playback.framerate(),
                    playback.bitrate() / 1000,
                    stats.starts,
                    stats.refreshes,
                    stats.delivery_failures
                );
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    controller.stop();
    poller_task.abort();
    player_task.abort();
    Ok(())
}
