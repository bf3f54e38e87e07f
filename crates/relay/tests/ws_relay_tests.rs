mod common;

use {
    base::Vec2,
    com::{WsServer, WsSession},
    common::*,
    relay::{JpegEncoder, RelayConfig, RelayController, RelayStatus, SessionState, WatchSink},
    std::{net::SocketAddr, time::Duration},
    tokio::{net::TcpListener, time::timeout},
    video::{TestPatternConfig, VideoIn, VideoInConfig},
};

fn config(addr: SocketAddr) -> RelayConfig {
    RelayConfig::default()
        .with_endpoint(format!("ws://{}/ws_stream", addr))
        .with_connect_timeout(Duration::from_secs(2))
        .with_ack_timeout(Duration::from_secs(2))
        .with_close_timeout(Duration::from_secs(2))
}

async fn echo_server() -> WsServer {
    WsServer::bind("127.0.0.1:0", |payload: Vec<u8>| Some(payload))
        .await
        .expect("bind failed")
}

#[tokio::test]
async fn test_relay_through_echo_processor() {
    let server = echo_server().await;
    let (capture, _) = ScriptedCapture::new(Vec::new());
    let capture = capture.endless(7);
    let sink = WatchSink::new();
    let mut images = sink.subscribe();
    let controller = RelayController::new(config(server.local_addr()), capture, JpegEncoder::default(), sink);
    let stop = controller.stop_handle();

    let watcher = async move {
        for _ in 0..3 {
            images.changed().await.expect("session ended early");
        }
        stop.stop();
        images
    };
    let (report, images) = timeout(Duration::from_secs(10), async {
        tokio::join!(controller.run(WsSession::open), watcher)
    })
    .await
    .expect("session did not finish");

    assert_eq!(report.state, SessionState::Idle);
    assert!(report.stats.frames_rendered >= 3);
    assert_eq!(report.stats.frames_sent, report.stats.frames_rendered);
    let latest = images.borrow().clone().expect("nothing rendered");
    assert_eq!(latest.size, Vec2::new(1, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_relay_test_pattern_camera() {
    let server = echo_server().await;
    let camera = VideoIn::open(Some(VideoInConfig::TestPattern(TestPatternConfig {
        size: Vec2::new(64, 48),
        frame_rate: 60.0,
    })))
    .await
    .expect("test pattern should open");
    let sink = WatchSink::new();
    let mut images = sink.subscribe();
    let controller = RelayController::new(config(server.local_addr()), camera, JpegEncoder::default(), sink);
    let stop = controller.stop_handle();

    let watcher = async move {
        images.changed().await.expect("session ended early");
        stop.stop();
        images
    };
    let (report, images) = timeout(Duration::from_secs(10), async {
        tokio::join!(controller.run(WsSession::open), watcher)
    })
    .await
    .expect("session did not finish");

    assert_eq!(report.state, SessionState::Idle);
    let latest = images.borrow().clone().expect("nothing rendered");
    assert_eq!(latest.size, Vec2::new(64, 48));
}

#[tokio::test]
async fn test_processor_going_away_fails_session() {
    // a processor that never answers, so the session sits in AwaitingAck
    let server = WsServer::bind("127.0.0.1:0", |_: Vec<u8>| -> Option<Vec<u8>> { None })
        .await
        .expect("bind failed");
    let (capture, capture_probe) = ScriptedCapture::new(Vec::new());
    let capture = capture.endless(1);
    let controller = RelayController::new(
        config(server.local_addr()).with_ack_timeout(Duration::from_secs(5)),
        capture,
        JpegEncoder::default(),
        WatchSink::new(),
    );
    let mut status = controller.status();

    let killer = async move {
        status
            .wait_for(|status| *status == RelayStatus::Live)
            .await
            .expect("session ended early");
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(server);
    };
    let (report, _) = timeout(Duration::from_secs(10), async {
        tokio::join!(controller.run(WsSession::open), killer)
    })
    .await
    .expect("session did not finish");

    match report.state {
        SessionState::Failed(reason) => assert!(reason.starts_with("connection lost"), "{reason}"),
        other => panic!("expected Failed, got {other}"),
    }
    assert_eq!(report.stats.frames_rendered, 0);
    assert_eq!(capture_probe.lock().unwrap().release_calls, 1);
}

#[tokio::test]
async fn test_unreachable_processor_fails_session() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
        listener.local_addr().expect("no local address")
    };
    let (capture, capture_probe) = ScriptedCapture::new(Vec::new());
    let controller = RelayController::new(config(addr), capture, JpegEncoder::default(), WatchSink::new());

    let report = timeout(Duration::from_secs(5), controller.run(WsSession::open))
        .await
        .expect("session did not finish");

    match report.state {
        SessionState::Failed(reason) => assert!(reason.starts_with("could not connect"), "{reason}"),
        other => panic!("expected Failed, got {other}"),
    }
    assert_eq!(capture_probe.lock().unwrap().captures, 0);
}
