use {
    base::log,
    com::WsSession,
    minifb::{Key, Window, WindowOptions},
    relay::{JpegEncoder, RelayConfig, RelayController, SessionState, WatchSink},
    std::time::Duration,
    video::VideoIn,
};

const WIDTH: usize = 640;
const HEIGHT: usize = 360;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    base::init_stdout_logger();

    let mut config = RelayConfig::default();
    if let Some(endpoint) = std::env::args().nth(1) {
        config = config.with_endpoint(endpoint);
    }

    log::info!("Webcam Relay");
    log::info!("Processor: {}", config.endpoint());

    let camera = VideoIn::open(None).await?;
    log::info!("Camera ready: {} {:?}", camera.size(), camera.format());

    let mut window = Window::new(
        "Webcam Relay - ESC to exit",
        WIDTH,
        HEIGHT,
        WindowOptions {
            resize: true,
            ..WindowOptions::default()
        },
    )?;
    window.set_target_fps(60);

    let sink = WatchSink::new();
    let mut images = sink.subscribe();
    let encoder = JpegEncoder::new(config.jpeg_quality());
    let controller = RelayController::new(config, camera, encoder, sink);
    let stop = controller.stop_handle();
    let status = controller.status();

    // the window has to stay on this thread, so it is driven here next to the session
    let display = async move {
        let mut last_status = status.borrow().clone();
        while window.is_open() && !window.is_key_down(Key::Escape) {
            let current = status.borrow().clone();
            if current != last_status {
                log::info!("Status: {}", current);
                window.set_title(&format!("Webcam Relay - {}", current));
                last_status = current;
            }
            // the sender goes away once the session has ended
            if status.has_changed().is_err() {
                break;
            }

            let latest = if images.has_changed().unwrap_or(false) {
                images.borrow_and_update().clone()
            } else {
                None
            };
            let result = match latest {
                Some(frame) => match image::image_to_u32(&frame) {
                    Ok(pixels) => window.update_with_buffer(&pixels, frame.width(), frame.height()),
                    Err(error) => {
                        log::warn!("Cannot display frame: {}", error);
                        Ok(window.update())
                    }
                },
                None => Ok(window.update()),
            };
            if let Err(error) = result {
                log::warn!("Window update failed: {}", error);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        stop.stop();
    };

    let (report, _) = tokio::join!(controller.run(WsSession::open), display);

    let stats = report.stats;
    log::info!(
        "Frames: {} captured, {} sent, {} rendered, {} discarded",
        stats.frames_captured,
        stats.frames_sent,
        stats.frames_rendered,
        stats.frames_discarded
    );
    match report.state {
        SessionState::Failed(reason) => Err(reason.into()),
        _ => {
            log::info!("Exiting...");
            Ok(())
        }
    }
}
