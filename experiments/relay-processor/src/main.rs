use {
    base::{Vec2, log},
    com::WsServer,
    image::{Image, decode_image, rgb_to_jpeg},
    std::sync::atomic::{AtomicU64, Ordering},
};

const DEFAULT_ADDR: &str = "127.0.0.1:8000";
const JPEG_QUALITY: u8 = 80;
const BOX_COLOR: [u8; 3] = [0, 255, 0];
const BOX_THICKNESS: usize = 3;

/// Draw a box outline inset by a tenth of the frame on every side.
fn draw_box(image: &mut Image) {
    let Vec2 { x: width, y: height } = image.size;
    let (left, top) = (width / 10, height / 10);
    let (right, bottom) = (width - 1 - width / 10, height - 1 - height / 10);

    for y in top..=bottom {
        for x in left..=right {
            let on_edge = x < left + BOX_THICKNESS
                || x + BOX_THICKNESS > right
                || y < top + BOX_THICKNESS
                || y + BOX_THICKNESS > bottom;
            if on_edge {
                let i = (y * width + x) * 3;
                image.data[i..i + 3].copy_from_slice(&BOX_COLOR);
            }
        }
    }
}

/// Decode one frame, annotate it and encode it again. Undecodable frames get no reply.
fn annotate(payload: Vec<u8>) -> Option<Vec<u8>> {
    let mut image = match decode_image(&payload) {
        Ok(image) => image,
        Err(error) => {
            log::warn!("Skipping frame: {}", error);
            return None;
        }
    };
    draw_box(&mut image);
    match rgb_to_jpeg(image.size, &image.data, JPEG_QUALITY) {
        Ok(jpeg) => Some(jpeg),
        Err(error) => {
            log::warn!("Cannot encode annotated frame: {}", error);
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    base::init_stdout_logger();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    log::info!("Relay Processor");
    log::info!("Binding to: {}", addr);

    let processed = AtomicU64::new(0);
    let server = WsServer::bind(addr.as_str(), move |payload: Vec<u8>| {
        let reply = annotate(payload);
        if reply.is_some() {
            let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 100 == 0 {
                log::info!("Processed {} frames", count);
            }
        }
        reply
    })
    .await?;
    log::info!("Listening on ws://{}/ws_stream", server.local_addr());

    let mut prev_client_count = 0;
    loop {
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        let client_count = server.client_count();
        if client_count != prev_client_count {
            log::info!("Connected clients: {}", client_count);
            prev_client_count = client_count;
        }
    }
}
