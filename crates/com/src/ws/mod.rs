mod server;
pub use server::{FrameProcessor, WsServer};

mod session;
pub use session::WsSession;
