pub mod logging;
pub use logging::*;

mod vec2;
pub use vec2::*;

// downstream crates log through base::log
pub use log;
