//! camframe: geometry and per-frame compositing for a camera recorder.
//!
//! Maps selections drawn on a letterboxed preview to source pixels, applies
//! a blur or pixelate effect to a region of each frame, and runs that same
//! composition live, for screenshots and for stepped export.

pub mod config;
pub mod error;
pub mod rendering;

pub use error::{CamFrameError, CamFrameResult};

/// Initialise `env_logger` (honours `RUST_LOG`, defaults to `info`).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
