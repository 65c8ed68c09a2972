//! Configuration management.
//!
//! Centralized, thread-safe defaults for capture, effects and export.
//!
//! ## Architecture
//!
//! - `CaptureConfig`: aspect-ratio preset, fallback frame size, live rate
//! - `EffectConfig`: the canonical intensity → pixel mapping
//! - `ExportConfig`: stepping rate, watchdog, screenshot encoding
//!
//! Each config lives behind a `parking_lot::RwLock` global so the UI can
//! batch-update it in one call. Core functions still take their config as an
//! argument; the globals only supply defaults.

pub mod capture;
pub mod effects;
pub mod export;

pub use capture::{AspectRatio, CaptureConfig, CaptureConstraints, ConstraintRange, CAPTURE_CONFIG};
pub use effects::{EffectConfig, EFFECT_CONFIG};
pub use export::{ExportConfig, ScreenshotFormat, EXPORT_CONFIG};
