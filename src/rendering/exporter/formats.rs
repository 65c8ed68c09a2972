//! Export container presets.
//!
//! The encoder itself is external; these only describe the canvas size,
//! frame rate and bitrates each container is exported with.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Container formats offered for export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ExportFormat {
    #[default]
    Webm,
    Mp4,
    Avi,
    Mov,
    #[serde(rename = "3gp")]
    ThreeGp,
}

/// Target parameters for one format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct FormatProfile {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Video bitrate in bits per second.
    pub video_bitrate: u32,
    /// Audio bitrate in bits per second.
    pub audio_bitrate: u32,
}

impl ExportFormat {
    pub fn profile(&self) -> FormatProfile {
        match self {
            // Small, low-rate target for legacy phones
            ExportFormat::ThreeGp => FormatProfile {
                width: 320,
                height: 240,
                fps: 15,
                video_bitrate: 500_000,
                audio_bitrate: 64_000,
            },
            ExportFormat::Avi => FormatProfile {
                width: 640,
                height: 480,
                fps: 30,
                video_bitrate: 1_500_000,
                audio_bitrate: 128_000,
            },
            ExportFormat::Mov => FormatProfile {
                width: 720,
                height: 480,
                fps: 30,
                video_bitrate: 2_000_000,
                audio_bitrate: 128_000,
            },
            ExportFormat::Webm | ExportFormat::Mp4 => FormatProfile {
                width: 720,
                height: 480,
                fps: 25,
                video_bitrate: 1_000_000,
                audio_bitrate: 128_000,
            },
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Webm => "webm",
            ExportFormat::Mp4 => "mp4",
            ExportFormat::Avi => "avi",
            ExportFormat::Mov => "mov",
            ExportFormat::ThreeGp => "3gp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Webm => "video/webm",
            ExportFormat::Mp4 => "video/mp4",
            ExportFormat::Avi => "video/x-msvideo",
            ExportFormat::Mov => "video/quicktime",
            ExportFormat::ThreeGp => "video/3gpp",
        }
    }
}
