//! Frame geometry and compositing.
//!
//! Every path that turns a source frame into output (live preview, recording
//! stream, screenshot, export) goes through the same pieces:
//!
//! ## Components
//! - `placement`: where the frame sits inside its container (contain fit)
//! - `region`: normalized selections and their mapping to source pixels
//! - `effects`: blur, pixelate and mirror primitives
//! - `compositor`: mirror → crop → effect for one frame
//! - `live`: continuous regime driven by a frame clock
//! - `exporter`: stepped regime driven by explicit seeks
//! - `screenshot`: single-flight still capture
//! - `zoom`: preview zoom/pan (display only)

pub mod compositor;
pub mod coord;
pub mod effects;
pub mod exporter;
pub mod live;
pub mod placement;
pub mod region;
pub mod screenshot;
pub mod types;
pub mod zoom;

pub use compositor::{Compositor, EffectTarget};
pub use coord::{ContainerSpace, ContainerUVSpace, Coord, FrameSpace, Rect, Size};
pub use effects::{BlurFilter, DisabledBlur, NativeBlur};
pub use exporter::{
    export_clip, ExportCanvas, ExportFormat, ExportOutcome, ExportProgress, ExportSettings,
    ExportStage, FrameEncoder, SeekableSource, TrimRange,
};
pub use live::{render_tick, FrameSink, FrameSource, LivePipeline, LiveState, LiveStatus};
pub use placement::{compute_display_placement, DisplayPlacement};
pub use region::{
    Layout, NormalizedRegion, PixelBounds, RegionKind, RegionSelection, ResizeHandle,
    SourcePixelRegion,
};
pub use screenshot::{Screenshot, ScreenshotCapturer};
pub use types::*;
pub use zoom::ViewTransform;
