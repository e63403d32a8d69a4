#![forbid(unsafe_code)]

//! Layered renderer for a serpentine-wired WS281x LED tower.
//!
//! Clients draw into independent layers over a streaming command protocol;
//! at end-of-stream the layers are snapshotted into an immutable frame and
//! handed to a long-lived render loop, which composites frames, advances
//! rolling banners on an internal tick, and flushes the result to the strip.

mod canvas;
mod color;
mod dispatch;
mod error;
mod font;
mod frame;
mod geom;
mod layer;
mod render;
mod request;
mod rolling;
mod server;
mod strip;

pub use canvas::Canvas;
pub use color::{OPAQUE, PaintMode, Rgba16, combine_over};
pub use dispatch::Dispatcher;
pub use error::{TowerError, TowerResult};
pub use font::{Font, FontSet, expand_aliases};
pub use frame::{BannerMode, Frame, PreparedLayer, RollState};
pub use geom::{Point, Rect};
pub use layer::{LayerStore, RollMode, RollSpec};
pub use render::{RenderConfig, RenderLoop};
pub use request::{Color, DrawRequest, DrawResponse, PixelUpdate};
pub use server::serve;
pub use strip::{MemoryStrip, PixelStrip, PngStrip, StripMapper, StripProbe};

/// Display width in columns.
pub const DISPLAY_WIDTH: i32 = 128;

/// Display height in rows.
pub const DISPLAY_HEIGHT: i32 = 8;

/// Number of drawing layers per renderer; the layer index is the Z-order.
pub const MAX_LAYERS: usize = 8;
