use std::sync::Arc;

use crate::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH,
    canvas::Canvas,
    color::Rgba16,
    geom::{Point, Rect},
    layer::{LayerStore, RollMode},
};

/// Rolling modes a prepared layer can carry into the render loop.
///
/// `Stop` never reaches here; a stopped layer snapshots as
/// [`RollState::Static`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BannerMode {
    Start,
    Continue,
    Next,
}

/// How a prepared layer participates in rolling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RollState {
    Static,
    Rolling {
        mode: BannerMode,
        /// Columns of the entry strip at the head of the extended canvas.
        entry: i32,
        /// Scroll position at which one full cycle completes.
        last: i32,
    },
}

/// An immutable snapshot of one active layer, alpha already folded in.
#[derive(Clone, Debug)]
pub struct PreparedLayer {
    pub id: usize,
    pub image: Arc<Canvas>,
    pub origin: Point,
    pub roll: RollState,
}

/// An ordered snapshot of the active layers, lowest id first.
pub type Frame = Vec<PreparedLayer>;

impl LayerStore {
    /// Snapshot the active layers into an immutable [`Frame`].
    ///
    /// Per layer: fold the layer alpha into each pixel, and for any
    /// non-`Stop` roll mode replace the canvas with the pre-extended
    /// tileable version (origin reset to 0,0). The store itself is left
    /// untouched apart from the dirty flags, which are consumed here.
    pub fn build_frame(&mut self) -> Frame {
        let mut frame = Frame::new();
        for (id, layer) in self.layers.iter_mut().enumerate() {
            if !layer.active {
                continue;
            }
            if layer.dirty {
                log::debug!("layer {id} changed this transaction");
                layer.dirty = false;
            }

            let folded = fold_alpha(&layer.image, layer.alpha);
            let prepared = match layer.roll.mode {
                RollMode::Stop => PreparedLayer {
                    id,
                    image: Arc::new(folded),
                    origin: layer.origin,
                    roll: RollState::Static,
                },
                mode => match extend_banner(&folded, layer.roll.entry, layer.roll.separator) {
                    Some((extended, last)) => PreparedLayer {
                        id,
                        image: Arc::new(extended),
                        origin: Point::ZERO,
                        roll: RollState::Rolling {
                            mode: banner_mode(mode),
                            entry: layer.roll.entry,
                            last,
                        },
                    },
                    None => {
                        log::warn!(
                            "layer {id}: degenerate rolling geometry, rendering static"
                        );
                        PreparedLayer {
                            id,
                            image: Arc::new(folded),
                            origin: layer.origin,
                            roll: RollState::Static,
                        }
                    }
                },
            };
            frame.push(prepared);
        }
        frame
    }
}

fn banner_mode(mode: RollMode) -> BannerMode {
    match mode {
        RollMode::Start => BannerMode::Start,
        RollMode::Continue => BannerMode::Continue,
        RollMode::Next => BannerMode::Next,
        RollMode::Stop => unreachable!("stopped layers snapshot as static"),
    }
}

/// Copy `src` with every pixel's alpha scaled by `layer_alpha`.
fn fold_alpha(src: &Canvas, layer_alpha: u16) -> Canvas {
    let bounds = src.bounds();
    let mut out = Canvas::new(bounds);
    for y in bounds.min_y..bounds.max_y {
        for x in bounds.min_x..bounds.max_x {
            let px = src.get(x, y);
            let a = (u32::from(px.a) * u32::from(layer_alpha) / 0xFFFF) as u16;
            out.set(x, y, Rgba16::new(px.r, px.g, px.b, a));
        }
    }
    out
}

/// Build the pre-extended tileable canvas for a rolling layer.
///
/// Layout per row, left to right: a blank prolog of `W−1` columns, the
/// `entry` strip, `n_body + 1` repetitions of the `body + sep` pattern, and
/// a `W−1`-column run-on copy of the pattern so the wrap is seamless.
/// Returns the canvas and `last`, the scroll position at which the cycle
/// completes. `None` when the geometry is degenerate (`body + sep <= 0`).
fn extend_banner(src: &Canvas, entry: i32, sep: i32) -> Option<(Canvas, i32)> {
    let w = DISPLAY_WIDTH;
    let width = src.width();
    let body = width - entry - sep;
    let period = body + sep;
    if period <= 0 {
        return None;
    }

    let n_body = (w + sep - 1) / period;
    let total = 2 * (w - 1) + entry + (n_body + 1) * period;
    let sx = src.bounds().min_x;

    let mut out = Canvas::new(Rect::new(0, 0, total, DISPLAY_HEIGHT));
    for y in 0..DISPLAY_HEIGHT {
        for c in 0..entry {
            out.set(w - 1 + c, y, src.get(sx + c, y));
        }
        for tile in 0..=n_body {
            let base = w - 1 + entry + tile * period;
            for c in 0..period {
                out.set(base + c, y, src.get(sx + entry + c, y));
            }
        }
        let tail = w - 1 + entry + (n_body + 1) * period;
        for c in 0..(w - 1) {
            out.set(tail + c, y, src.get(sx + entry + c % period, y));
        }
    }

    let last = total - 2 * w + 1;
    Some((out, last))
}
