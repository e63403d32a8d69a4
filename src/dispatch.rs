use std::sync::mpsc::SyncSender;

use crate::{
    error::{TowerError, TowerResult},
    font::FontSet,
    frame::Frame,
    geom::Point,
    layer::LayerStore,
    request::{DrawRequest, DrawResponse},
};

/// Applies request streams to the layer store and publishes frames.
///
/// One dispatcher serves every stream of a renderer; the transport layer
/// serializes streams so primitives apply in arrival order. The first
/// failing primitive latches the stream's status: later primitives are
/// skipped silently, the error message becomes the response, and no frame
/// is published.
pub struct Dispatcher {
    store: LayerStore,
    fonts: FontSet,
    frames: SyncSender<Frame>,
}

impl Dispatcher {
    pub fn new(frames: SyncSender<Frame>) -> Self {
        Self {
            store: LayerStore::new(),
            fonts: FontSet::new(),
            frames,
        }
    }

    /// Run one request stream to end-of-stream and produce its response.
    ///
    /// A transport error (an `Err` item) aborts the stream: the error is
    /// returned, no response is produced and no frame is published.
    pub fn run_stream<I>(&mut self, requests: I) -> TowerResult<DrawResponse>
    where
        I: IntoIterator<Item = TowerResult<DrawRequest>>,
    {
        let mut status: Option<TowerError> = None;
        for request in requests {
            let request = request?;
            if status.is_some() {
                continue;
            }
            if let Err(e) = self.apply(request) {
                log::debug!("stream latched error: {e}");
                status = Some(e);
            }
        }

        match status {
            None => {
                let frame = self.store.build_frame();
                self.frames
                    .send(frame)
                    .map_err(|_| TowerError::transport("render loop has exited"))?;
                Ok(DrawResponse::ok())
            }
            Some(e) => Ok(DrawResponse {
                message: e.client_message(),
            }),
        }
    }

    fn apply(&mut self, request: DrawRequest) -> TowerResult<()> {
        match request {
            DrawRequest::Init => {
                log::debug!("init");
                self.store.init();
                Ok(())
            }
            DrawRequest::Clear { layers } => {
                log::debug!("clear {layers:?}");
                let layers: Vec<usize> = layers.iter().map(|&l| l as usize).collect();
                self.store.clear(&layers)
            }
            DrawRequest::Fill { layer, color, mode } => {
                log::debug!("fill layer {layer}");
                self.store.fill(layer as usize, color.to_rgba16(), mode)
            }
            DrawRequest::SetPixels {
                layer,
                pixels,
                mode,
            } => {
                log::debug!("set {} pixels on layer {layer}", pixels.len());
                let pixels: Vec<(Point, _)> = pixels
                    .iter()
                    .map(|p| (p.point, p.color.to_rgba16()))
                    .collect();
                self.store.set_pixels(layer as usize, &pixels, mode)
            }
            DrawRequest::DrawRectangle {
                layer,
                min,
                max,
                color,
                mode,
            } => {
                log::debug!("draw rectangle on layer {layer}");
                self.store
                    .draw_rectangle(layer as usize, min, max, color.to_rgba16(), mode)
            }
            DrawRequest::DrawBitmap {
                layer,
                position,
                width,
                height,
                colors,
                mode,
            } => {
                log::debug!("draw {width}x{height} bitmap on layer {layer}");
                let colors: Vec<_> = colors.iter().map(|c| c.to_rgba16()).collect();
                self.store.draw_bitmap(
                    layer as usize,
                    position,
                    width as i32,
                    height as i32,
                    &colors,
                    mode,
                )
            }
            DrawRequest::WriteText {
                layer,
                x,
                font,
                text,
                color,
                mode,
            } => {
                log::debug!("write text on layer {layer}");
                let font = self
                    .fonts
                    .by_name(&font)
                    .ok_or_else(|| TowerError::validation("Unknown font"))?;
                self.store
                    .write_text(layer as usize, x, font, &text, color.to_rgba16(), mode)
            }
            DrawRequest::SetLayerOrigin { layer, origin } => {
                log::debug!("set layer {layer} origin to {origin:?}");
                self.store.set_layer_origin(layer as usize, origin)
            }
            DrawRequest::SetLayerAlpha { layer, alpha } => {
                log::debug!("set layer {layer} alpha to {alpha:#x}");
                self.store
                    .set_layer_alpha(layer as usize, (alpha & 0xFFFF) as u16)
            }
            DrawRequest::AutoRoll {
                layer,
                mode,
                entry,
                separator,
            } => {
                log::debug!("autoroll layer {layer}: {mode:?}");
                self.store
                    .auto_roll(layer as usize, mode, entry, separator)
            }
        }
    }
}
