use crate::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, MAX_LAYERS,
    canvas::Canvas,
    color::{OPAQUE, PaintMode, Rgba16},
    error::{TowerError, TowerResult},
    font::{Font, expand_aliases},
    geom::{Point, Rect},
};

/// Rolling behavior requested for a layer.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
pub enum RollMode {
    /// Not rolling; any banner occupying the slot stops.
    #[default]
    Stop,
    /// Replace whatever is rolling and start this banner at position 0.
    Start,
    /// Keep the current banner rolling; this snapshot stays in reserve.
    Continue,
    /// Queue this banner behind the current one; it takes over when the
    /// current banner completes its cycle.
    Next,
}

/// Rolling parameters recorded on a layer by `auto_roll`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RollSpec {
    pub mode: RollMode,
    /// Columns shown once when the banner enters, before the repeating body.
    pub entry: i32,
    /// Blank columns between body repetitions.
    pub separator: i32,
}

/// One of the [`MAX_LAYERS`] drawing surfaces.
///
/// The layer index is also the Z-order: lower indices composite first.
#[derive(Clone, Debug)]
pub(crate) struct Layer {
    pub image: Canvas,
    pub origin: Point,
    pub alpha: u16,
    pub roll: RollSpec,
    pub active: bool,
    pub dirty: bool,
}

impl Layer {
    fn fresh() -> Self {
        Self {
            image: Canvas::empty(),
            origin: Point::ZERO,
            alpha: OPAQUE,
            roll: RollSpec::default(),
            active: false,
            dirty: false,
        }
    }

    fn reset(&mut self) {
        *self = Self::fresh();
    }
}

/// The mutable drawing state shared by all streams of one renderer.
///
/// Every primitive below marks the touched layer active and dirty, except
/// `init`/`clear` which deactivate. Dispatchers serialize access; the render
/// loop only ever sees immutable snapshots built from this store.
pub struct LayerStore {
    pub(crate) layers: [Layer; MAX_LAYERS],
}

impl LayerStore {
    pub fn new() -> Self {
        Self {
            layers: std::array::from_fn(|_| Layer::fresh()),
        }
    }

    fn layer_mut(&mut self, layer: usize) -> TowerResult<&mut Layer> {
        self.layers
            .get_mut(layer)
            .ok_or_else(|| TowerError::validation("layer index out of range"))
    }

    fn touch(&mut self, layer: usize) -> TowerResult<&mut Layer> {
        let l = self.layer_mut(layer)?;
        l.active = true;
        l.dirty = true;
        Ok(l)
    }

    /// Reset every layer to its initial state and deactivate all.
    pub fn init(&mut self) {
        for l in &mut self.layers {
            l.reset();
        }
    }

    /// Reset the listed layers and deactivate them.
    pub fn clear(&mut self, layers: &[usize]) -> TowerResult<()> {
        for &layer in layers {
            self.layer_mut(layer)?.reset();
        }
        Ok(())
    }

    /// Paint every pixel inside the layer's *current* bounds.
    ///
    /// Deliberately does not grow the canvas to the display rectangle: on a
    /// freshly reset layer this paints nothing. Clients that want a
    /// display-sized fill issue `set_layer_origin` first.
    pub fn fill(&mut self, layer: usize, color: Rgba16, mode: PaintMode) -> TowerResult<()> {
        let l = self.touch(layer)?;
        let bounds = l.image.bounds();
        for y in bounds.min_y..bounds.max_y {
            for x in bounds.min_x..bounds.max_x {
                l.image.paint(x, y, color, mode);
            }
        }
        Ok(())
    }

    /// Paint individual pixels, growing the canvas around each one.
    pub fn set_pixels(
        &mut self,
        layer: usize,
        pixels: &[(Point, Rgba16)],
        mode: PaintMode,
    ) -> TowerResult<()> {
        let l = self.touch(layer)?;
        for &(p, color) in pixels {
            l.image.union_resize(Rect::new(p.x, p.y, p.x + 1, p.y + 1));
            l.image.paint(p.x, p.y, color, mode);
        }
        Ok(())
    }

    /// Paint the half-open rectangle `[min, max)`.
    pub fn draw_rectangle(
        &mut self,
        layer: usize,
        min: Point,
        max: Point,
        color: Rgba16,
        mode: PaintMode,
    ) -> TowerResult<()> {
        let l = self.touch(layer)?;
        let rect = Rect::new(min.x, min.y, max.x, max.y);
        l.image.union_resize(rect);
        for y in rect.min_y..rect.max_y {
            for x in rect.min_x..rect.max_x {
                l.image.paint(x, y, color, mode);
            }
        }
        Ok(())
    }

    /// Paint a row-major `width × height` block of colors at `position`.
    pub fn draw_bitmap(
        &mut self,
        layer: usize,
        position: Point,
        width: i32,
        height: i32,
        colors: &[Rgba16],
        mode: PaintMode,
    ) -> TowerResult<()> {
        if width < 0 || height < 0 {
            return Err(TowerError::validation("bitmap dimensions must be non-negative"));
        }
        if colors.len() != (width as usize) * (height as usize) {
            return Err(TowerError::validation(
                "bitmap color count does not match width * height",
            ));
        }
        let l = self.touch(layer)?;
        let rect = Rect::new(
            position.x,
            position.y,
            position.x + width,
            position.y + height,
        );
        l.image.union_resize(rect);
        let mut i = 0;
        for y in rect.min_y..rect.max_y {
            for x in rect.min_x..rect.max_x {
                l.image.paint(x, y, colors[i], mode);
                i += 1;
            }
        }
        Ok(())
    }

    /// Render text at pen position `x` on row band `[0, 8)`.
    ///
    /// Aliases are expanded first; runes without a glyph are skipped and do
    /// not advance the pen, and only glyph-bearing runes count toward the
    /// canvas growth.
    pub fn write_text(
        &mut self,
        layer: usize,
        x: i32,
        font: &Font,
        text: &str,
        color: Rgba16,
        mode: PaintMode,
    ) -> TowerResult<()> {
        let l = self.touch(layer)?;
        let msg = expand_aliases(text);
        let known = msg.chars().filter(|&c| font.glyph(c).is_some()).count() as i32;
        l.image.union_resize(Rect::new(x, 0, x + font.width * known, font.height));

        let mut pen = x;
        for ch in msg.chars() {
            let Some(columns) = font.glyph(ch) else {
                continue;
            };
            for &column in columns {
                for y in 0..font.height {
                    if (column >> y) & 1 != 0 {
                        l.image.paint(pen, y, color, mode);
                    }
                }
                pen += 1;
            }
        }
        Ok(())
    }

    /// Move the layer origin, growing the canvas so that the full display
    /// window `[origin.x, origin.x + W) × [origin.y, origin.y + H)` samples
    /// in-bounds.
    pub fn set_layer_origin(&mut self, layer: usize, origin: Point) -> TowerResult<()> {
        let l = self.touch(layer)?;
        l.origin = origin;
        l.image.union_resize(Rect::new(
            origin.x,
            origin.y,
            origin.x + DISPLAY_WIDTH,
            origin.y + DISPLAY_HEIGHT,
        ));
        Ok(())
    }

    /// Set the layer opacity multiplier (0..=0xFFFF).
    pub fn set_layer_alpha(&mut self, layer: usize, alpha: u16) -> TowerResult<()> {
        self.touch(layer)?.alpha = alpha;
        Ok(())
    }

    /// Record rolling parameters for the layer.
    pub fn auto_roll(
        &mut self,
        layer: usize,
        mode: RollMode,
        entry: i32,
        separator: i32,
    ) -> TowerResult<()> {
        if entry < 0 || separator < 0 {
            return Err(TowerError::validation(
                "autoroll entry and separator must be non-negative",
            ));
        }
        let l = self.touch(layer)?;
        l.roll = RollSpec {
            mode,
            entry,
            separator,
        };
        Ok(())
    }
}

impl Default for LayerStore {
    fn default() -> Self {
        Self::new()
    }
}
