use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH,
    canvas::Canvas,
    error::{TowerError, TowerResult},
};

/// A WS281x-style LED chain.
///
/// The render loop owns exactly one of these; errors from `render` are
/// logged there and never reach drawing clients.
pub trait PixelStrip {
    fn init(&mut self) -> TowerResult<()>;
    /// Push the LED buffer out to the hardware.
    fn render(&mut self) -> TowerResult<()>;
    /// Block until the previous render has been clocked out.
    fn wait(&mut self) -> TowerResult<()>;
    fn fini(&mut self);
    /// Mutable view of the 24-bit color words for `channel`.
    fn leds(&mut self, channel: usize) -> &mut [u32];
}

/// Maps display coordinates onto the serpentine-wired chain.
///
/// Columns are wired vertically, alternating top-to-bottom and
/// bottom-to-top. The xy→index table is precomputed once.
pub struct StripMapper {
    index_by_xy: Vec<usize>,
}

impl StripMapper {
    pub fn new() -> Self {
        let w = DISPLAY_WIDTH as usize;
        let h = DISPLAY_HEIGHT as usize;
        let mut index_by_xy = vec![0usize; w * h];
        for x in 0..w {
            for y in 0..h {
                let index = if x % 2 == 0 {
                    x * h + y
                } else {
                    x * h + (h - 1 - y)
                };
                index_by_xy[y * w + x] = index;
            }
        }
        Self { index_by_xy }
    }

    /// Chain index of display pixel `(x, y)`.
    pub fn index(&self, x: i32, y: i32) -> usize {
        self.index_by_xy[y as usize * DISPLAY_WIDTH as usize + x as usize]
    }

    /// Write the composite into the strip's channel-0 words and render.
    pub fn flush(&self, composite: &Canvas, strip: &mut dyn PixelStrip) -> TowerResult<()> {
        let leds = strip.leds(0);
        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                let px = composite.get(x, y);
                let word = (u32::from(px.r >> 8) << 16)
                    | (u32::from(px.g >> 8) << 8)
                    | u32::from(px.b >> 8);
                leds[self.index(x, y)] = word;
            }
        }
        strip.render()
    }
}

impl Default for StripMapper {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared read handle onto a [`MemoryStrip`]: the words of the last render
/// and a render counter. Clone freely across threads.
#[derive(Clone, Debug)]
pub struct StripProbe {
    words: Arc<Mutex<Vec<u32>>>,
    renders: Arc<AtomicUsize>,
}

impl StripProbe {
    /// Words as of the most recent `render`, all zero before the first.
    pub fn words(&self) -> Vec<u32> {
        self.words
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

/// An in-memory strip for tests and headless runs.
///
/// `render` publishes the current words through the [`StripProbe`] so other
/// threads can observe what the hardware would have shown.
#[derive(Debug)]
pub struct MemoryStrip {
    leds: Vec<u32>,
    probe: StripProbe,
}

impl MemoryStrip {
    pub fn new() -> Self {
        let len = (DISPLAY_WIDTH * DISPLAY_HEIGHT) as usize;
        let probe = StripProbe {
            words: Arc::new(Mutex::new(vec![0; len])),
            renders: Arc::new(AtomicUsize::new(0)),
        };
        Self {
            leds: vec![0; len],
            probe,
        }
    }

    pub fn probe(&self) -> StripProbe {
        self.probe.clone()
    }
}

impl Default for MemoryStrip {
    fn default() -> Self {
        Self::new()
    }
}

impl PixelStrip for MemoryStrip {
    fn init(&mut self) -> TowerResult<()> {
        Ok(())
    }

    fn render(&mut self) -> TowerResult<()> {
        *self
            .probe
            .words
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = self.leds.clone();
        self.probe.renders.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn wait(&mut self) -> TowerResult<()> {
        Ok(())
    }

    fn fini(&mut self) {}

    fn leds(&mut self, channel: usize) -> &mut [u32] {
        assert_eq!(channel, 0, "only channel 0 is wired");
        &mut self.leds
    }
}

/// A strip that mirrors every render into a PNG, for desk-side preview of
/// what the tower would show.
pub struct PngStrip {
    leds: Vec<u32>,
    path: PathBuf,
}

impl PngStrip {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            leds: vec![0; (DISPLAY_WIDTH * DISPLAY_HEIGHT) as usize],
            path: path.into(),
        }
    }
}

impl PixelStrip for PngStrip {
    fn init(&mut self) -> TowerResult<()> {
        Ok(())
    }

    fn render(&mut self) -> TowerResult<()> {
        let w = DISPLAY_WIDTH as u32;
        let h = DISPLAY_HEIGHT as u32;
        let mut img = image::RgbImage::new(w, h);
        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                // Undo the serpentine wiring to recover display order.
                let index = if x % 2 == 0 {
                    x * DISPLAY_HEIGHT + y
                } else {
                    x * DISPLAY_HEIGHT + (DISPLAY_HEIGHT - 1 - y)
                };
                let word = self.leds[index as usize];
                img.put_pixel(
                    x as u32,
                    y as u32,
                    image::Rgb([
                        ((word >> 16) & 0xFF) as u8,
                        ((word >> 8) & 0xFF) as u8,
                        (word & 0xFF) as u8,
                    ]),
                );
            }
        }
        img.save(&self.path)
            .map_err(|e| TowerError::hardware(format!("png preview write failed: {e}")))
    }

    fn wait(&mut self) -> TowerResult<()> {
        Ok(())
    }

    fn fini(&mut self) {}

    fn leds(&mut self, channel: usize) -> &mut [u32] {
        assert_eq!(channel, 0, "only channel 0 is wired");
        &mut self.leds
    }
}
