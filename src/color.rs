/// Channel value of a fully opaque pixel.
pub const OPAQUE: u16 = 0xFFFF;

/// 16-bit-per-channel straight-alpha RGBA.
///
/// Layer canvases and the compositing path work in 16 bits so the blend
/// arithmetic below is exact; the strip mapper narrows back to 8 bits per
/// channel when packing words.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgba16 {
    pub r: u16,
    pub g: u16,
    pub b: u16,
    pub a: u16,
}

impl Rgba16 {
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    pub const fn new(r: u16, g: u16, b: u16, a: u16) -> Self {
        Self { r, g, b, a }
    }

    /// Widen 8-bit channels by byte replication (`0xAB` → `0xABAB`), so an
    /// 8-bit round trip through `(c >> 8) & 0xFF` is lossless.
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as u16 * 0x101,
            g: g as u16 * 0x101,
            b: b as u16 * 0x101,
            a: a as u16 * 0x101,
        }
    }
}

/// How a primitive writes into a canvas.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
pub enum PaintMode {
    /// Alpha-over blend with the existing pixel.
    #[default]
    Over,
    /// Replace the existing pixel, alpha included.
    Set,
}

/// Alpha-over blend of `fg` onto an opaque `bg`.
///
/// Per channel: `(c1·a1 + c0·(0xFFFF − a1)) / 0xFFFF`; the result is always
/// opaque. No gamma correction.
pub fn combine_over(bg: Rgba16, fg: Rgba16) -> Rgba16 {
    let a1 = u32::from(fg.a);
    let a0 = 0xFFFF - a1;
    let blend = |c1: u16, c0: u16| -> u16 {
        ((u32::from(c1) * a1 + u32::from(c0) * a0) / 0xFFFF) as u16
    };
    Rgba16 {
        r: blend(fg.r, bg.r),
        g: blend(fg.g, bg.g),
        b: blend(fg.b, bg.b),
        a: OPAQUE,
    }
}
