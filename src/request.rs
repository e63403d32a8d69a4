use crate::{color::PaintMode, color::Rgba16, geom::Point, layer::RollMode};

/// Wire color; only the low byte of each channel is significant.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
pub struct Color {
    #[serde(default)]
    pub red: u32,
    #[serde(default)]
    pub green: u32,
    #[serde(default)]
    pub blue: u32,
    #[serde(default)]
    pub alpha: u32,
}

impl Color {
    pub const fn rgba(red: u32, green: u32, blue: u32, alpha: u32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    pub(crate) fn to_rgba16(self) -> Rgba16 {
        Rgba16::from_rgba8(
            (self.red & 0xFF) as u8,
            (self.green & 0xFF) as u8,
            (self.blue & 0xFF) as u8,
            (self.alpha & 0xFF) as u8,
        )
    }
}

/// One pixel write within a `SetPixels` request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PixelUpdate {
    pub point: Point,
    pub color: Color,
}

/// One drawing command of a stream.
///
/// The tagged union the RPC layer carries; field names are the wire
/// contract. Every variant names the layer it touches except `Init`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum DrawRequest {
    /// Reset every layer and deactivate all.
    Init,
    /// Reset the listed layers.
    Clear { layers: Vec<u32> },
    /// Paint the layer's current bounds with one color.
    Fill {
        layer: u32,
        color: Color,
        #[serde(default)]
        mode: PaintMode,
    },
    /// Paint individual pixels.
    SetPixels {
        layer: u32,
        pixels: Vec<PixelUpdate>,
        #[serde(default)]
        mode: PaintMode,
    },
    /// Paint the half-open rectangle `[min, max)`.
    DrawRectangle {
        layer: u32,
        min: Point,
        max: Point,
        color: Color,
        #[serde(default)]
        mode: PaintMode,
    },
    /// Paint a row-major color block at `position`.
    DrawBitmap {
        layer: u32,
        position: Point,
        width: u32,
        height: u32,
        colors: Vec<Color>,
        #[serde(default)]
        mode: PaintMode,
    },
    /// Render text at pen position `x`; `font` is "6x8" or "8x8".
    WriteText {
        layer: u32,
        x: i32,
        font: String,
        text: String,
        color: Color,
        #[serde(default)]
        mode: PaintMode,
    },
    /// Move the layer origin (the scroll position for rolling layers).
    SetLayerOrigin { layer: u32, origin: Point },
    /// Set the layer opacity multiplier (0..=0xFFFF).
    SetLayerAlpha { layer: u32, alpha: u32 },
    /// Configure rolling for the layer.
    AutoRoll {
        layer: u32,
        mode: RollMode,
        #[serde(default)]
        entry: i32,
        #[serde(default)]
        separator: i32,
    },
}

/// The single reply a stream receives at end-of-stream.
///
/// An empty message means every primitive succeeded and the frame was
/// published.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DrawResponse {
    #[serde(default)]
    pub message: String,
}

impl DrawResponse {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn is_ok(&self) -> bool {
        self.message.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_roundtrip() {
        let req = DrawRequest::WriteText {
            layer: 2,
            x: 5,
            font: "6x8".to_string(),
            text: "hello \u{2764}".to_string(),
            color: Color::rgba(255, 255, 255, 255),
            mode: PaintMode::Over,
        };
        let s = serde_json::to_string(&req).unwrap();
        let de: DrawRequest = serde_json::from_str(&s).unwrap();
        assert_eq!(de, req);
    }

    #[test]
    fn paint_mode_defaults_to_over() {
        let de: DrawRequest = serde_json::from_str(
            r#"{"Fill":{"layer":0,"color":{"red":255,"green":0,"blue":0,"alpha":255}}}"#,
        )
        .unwrap();
        assert_eq!(
            de,
            DrawRequest::Fill {
                layer: 0,
                color: Color::rgba(255, 0, 0, 255),
                mode: PaintMode::Over,
            }
        );
    }

    #[test]
    fn wire_color_uses_low_bytes_only() {
        let c = Color::rgba(0x1FF, 0x100, 0x0AB, 0xFFFF_FF80);
        assert_eq!(c.to_rgba16(), Rgba16::from_rgba8(0xFF, 0x00, 0xAB, 0x80));
    }

    #[test]
    fn response_emptiness_signals_success() {
        assert!(DrawResponse::ok().is_ok());
        assert!(
            !DrawResponse {
                message: "Unknown font".to_string()
            }
            .is_ok()
        );
    }
}
