//! Window size and output resolution

/// Upper bound on the device pixel ratio used for the scene target
pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// Logical window size plus the display's scale factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Logical width in points
    pub width: f64,
    /// Logical height in points
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }

    /// Build from a physical size as reported by the window
    pub fn from_physical(width: u32, height: u32, device_pixel_ratio: f64) -> Self {
        let ratio = if device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self::new(width as f64 / ratio, height as f64 / ratio, ratio)
    }

    /// Camera aspect ratio, width over height
    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            (self.width / self.height) as f32
        } else {
            1.0
        }
    }

    /// Output pixel ratio, capped at [`MAX_PIXEL_RATIO`]
    pub fn pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio.min(MAX_PIXEL_RATIO)
    }

    /// Size of the offscreen scene target in pixels, at least 1x1
    pub fn render_size(&self) -> (u32, u32) {
        let ratio = self.pixel_ratio();
        let width = (self.width * ratio).floor().max(1.0) as u32;
        let height = (self.height * ratio).floor().max(1.0) as u32;
        (width, height)
    }
}
