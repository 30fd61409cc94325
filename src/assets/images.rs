//! Matcap and environment image decoding
//!
//! The matcap is expanded to RGBA8 and uploaded as sRGB. The environment is
//! a Radiance HDR image decoded to linear floats, box-filtered into a mip
//! chain and packed as `Rgb9e5Ufloat` texels so the GPU can filter it.

use std::borrow::Cow;
use std::path::Path;

use super::AssetError;

/// Mantissa bits per channel in the shared-exponent format
const RGB9E5_MANTISSA_BITS: i32 = 9;
/// Exponent bias of the shared-exponent format
const RGB9E5_EXP_BIAS: i32 = 15;
/// Largest representable component value
const RGB9E5_MAX: f32 = 65408.0;

/// Decoded matcap texture, tightly packed RGBA8
#[derive(Debug, Clone)]
pub struct MatcapImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl MatcapImage {
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let image = image::open(path).map_err(|error| AssetError::Image {
            path: path.to_path_buf(),
            error,
        })?;
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    /// The image scaled down so neither side exceeds `max_dimension`,
    /// borrowed when it already fits. `None` when the pixel buffer does not
    /// match the dimensions.
    pub fn fit_within(&self, max_dimension: u32) -> Option<Cow<'_, MatcapImage>> {
        if self.width == 0
            || self.height == 0
            || self.pixels.len() != (self.width as usize) * (self.height as usize) * 4
        {
            return None;
        }
        let max_dimension = max_dimension.max(1);
        if self.width <= max_dimension && self.height <= max_dimension {
            return Some(Cow::Borrowed(self));
        }

        let scale = max_dimension as f64 / self.width.max(self.height) as f64;
        let fit = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max_dimension);
        let (width, height) = (fit(self.width), fit(self.height));

        let source = image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())?;
        let resized = image::imageops::resize(
            &source,
            width,
            height,
            image::imageops::FilterType::Triangle,
        );
        Some(Cow::Owned(Self {
            width,
            height,
            pixels: resized.into_raw(),
        }))
    }
}

/// One mip level of the environment, packed rgb9e5
#[derive(Debug, Clone)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<u32>,
}

/// Equirectangular HDR environment with its full mip chain
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    pub levels: Vec<MipLevel>,
}

impl EnvironmentMap {
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let image = image::open(path).map_err(|error| AssetError::Image {
            path: path.to_path_buf(),
            error,
        })?;
        let rgb = image.into_rgb32f();
        let (width, height) = rgb.dimensions();
        Self::from_linear_rgb(width, height, rgb.as_raw())
            .ok_or_else(|| AssetError::EmptyImage(path.to_path_buf()))
    }

    /// Build from linear RGB floats (3 per texel, row-major).
    ///
    /// Returns `None` for empty or mismatched input.
    pub fn from_linear_rgb(width: u32, height: u32, data: &[f32]) -> Option<Self> {
        if width == 0 || height == 0 || data.len() != (width * height * 3) as usize {
            return None;
        }

        let mut current: Vec<[f32; 3]> = data
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        let (mut w, mut h) = (width, height);
        let mut levels = Vec::new();

        loop {
            levels.push(MipLevel {
                width: w,
                height: h,
                texels: current.iter().map(|&[r, g, b]| pack_rgb9e5(r, g, b)).collect(),
            });
            if w == 1 && h == 1 {
                break;
            }
            let (next, nw, nh) = downsample(&current, w, h);
            current = next;
            w = nw;
            h = nh;
        }

        Some(Self { levels })
    }

    pub fn width(&self) -> u32 {
        self.levels.first().map_or(0, |level| level.width)
    }

    pub fn height(&self) -> u32 {
        self.levels.first().map_or(0, |level| level.height)
    }

    pub fn mip_level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    /// The mip chain from the first level whose sides are both at most
    /// `max_dimension`
    pub fn levels_within(&self, max_dimension: u32) -> &[MipLevel] {
        let first = self
            .levels
            .iter()
            .position(|level| level.width <= max_dimension && level.height <= max_dimension)
            .unwrap_or(self.levels.len().saturating_sub(1));
        &self.levels[first.min(self.levels.len())..]
    }
}

/// 2x2 box filter; odd edges clamp to the last texel
fn downsample(texels: &[[f32; 3]], width: u32, height: u32) -> (Vec<[f32; 3]>, u32, u32) {
    let nw = (width / 2).max(1);
    let nh = (height / 2).max(1);
    let fetch = |x: u32, y: u32| texels[(y.min(height - 1) * width + x.min(width - 1)) as usize];

    let mut out = Vec::with_capacity((nw * nh) as usize);
    for y in 0..nh {
        for x in 0..nw {
            let samples = [
                fetch(2 * x, 2 * y),
                fetch(2 * x + 1, 2 * y),
                fetch(2 * x, 2 * y + 1),
                fetch(2 * x + 1, 2 * y + 1),
            ];
            let mut sum = [0.0f32; 3];
            for s in samples {
                for c in 0..3 {
                    sum[c] += s[c];
                }
            }
            out.push(sum.map(|v| v * 0.25));
        }
    }
    (out, nw, nh)
}

/// Pack linear RGB into the shared-exponent `Rgb9e5Ufloat` layout
pub fn pack_rgb9e5(r: f32, g: f32, b: f32) -> u32 {
    let clamp = |c: f32| if c > 0.0 { c.min(RGB9E5_MAX) } else { 0.0 };
    let (r, g, b) = (clamp(r), clamp(g), clamp(b));
    let max = r.max(g).max(b);

    let mut exponent = (max.log2().floor() as i32).max(-RGB9E5_EXP_BIAS - 1) + 1 + RGB9E5_EXP_BIAS;
    let mut denom = 2f32.powi(exponent - RGB9E5_EXP_BIAS - RGB9E5_MANTISSA_BITS);
    if (max / denom + 0.5).floor() as u32 == 1 << RGB9E5_MANTISSA_BITS {
        denom *= 2.0;
        exponent += 1;
    }

    let quantize = |c: f32| ((c / denom + 0.5).floor() as u32).min(511);
    quantize(r) | (quantize(g) << 9) | (quantize(b) << 18) | ((exponent as u32) << 27)
}

/// Inverse of [`pack_rgb9e5`]
pub fn unpack_rgb9e5(packed: u32) -> [f32; 3] {
    let exponent = (packed >> 27) as i32;
    let scale = 2f32.powi(exponent - RGB9E5_EXP_BIAS - RGB9E5_MANTISSA_BITS);
    [
        (packed & 0x1ff) as f32 * scale,
        ((packed >> 9) & 0x1ff) as f32 * scale,
        ((packed >> 18) & 0x1ff) as f32 * scale,
    ]
}
