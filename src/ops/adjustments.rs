// ============================================================================
// ADJUSTMENT OPERATIONS - the six-axis color adjustment model
// ============================================================================
//
// One combined per-pixel color operation applied in a fixed canonical order:
// hue-rotate, saturate, contrast, brightness, grayscale mix, sepia mix.
// The order is load-bearing: previews and commits must reproduce bit-for-bit.
// Rows are processed in parallel via rayon.
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub const BRIGHTNESS_MAX: f32 = 300.0;
pub const CONTRAST_MAX: f32 = 200.0;
pub const SATURATION_MAX: f32 = 300.0;
pub const MIX_MAX: f32 = 100.0;
pub const HUE_MAX: f32 = 360.0;

/// In-progress slider state. Percent fields are 100 = neutral except the two
/// mix axes (grayscale, sepia) where 0 = neutral; hue is in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentSettings {
    /// Brightness, 0-300 percent.
    pub brightness: f32,
    /// Contrast, 0-200 percent.
    pub contrast: f32,
    /// Saturation, 0-300 percent.
    pub saturation: f32,
    /// Grayscale mix, 0-100 percent.
    pub grayscale: f32,
    /// Sepia mix, 0-100 percent.
    pub sepia: f32,
    /// Hue rotation, 0-360 degrees.
    pub hue_rotate: f32,
}

impl Default for AdjustmentSettings {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            grayscale: 0.0,
            sepia: 0.0,
            hue_rotate: 0.0,
        }
    }
}

impl AdjustmentSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when every axis sits at its neutral value.
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }

    /// Clamp every axis into its documented range.
    pub fn clamped(mut self) -> Self {
        self.brightness = self.brightness.clamp(0.0, BRIGHTNESS_MAX);
        self.contrast = self.contrast.clamp(0.0, CONTRAST_MAX);
        self.saturation = self.saturation.clamp(0.0, SATURATION_MAX);
        self.grayscale = self.grayscale.clamp(0.0, MIX_MAX);
        self.sepia = self.sepia.clamp(0.0, MIX_MAX);
        self.hue_rotate = self.hue_rotate.clamp(0.0, HUE_MAX);
        self
    }
}

// Rec. 709 luma weights, used by both the saturation/hue matrices and the
// grayscale mix so the axes agree on what "luminance" means.
const LUMA_R: f32 = 0.2126;
const LUMA_G: f32 = 0.7152;
const LUMA_B: f32 = 0.0722;

/// Hue-rotation matrix over linear RGB (identity at 0 degrees).
fn hue_matrix(degrees: f32) -> [[f32; 3]; 3] {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ]
}

/// Saturation matrix (identity at factor 1.0, luma-gray at 0.0).
fn saturation_matrix(factor: f32) -> [[f32; 3]; 3] {
    let inv = 1.0 - factor;
    [
        [LUMA_R * inv + factor, LUMA_G * inv, LUMA_B * inv],
        [LUMA_R * inv, LUMA_G * inv + factor, LUMA_B * inv],
        [LUMA_R * inv, LUMA_G * inv, LUMA_B * inv + factor],
    ]
}

#[inline]
fn mul_matrix(m: &[[f32; 3]; 3], r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    (
        m[0][0] * r + m[0][1] * g + m[0][2] * b,
        m[1][0] * r + m[1][1] * g + m[1][2] * b,
        m[2][0] * r + m[2][1] * g + m[2][2] * b,
    )
}

/// Apply the combined adjustment to a bitmap, producing a new bitmap.
/// Alpha passes through untouched. Neutral settings return the input as-is
/// so the identity law holds exactly, not just within rounding.
pub fn apply(settings: &AdjustmentSettings, src: &RgbaImage) -> RgbaImage {
    if settings.is_neutral() {
        return src.clone();
    }

    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }

    let hue = hue_matrix(settings.hue_rotate);
    let sat = saturation_matrix(settings.saturation / 100.0);
    let contrast = settings.contrast / 100.0;
    let brightness = settings.brightness / 100.0;
    let gray_mix = settings.grayscale / 100.0;
    let sepia_mix = settings.sepia / 100.0;

    let src_raw = src.as_raw();
    let mut dst_raw = vec![0u8; w * h * 4];
    let stride = w * 4;

    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_in = &src_raw[y * stride..(y + 1) * stride];
        for x in 0..w {
            let pi = x * 4;
            let mut r = row_in[pi] as f32;
            let mut g = row_in[pi + 1] as f32;
            let mut b = row_in[pi + 2] as f32;
            let a = row_in[pi + 3];

            (r, g, b) = mul_matrix(&hue, r, g, b);
            (r, g, b) = mul_matrix(&sat, r, g, b);

            r = (r - 127.5) * contrast + 127.5;
            g = (g - 127.5) * contrast + 127.5;
            b = (b - 127.5) * contrast + 127.5;

            r *= brightness;
            g *= brightness;
            b *= brightness;

            if gray_mix > 0.0 {
                let luma = LUMA_R * r + LUMA_G * g + LUMA_B * b;
                r += (luma - r) * gray_mix;
                g += (luma - g) * gray_mix;
                b += (luma - b) * gray_mix;
            }

            if sepia_mix > 0.0 {
                let sr = 0.393 * r + 0.769 * g + 0.189 * b;
                let sg = 0.349 * r + 0.686 * g + 0.168 * b;
                let sb = 0.272 * r + 0.534 * g + 0.131 * b;
                r += (sr - r) * sepia_mix;
                g += (sg - g) * sepia_mix;
                b += (sb - b) * sepia_mix;
            }

            row_out[pi] = r.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 1] = g.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 2] = b.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 3] = a;
        }
    });

    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap()
}
