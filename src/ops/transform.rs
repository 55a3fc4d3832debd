// ============================================================================
// TRANSFORM OPERATIONS - rotate, flip, crop
// ============================================================================

use image::{Rgba, RgbaImage, imageops};
use serde::{Deserialize, Serialize};

use crate::error::EditError;

/// Quarter-turn direction about the bitmap center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotateDirection {
    #[serde(rename = "cw")]
    Clockwise,
    #[serde(rename = "ccw")]
    CounterClockwise,
}

/// Mirror axis. `Horizontal` mirrors left-right (across the vertical axis),
/// `Vertical` mirrors top-bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipDirection {
    Horizontal,
    Vertical,
}

/// Crop selection shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropShape {
    Rectangular,
    Elliptical,
}

/// A finished crop selection in source-bitmap coordinates.
///
/// `aspect` records the ratio the selection widget was locked to; it only
/// constrains the external selection UI. The stored result always has the
/// dimensions of the rectangle at apply time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropSpec {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub aspect: Option<(u32, u32)>,
    #[serde(default = "CropSpec::default_shape")]
    pub shape: CropShape,
}

impl CropSpec {
    pub fn rect(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            aspect: None,
            shape: CropShape::Rectangular,
        }
    }

    pub fn elliptical(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            shape: CropShape::Elliptical,
            ..Self::rect(x, y, width, height)
        }
    }

    fn default_shape() -> CropShape {
        CropShape::Rectangular
    }
}

/// Rotate a bitmap 90 degrees, swapping width and height.
/// Two turns in opposite directions restore the input exactly.
pub fn rotate_quarter(src: &RgbaImage, direction: RotateDirection) -> RgbaImage {
    match direction {
        RotateDirection::Clockwise => imageops::rotate90(src),
        RotateDirection::CounterClockwise => imageops::rotate270(src),
    }
}

/// Mirror a bitmap in place along the given axis. Dimensions are unchanged
/// and applying the same flip twice restores the input.
pub fn flip(src: &RgbaImage, direction: FlipDirection) -> RgbaImage {
    match direction {
        FlipDirection::Horizontal => imageops::flip_horizontal(src),
        FlipDirection::Vertical => imageops::flip_vertical(src),
    }
}

/// Extract the sub-region described by `spec`, clamped to the source bounds.
/// For an elliptical selection, pixels outside the inscribed ellipse of the
/// cropped rectangle are cleared to transparent.
pub fn crop(src: &RgbaImage, spec: &CropSpec) -> Result<RgbaImage, EditError> {
    if spec.width == 0 || spec.height == 0 {
        return Err(EditError::EmptyFrame);
    }
    if spec.x >= src.width() || spec.y >= src.height() {
        return Err(EditError::EmptyFrame);
    }

    let width = spec.width.min(src.width() - spec.x);
    let height = spec.height.min(src.height() - spec.y);

    let mut out = imageops::crop_imm(src, spec.x, spec.y, width, height).to_image();
    if spec.shape == CropShape::Elliptical {
        mask_inscribed_ellipse(&mut out);
    }
    Ok(out)
}

/// Clear everything outside the ellipse inscribed in the bitmap rectangle.
/// Sampled at pixel centers so the mask is symmetric.
fn mask_inscribed_ellipse(img: &mut RgbaImage) {
    let semi_x = img.width() as f32 / 2.0;
    let semi_y = img.height() as f32 / 2.0;
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let nx = (x as f32 + 0.5 - semi_x) / semi_x;
        let ny = (y as f32 + 0.5 - semi_y) / semi_y;
        if nx * nx + ny * ny > 1.0 {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }
}
