//! Display-fit geometry: map bitmap dimensions plus viewport bounds to the
//! largest aspect-preserving size that fits. Pure integer math so the
//! rendering widget gets the same answer every time.

use crate::error::EditError;

/// Compute the display size for a `width` x `height` bitmap inside a
/// viewport of `max_width` x `max_height`.
///
/// Tries the height-limited fit first (`width * max_height / height`); if
/// that overflows the viewport width, falls back to the width-limited fit.
/// Any zero dimension on either side is rejected.
pub fn fit_to_viewport(
    width: u32,
    height: u32,
    max_width: u32,
    max_height: u32,
) -> Result<(u32, u32), EditError> {
    if width == 0 || height == 0 || max_width == 0 || max_height == 0 {
        return Err(EditError::InvalidDimensions);
    }

    // u64 intermediates: 4-gigapixel dimensions would overflow u32 here.
    let scaled_width = (width as u64 * max_height as u64 / height as u64) as u32;
    if scaled_width <= max_width {
        Ok((scaled_width, max_height))
    } else {
        let scaled_height = (height as u64 * max_width as u64 / width as u64) as u32;
        Ok((max_width, scaled_height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_bitmap_in_narrow_viewport() {
        // 1920*800/1080 = 1422 > 1000, so the width-limited fallback applies:
        // 1080*1000/1920 = 562.
        assert_eq!(fit_to_viewport(1920, 1080, 1000, 800).unwrap(), (1000, 562));
    }

    #[test]
    fn tall_bitmap_is_height_limited() {
        // 600*400/1200 = 200 <= 500, height-limited fit wins.
        assert_eq!(fit_to_viewport(600, 1200, 500, 400).unwrap(), (200, 400));
    }

    #[test]
    fn exact_fit_is_unchanged() {
        assert_eq!(fit_to_viewport(500, 400, 500, 400).unwrap(), (500, 400));
    }

    #[test]
    fn square_in_square_fills_the_viewport() {
        assert_eq!(fit_to_viewport(2048, 2048, 256, 256).unwrap(), (256, 256));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(matches!(
            fit_to_viewport(0, 1080, 1000, 800),
            Err(EditError::InvalidDimensions)
        ));
        assert!(matches!(
            fit_to_viewport(1920, 0, 1000, 800),
            Err(EditError::InvalidDimensions)
        ));
        assert!(matches!(
            fit_to_viewport(1920, 1080, 0, 800),
            Err(EditError::InvalidDimensions)
        ));
        assert!(matches!(
            fit_to_viewport(1920, 1080, 1000, 0),
            Err(EditError::InvalidDimensions)
        ));
    }
}
