// Decoded pixel input.
//
// `PixelBuffer` is a borrowed view over a tightly packed RGB8 buffer
// (row-major, three bytes per pixel, no row padding). Decoding image files is
// the caller's job; the CLI does it with the `image` crate and hands the raw
// bytes over. `ColorSample` is one RGB triple pulled out of the buffer by the
// sampler (see `sampler.rs`) and consumed by the note mapper (`mapping.rs`).

use crate::convert::ConvertError;
use serde::{Deserialize, Serialize};

/// One RGB pixel value. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ColorSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorSample {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        ColorSample { r, g, b }
    }

    /// Mean channel value normalised to [0, 1]. Used as the "brightness" of a
    /// sample by the rhythmic sequencing mode.
    pub fn intensity(self) -> f64 {
        (u32::from(self.r) + u32::from(self.g) + u32::from(self.b)) as f64 / (3.0 * 255.0)
    }
}

impl From<[u8; 3]> for ColorSample {
    fn from([r, g, b]: [u8; 3]) -> Self {
        ColorSample { r, g, b }
    }
}

/// Borrowed, validated RGB8 image.
#[derive(Debug, Clone, Copy)]
pub struct PixelBuffer<'a> {
    width: u32,
    height: u32,
    rgb: &'a [u8],
}

impl<'a> PixelBuffer<'a> {
    /// Wrap `rgb`, checking that it holds exactly `width * height` pixels.
    ///
    /// Dimensions whose byte size overflows `usize` are reported as
    /// `BufferSize` with `expected == usize::MAX`.
    pub fn new(width: u32, height: u32, rgb: &'a [u8]) -> Result<Self, ConvertError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(3));
        if expected != Some(rgb.len()) {
            return Err(ConvertError::BufferSize {
                width,
                height,
                expected: expected.unwrap_or(usize::MAX),
                actual: rgb.len(),
            });
        }
        Ok(PixelBuffer { width, height, rgb })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels (`width * height`).
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pixel at row-major flat index `i`. Panics if out of range.
    pub fn at_index(&self, i: usize) -> ColorSample {
        let o = i * 3;
        let px: [u8; 3] = [self.rgb[o], self.rgb[o + 1], self.rgb[o + 2]];
        px.into()
    }

    /// Pixel at `(x, y)`, or `None` outside `[0, width) x [0, height)`.
    ///
    /// Coordinates are signed so that generated points left of or above the
    /// image are rejected here rather than wrapping.
    pub fn get(&self, x: i64, y: i64) -> Option<ColorSample> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some(self.at_index(y as usize * self.width as usize + x as usize))
    }

    /// Summary of the image as seen by a raster scan with the given step.
    pub fn info(&self, scan_step: u32) -> ImageInfo {
        let step = scan_step.max(1);
        ImageInfo {
            width: self.width,
            height: self.height,
            total_pixels: self.len(),
            scan_step: step,
            sampled_pixels: (self.width / step) as usize * (self.height / step) as usize,
        }
    }
}

/// Image dimensions plus how many pixels a `scan` at `scan_step` covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub total_pixels: usize,
    pub scan_step: u32,
    pub sampled_pixels: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer_length() {
        let data = [0u8; 5];
        let err = PixelBuffer::new(2, 1, &data).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::BufferSize {
                expected: 6,
                actual: 5,
                ..
            }
        ));
    }

    #[test]
    fn overflowing_dimensions_are_an_error() {
        let err = PixelBuffer::new(u32::MAX, u32::MAX, &[]).unwrap_err();
        assert_eq!(
            err,
            ConvertError::BufferSize {
                width: u32::MAX,
                height: u32::MAX,
                expected: usize::MAX,
                actual: 0,
            }
        );
    }

    #[test]
    fn get_reads_row_major() {
        // 2x2: red, green / blue, white
        let data = [255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let buf = PixelBuffer::new(2, 2, &data).unwrap();
        assert_eq!(buf.get(1, 0), Some(ColorSample::new(0, 255, 0)));
        assert_eq!(buf.get(0, 1), Some(ColorSample::new(0, 0, 255)));
        assert_eq!(buf.get(2, 0), None);
        assert_eq!(buf.get(-1, 0), None);
        assert_eq!(buf.get(0, 2), None);
    }

    #[test]
    fn empty_buffer_is_valid() {
        let buf = PixelBuffer::new(0, 10, &[]).unwrap();
        assert!(buf.is_empty());
        assert_eq!(buf.get(0, 0), None);
    }

    #[test]
    fn info_counts_scanned_pixels() {
        let data = vec![0u8; 5 * 4 * 3];
        let buf = PixelBuffer::new(5, 4, &data).unwrap();
        let info = buf.info(2);
        assert_eq!(info.total_pixels, 20);
        assert_eq!(info.sampled_pixels, 2 * 2);
        assert_eq!(buf.info(0).scan_step, 1);
    }

    #[test]
    fn intensity_spans_unit_range() {
        assert_eq!(ColorSample::new(0, 0, 0).intensity(), 0.0);
        assert_eq!(ColorSample::new(255, 255, 255).intensity(), 1.0);
    }
}
