//! Image buffer wrapper for captured pixels
//!
//! This module provides an `ImageBuffer` wrapper around `image::DynamicImage`
//! with the handful of operations the capture path needs: building an image
//! from raw BGRA rows, cropping, and generating synthetic test patterns.
//!
//! # Examples
//!
//! ```
//! use pwsh_mcp::{automation::ImageBuffer, model::CaptureRegion};
//!
//! let img = ImageBuffer::from_test_pattern(1920, 1080);
//!
//! let region = CaptureRegion { x: 100, y: 100, width: 800, height: 400 };
//! let cropped = img.crop(&region).unwrap();
//! assert_eq!(cropped.dimensions(), (800, 400));
//! ```

use image::GenericImageView;

use crate::{
    error::{AutomationError, AutomationResult},
    model::CaptureRegion,
};

/// Wrapper around `image::DynamicImage`
///
/// All transformation methods return new `ImageBuffer` instances, leaving
/// the original unchanged.
#[derive(Clone, Debug)]
pub struct ImageBuffer {
    inner: image::DynamicImage,
}

impl ImageBuffer {
    /// Creates a new ImageBuffer from a DynamicImage
    pub fn new(image: image::DynamicImage) -> Self {
        Self { inner: image }
    }

    /// Builds an opaque RGBA image from top-down BGRA pixel rows
    ///
    /// This is the layout GDI returns for 32-bit `BI_RGB` bitmaps. The alpha
    /// channel in that layout is undefined, so every pixel is made opaque.
    ///
    /// # Examples
    ///
    /// ```
    /// use pwsh_mcp::automation::ImageBuffer;
    ///
    /// // One blue pixel in BGRA order
    /// let img = ImageBuffer::from_bgra(1, 1, vec![255, 0, 0, 0]).unwrap();
    /// assert_eq!(img.to_rgba8().get_pixel(0, 0).0, [0, 0, 255, 255]);
    /// ```
    pub fn from_bgra(width: u32, height: u32, mut bgra: Vec<u8>) -> AutomationResult<Self> {
        let expected = width as usize * height as usize * 4;
        if bgra.len() != expected {
            return Err(AutomationError::capture(format!(
                "Pixel buffer has {} bytes, expected {} for {}x{}",
                bgra.len(),
                expected,
                width,
                height
            )));
        }

        for px in bgra.chunks_exact_mut(4) {
            px.swap(0, 2);
            px[3] = 255;
        }

        let rgba = image::RgbaImage::from_raw(width, height, bgra)
            .ok_or_else(|| AutomationError::capture("Failed to create image from frame"))?;

        Ok(Self::new(image::DynamicImage::ImageRgba8(rgba)))
    }

    /// Crops the image to the specified region
    ///
    /// The region must be non-empty and within the image bounds, otherwise a
    /// capture error is returned.
    pub fn crop(&self, region: &CaptureRegion) -> AutomationResult<Self> {
        let (img_width, img_height) = self.dimensions();

        if region.width == 0 || region.height == 0 {
            return Err(AutomationError::capture("Crop region must not be empty"));
        }

        if region.x as u64 + region.width as u64 > img_width as u64
            || region.y as u64 + region.height as u64 > img_height as u64
        {
            return Err(AutomationError::capture(format!(
                "Region ({}x{} at {},{}) extends beyond image bounds ({}x{})",
                region.width, region.height, region.x, region.y, img_width, img_height
            )));
        }

        let cropped = self
            .inner
            .crop_imm(region.x, region.y, region.width, region.height);

        Ok(Self::new(cropped))
    }

    /// Returns the dimensions of the image as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    /// Returns the image width in pixels
    pub fn width(&self) -> u32 {
        self.dimensions().0
    }

    /// Returns the image height in pixels
    pub fn height(&self) -> u32 {
        self.dimensions().1
    }

    /// Converts the image to RGBA8 format
    pub fn to_rgba8(&self) -> image::RgbaImage {
        self.inner.to_rgba8()
    }

    /// Creates a test pattern image with the specified dimensions
    ///
    /// The pattern encodes each pixel's coordinates in its red and green
    /// channels (modulo 256), which lets tests check that a crop came from
    /// the right place.
    pub fn from_test_pattern(width: u32, height: u32) -> Self {
        let img = image::RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, 0x80, 255])
        });

        Self::new(image::DynamicImage::ImageRgba8(img))
    }
}
