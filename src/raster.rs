use crate::error::{Error, Result};
use image::{imageops, RgbaImage};
use rgb::ComponentBytes;
use std::borrow::Cow;

#[allow(clippy::upper_case_acronyms)]
pub type RGBA = rgb::RGBA8;

/// Largest dimension of the raster handed to the palette builder. Bounds
/// quantization cost regardless of texture resolution.
pub const SAMPLE_SIZE: u32 = 128;

/// Decoded RGBA image, row-major. Immutable once constructed.
#[derive(Clone, Debug)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<RGBA>,
}

impl Raster {
    pub fn new(width: u32, height: u32, pixels: Vec<RGBA>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Raster(format!(
                "raster dimensions {width}x{height} are empty"
            )));
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(Error::Raster(format!(
                "raster has {} pixels, expected {expected}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decodes compressed image bytes (PNG, JPEG, BMP or GIF).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?;
        Self::from_image(img.into_rgba8())
    }

    fn from_image(img: RgbaImage) -> Result<Self> {
        let (width, height) = img.dimensions();
        let pixels = img
            .into_raw()
            .chunks_exact(4)
            .map(|c| RGBA::new(c[0], c[1], c[2], c[3]))
            .collect();
        Self::new(width, height, pixels)
    }

    pub fn to_image(&self) -> RgbaImage {
        // infallible, the pixel count invariant holds by construction
        RgbaImage::from_raw(self.width, self.height, self.pixels.as_bytes().to_vec()).unwrap()
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }
    #[inline]
    pub fn pixels(&self) -> &[RGBA] {
        &self.pixels
    }

    /// Bilinear resample to the target dimensions.
    pub fn resized(&self, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Raster(format!(
                "resample target {width}x{height} is empty"
            )));
        }
        if (width, height) == (self.width, self.height) {
            return Ok(self.clone());
        }
        let img = imageops::resize(
            &self.to_image(),
            width,
            height,
            imageops::FilterType::Triangle,
        );
        Self::from_image(img)
    }

    /// Bounded-size raster for palette construction. Inputs already within
    /// the cap are returned as-is. Nearest-neighbor keeps the sample's
    /// colors a subset of the input's.
    pub fn sample_for_palette(&self) -> Cow<'_, Self> {
        if self.width <= SAMPLE_SIZE && self.height <= SAMPLE_SIZE {
            return Cow::Borrowed(self);
        }
        let img = imageops::resize(
            &self.to_image(),
            self.width.min(SAMPLE_SIZE),
            self.height.min(SAMPLE_SIZE),
            imageops::FilterType::Nearest,
        );
        // the cap is never zero so this cannot fail
        Cow::Owned(Self::from_image(img).unwrap())
    }
}
