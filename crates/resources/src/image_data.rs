//! Decoded RGBA8 images.

use std::path::Path;

use tracing::info;
use viewer_rhi::texture::TexturePixels;

use crate::error::{ResourceError, ResourceResult};

/// Tightly packed RGBA8 pixels, rows top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Loads any supported format from disk and converts it to RGBA8.
    pub fn load(path: &Path) -> ResourceResult<Self> {
        let image = image::open(path).map_err(|source| ResourceError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        let data = Self::from_rgba(image.into_rgba8());

        info!(
            "Loaded {}: {}x{} ({} bytes)",
            path.display(),
            data.width,
            data.height,
            data.pixels.len()
        );

        Ok(data)
    }

    /// Decodes an in-memory encoded image. `path` is used for errors.
    pub fn decode(bytes: &[u8], path: &Path) -> ResourceResult<Self> {
        let image = image::load_from_memory(bytes).map_err(|source| ResourceError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_rgba(image.into_rgba8()))
    }

    fn from_rgba(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }

    /// Borrows the pixels for GPU upload.
    pub fn as_texture_pixels(&self, name: &'static str) -> TexturePixels<'_> {
        TexturePixels {
            name,
            width: self.width,
            height: self.height,
            pixels: &self.pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb, RgbImage};

    use super::*;

    #[test]
    fn test_decode_expands_rgb_to_rgba() {
        let source = RgbImage::from_pixel(4, 2, Rgb([10, 20, 30]));
        let mut encoded = Cursor::new(Vec::new());
        source.write_to(&mut encoded, ImageFormat::Png).unwrap();

        let data = ImageData::decode(encoded.get_ref(), Path::new("mem.png")).unwrap();

        assert_eq!((data.width, data.height), (4, 2));
        assert_eq!(data.pixels.len(), 4 * 2 * 4);
        assert_eq!(&data.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = ImageData::decode(b"not an image", Path::new("bad.png")).unwrap_err();
        assert!(matches!(err, ResourceError::Image { .. }));
    }
}
