use anyhow::{anyhow, Result};
use nowplaying_core::{ArtworkEncoder, Bitmap, SourceIcon};
use std::io::Cursor;
use tracing::{debug, warn};

/// Encodes RGBA bitmaps as PNG
#[derive(Clone, Copy, Debug, Default)]
pub struct PngArtworkEncoder;

impl PngArtworkEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl ArtworkEncoder for PngArtworkEncoder {
    fn encode_bitmap(&self, bitmap: &Bitmap) -> Option<Vec<u8>> {
        match encode_png(bitmap) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Failed to encode artwork: {}", e);
                None
            }
        }
    }

    fn encode_icon(&self, icon: &SourceIcon) -> Option<Vec<u8>> {
        match icon {
            SourceIcon::Bitmap(bitmap) => self.encode_bitmap(bitmap),
            SourceIcon::Vector(_) => {
                debug!("Vector icons are not rasterised");
                None
            }
        }
    }
}

fn encode_png(bitmap: &Bitmap) -> Result<Vec<u8>> {
    let image = image::RgbaImage::from_raw(bitmap.width, bitmap.height, bitmap.rgba.clone())
        .ok_or_else(|| {
            anyhow!(
                "bitmap buffer of {} bytes does not fit {}x{}",
                bitmap.rgba.len(),
                bitmap.width,
                bitmap.height
            )
        })?;

    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}
