use std::path::Path;

use anyhow::Context;

use crate::{
    assets::RasterImage,
    foundation::error::{SkyplotError, SkyplotResult},
};

/// Stored image formats understood by the `image_format` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpg,
    Ppm,
    /// Recognised so the error can say so, never decodable.
    Pdf,
}

impl ImageFormat {
    pub fn parse(s: &str) -> SkyplotResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "ppm" | "pnm" => Ok(Self::Ppm),
            "pdf" => Ok(Self::Pdf),
            other => Err(SkyplotError::config(format!(
                "unknown image format \"{other}\" (expected png, jpg or ppm)"
            ))),
        }
    }

    fn decoder_format(self) -> SkyplotResult<image::ImageFormat> {
        match self {
            Self::Png => Ok(image::ImageFormat::Png),
            Self::Jpg => Ok(image::ImageFormat::Jpeg),
            Self::Ppm => Ok(image::ImageFormat::Pnm),
            Self::Pdf => Err(SkyplotError::config("PDF format not supported")),
        }
    }
}

/// Loads a stored image into a pixel buffer.
pub trait ImageSource {
    fn decode(&self, path: &Path, format: ImageFormat) -> SkyplotResult<RasterImage>;
}

/// Reads images from the filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileImageSource;

impl ImageSource for FileImageSource {
    #[tracing::instrument(level = "debug", skip(self))]
    fn decode(&self, path: &Path, format: ImageFormat) -> SkyplotResult<RasterImage> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read image '{}'", path.display()))
            .map_err(|e| SkyplotError::load(format!("{e:#}")))?;
        decode_image(&bytes, format)
    }
}

/// Decode encoded image bytes of a known format and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8], format: ImageFormat) -> SkyplotResult<RasterImage> {
    let dyn_img = image::load_from_memory_with_format(bytes, format.decoder_format()?)
        .with_context(|| format!("decode {format:?} image from memory"))
        .map_err(|e| SkyplotError::load(format!("{e:#}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    RasterImage::from_premul(width, height, rgba8_premul)
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
