//! Decoding sources into RGBA buffers and re-encoding them losslessly.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder as _};
use tracing::debug;

use crate::utils::{validate_shape, ImageFormat, PipelineError, PipelineResult};

/// A decoded source image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major
    pub pixels: Vec<u8>,
    pub format: ImageFormat,
}

pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> PipelineResult<DecodedImage>;
}

pub trait ImageEncoder: Send + Sync {
    /// Encodes RGBA8 pixels into a lossless container.
    fn encode(&self, pixels: &[u8], width: u32, height: u32) -> PipelineResult<Vec<u8>>;

    /// Extension of the produced container, without the dot.
    fn extension(&self) -> &'static str;
}

/// Decodes any supported raster format, encodes PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterCodec;

impl ImageDecoder for RasterCodec {
    fn decode(&self, bytes: &[u8]) -> PipelineResult<DecodedImage> {
        let codec_format = image::guess_format(bytes)
            .map_err(|e| PipelineError::decode(format!("Unrecognised image data: {}", e)))?;
        let format = ImageFormat::from_codec(codec_format)?;

        let image = image::load_from_memory_with_format(bytes, codec_format)
            .map_err(|e| PipelineError::decode(format!("Failed to decode {:?}: {}", format, e)))?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        debug!("Decoded {}: {}×{}", format.mime_type(), width, height);

        Ok(DecodedImage {
            width,
            height,
            pixels: rgba.into_raw(),
            format,
        })
    }
}

impl ImageEncoder for RasterCodec {
    fn encode(&self, pixels: &[u8], width: u32, height: u32) -> PipelineResult<Vec<u8>> {
        validate_shape(pixels, width, height)?;

        let mut buf: Vec<u8> = Vec::new();
        PngEncoder::new(&mut buf)
            .write_image(pixels, width, height, ExtendedColorType::Rgba8)
            .map_err(|e| PipelineError::encode(format!("PNG encode error: {}", e)))?;
        Ok(buf)
    }

    fn extension(&self) -> &'static str {
        "png"
    }
}
