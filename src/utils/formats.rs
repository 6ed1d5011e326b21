use serde::{Deserialize, Serialize};
use crate::utils::PipelineError;

/// Raster formats accepted on ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    JPEG,
    PNG,
    WebP,
    GIF,
    BMP,
}

impl ImageFormat {
    /// MIME type used as the item's format tag
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::JPEG => "image/jpeg",
            Self::PNG => "image/png",
            Self::WebP => "image/webp",
            Self::GIF => "image/gif",
            Self::BMP => "image/bmp",
        }
    }

    /// Maps the codec crate's sniffed format onto the supported set.
    pub fn from_codec(format: image::ImageFormat) -> Result<Self, PipelineError> {
        match format {
            image::ImageFormat::Jpeg => Ok(Self::JPEG),
            image::ImageFormat::Png => Ok(Self::PNG),
            image::ImageFormat::WebP => Ok(Self::WebP),
            image::ImageFormat::Gif => Ok(Self::GIF),
            image::ImageFormat::Bmp => Ok(Self::BMP),
            other => Err(PipelineError::decode(format!(
                "Unsupported image format: {:?}", other
            ))),
        }
    }
}
