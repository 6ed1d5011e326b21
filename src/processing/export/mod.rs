//! Re-encoding and packaging of processed images.
//!
//! - [`codec`]: decode sources to RGBA, encode lossless PNG.
//! - [`archive`]: zip bundling.
//! - [`ExportPackager`]: file naming and the single / batch export operations.

mod archive;
mod codec;
mod packager;

pub use archive::{ArchivePacker, ZipPacker};
pub use codec::{DecodedImage, ImageDecoder, ImageEncoder, RasterCodec};
pub use packager::{ExportArtifact, ExportPackager, ExportedImage};
