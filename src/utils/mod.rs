pub mod error;
pub mod validation;
pub mod formats;
pub mod fs;
pub mod naming;

pub use error::{BridgeError, BridgeResult, PipelineError, PipelineResult};
pub use validation::{expected_len, pixel_offset, validate_shape, CHANNELS};
pub use formats::ImageFormat;
pub use fs::{extract_filename, read_source, write_artifact, SourceFile};
pub use naming::{file_stem, sanitize_stem, UniqueNames};
