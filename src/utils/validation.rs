use crate::utils::{BridgeError, BridgeResult};

/// Bytes per RGBA pixel
pub const CHANNELS: usize = 4;

/// Returns `width * height * 4`, or `None` if it overflows `usize`.
pub fn expected_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(CHANNELS))
}

/// Validates that a pixel buffer matches its declared dimensions
pub fn validate_shape(buffer: &[u8], width: u32, height: u32) -> BridgeResult<()> {
    match expected_len(width, height) {
        Some(expected) if expected == buffer.len() => Ok(()),
        expected => Err(BridgeError::ShapeMismatch {
            width,
            height,
            expected: expected.unwrap_or(usize::MAX),
            actual: buffer.len(),
        }),
    }
}

/// Byte offset of pixel `(x, y)` in a row-major RGBA buffer, if inside the frame
pub fn pixel_offset(width: u32, height: u32, x: u32, y: u32) -> Option<usize> {
    if x >= width || y >= height {
        return None;
    }
    Some((y as usize * width as usize + x as usize) * CHANNELS)
}
