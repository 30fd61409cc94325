//! Image export functionality

use std::path::{Path, PathBuf};

/// Errors that can occur during export
#[derive(Debug)]
pub enum ExportError {
    /// Width or height is zero
    InvalidDimensions { width: u32, height: u32 },
    /// Pixel data does not cover the image
    LengthMismatch { expected: usize, actual: usize },
    /// Failed to encode or write the file
    Save {
        path: PathBuf,
        error: image::ImageError,
    },
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::InvalidDimensions { width, height } => {
                write!(f, "Invalid dimensions: {}x{}", width, height)
            }
            ExportError::LengthMismatch { expected, actual } => write!(
                f,
                "Pixel data length {} doesn't match expected {}",
                actual, expected
            ),
            ExportError::Save { path, error } => {
                write!(f, "Failed to save image '{}': {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Save { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Export raw RGBA pixel data to a PNG file
///
/// # Arguments
/// * `path` - Output file path
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `data` - RGBA u8 pixel data (length must be width * height * 4)
pub fn export_frame<P: AsRef<Path>>(
    path: P,
    width: u32,
    height: u32,
    data: &[u8],
) -> Result<(), ExportError> {
    if width == 0 || height == 0 {
        return Err(ExportError::InvalidDimensions { width, height });
    }

    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(ExportError::LengthMismatch {
            expected,
            actual: data.len(),
        });
    }

    image::save_buffer(
        path.as_ref(),
        data,
        width,
        height,
        image::ExtendedColorType::Rgba8,
    )
    .map_err(|error| ExportError::Save {
        path: path.as_ref().to_path_buf(),
        error,
    })
}
