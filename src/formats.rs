//! Image format utilities and type-safe format handling
//!
//! Output formats for `convert` are a closed enum; detected input formats are
//! probed from file content and mapped to canonical extensions.

use crate::constants::FORMAT_EXTENSIONS;
use crate::error::{ImgProError, Result};
use image::{ImageFormat, ImageReader};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

/// Bytes read from the head of a file for content sniffing.
const PROBE_HEADER_LEN: u64 = 512;

/// Supported output image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JPEG format with lossy compression
    Jpeg,
    /// PNG format with lossless compression
    Png,
    /// WebP format
    WebP,
}

impl OutputFormat {
    /// Returns the file extension for this format, dot included
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => ".jpg",
            OutputFormat::Png => ".png",
            OutputFormat::WebP => ".webp",
        }
    }

    /// Whether the format can store an alpha channel.
    pub fn supports_transparency(&self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }

    /// Whether capture metadata is carried into this format on conversion.
    pub fn carries_exif(&self) -> bool {
        matches!(self, OutputFormat::Jpeg)
    }

    /// Format names accepted on the command line
    pub fn format_names() -> Vec<&'static str> {
        vec!["jpeg", "jpg", "png", "webp"]
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::WebP => "WebP",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for OutputFormat {
    type Err = ImgProError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            _ => Err(ImgProError::InvalidArgument(format!(
                "Unsupported output format: {}. Supported formats: {}",
                s,
                OutputFormat::format_names().join(", ")
            ))),
        }
    }
}

/// Detect the encoded format of a file from its content, ignoring the extension.
///
/// The header must also parse far enough to yield dimensions, so a file that
/// merely starts with a known magic number is still rejected.
pub fn probe_format(path: &Path) -> Result<ImageFormat> {
    let mut header = Vec::new();
    File::open(path)?
        .take(PROBE_HEADER_LEN)
        .read_to_end(&mut header)?;

    let format =
        image::guess_format(&header).map_err(|_| ImgProError::CannotRead(path.to_path_buf()))?;

    let mut reader = ImageReader::new(BufReader::new(File::open(path)?));
    reader.set_format(format);
    reader
        .into_dimensions()
        .map_err(|_| ImgProError::CannotRead(path.to_path_buf()))?;

    Ok(format)
}

/// Upper-case container name for a detected format, e.g. `JPEG` or `WEBP`.
pub fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::Gif => "GIF".to_string(),
        ImageFormat::WebP => "WEBP".to_string(),
        ImageFormat::Tiff => "TIFF".to_string(),
        ImageFormat::Bmp => "BMP".to_string(),
        ImageFormat::Ico => "ICO".to_string(),
        ImageFormat::Pnm => "PPM".to_string(),
        other => format!("{:?}", other).to_uppercase(),
    }
}

/// Preferred lowercase extension for a container name.
///
/// Unknown names fall back to a dot-prefixed lowercase form of the name.
pub fn format_extension(format_name: &str) -> String {
    let upper = format_name.to_uppercase();
    FORMAT_EXTENSIONS
        .iter()
        .find(|(name, _)| *name == upper)
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_else(|| format!(".{}", format_name.to_lowercase()))
}
