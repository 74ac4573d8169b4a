use std::path::PathBuf;
use thiserror::Error;

/// Process exit status for a successful run.
pub const EXIT_SUCCESS: i32 = 0;
/// Unsupported or unreadable format for an operation that needs a specific input kind.
pub const EXIT_UNSUPPORTED_FORMAT: i32 = 1;
/// Bad flag combination, out-of-range value or unsafe path.
pub const EXIT_INVALID_ARGS: i32 = 2;
/// Input file does not exist.
pub const EXIT_FILE_NOT_FOUND: i32 = 3;
/// Decode failure, decompression bomb or vanished intermediate file.
pub const EXIT_READ_ERROR: i32 = 4;

#[derive(Debug, Error)]
pub enum ImgProError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Quality must be between 1-100, got {0}")]
    InvalidQuality(u32),

    #[error("Invalid size format: {0}")]
    InvalidSize(String),

    #[error("Too many sizes: {0}. Maximum allowed: {1}")]
    TooManySizes(usize, usize),

    #[error("Unsafe output path: {0}")]
    UnsafeOutputPath(String),

    #[error("Output directory is a symlink: {0}")]
    SymlinkOutputDir(PathBuf),

    #[error("File too large: {0} bytes. Maximum allowed: {1} bytes")]
    FileTooLarge(u64, u64),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("{0}")]
    UnsupportedFormat(String),

    #[error("Unsupported or unreadable image format: {0}")]
    UnreadableImage(PathBuf),

    #[error("Cannot read image: {0}")]
    CannotRead(PathBuf),

    #[error("Decompression bomb: {pixels} pixels exceeds the limit of {limit}")]
    DecompressionBomb { pixels: u64, limit: u64 },

    #[error("Intermediate file disappeared during chain: {0}")]
    IntermediateFileDisappeared(PathBuf),

    #[error("Failed to convert image: {0}")]
    ConversionFailed(PathBuf),

    #[error("PNG optimization error: {0}")]
    PngOptimization(String),

    #[error("WebP encoding error: {0}")]
    WebPEncoding(String),

    #[error("Metadata embedding error: {0}")]
    Metadata(String),

    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("Report serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl ImgProError {
    /// Maps a failure onto the process exit status reported to the shell.
    pub fn exit_code(&self) -> i32 {
        match self {
            // clap reports 0 for --help/--version and 2 for usage errors
            ImgProError::Cli(e) => e.exit_code(),
            ImgProError::InvalidArgument(_)
            | ImgProError::InvalidQuality(_)
            | ImgProError::InvalidSize(_)
            | ImgProError::TooManySizes(..)
            | ImgProError::UnsafeOutputPath(_)
            | ImgProError::SymlinkOutputDir(_)
            | ImgProError::FileTooLarge(..) => EXIT_INVALID_ARGS,
            ImgProError::FileNotFound(_) => EXIT_FILE_NOT_FOUND,
            ImgProError::UnsupportedFormat(_) | ImgProError::UnreadableImage(_) => {
                EXIT_UNSUPPORTED_FORMAT
            }
            ImgProError::CannotRead(_)
            | ImgProError::DecompressionBomb { .. }
            | ImgProError::IntermediateFileDisappeared(_)
            | ImgProError::ConversionFailed(_)
            | ImgProError::PngOptimization(_)
            | ImgProError::WebPEncoding(_)
            | ImgProError::Metadata(_)
            | ImgProError::Serialization(_)
            | ImgProError::Io(_)
            | ImgProError::Image(_) => EXIT_READ_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, ImgProError>;
