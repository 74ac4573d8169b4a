use crate::constants::{DEFAULT_CONVERT_QUALITY, MAX_IMAGE_PIXELS};
use crate::error::ImgProError;
use crate::formats::OutputFormat;
use crate::processing::{decode_image, embed_metadata, encode_image, normalize_for_output};
use crate::validation::path_has_symlink;
use exif::experimental::Writer;
use exif::{Context, Field, In, Reader, Tag, Value};
use image::DynamicImage;
use lcms2::{Intent, PixelFormat, Profile, Transform};
use log::{debug, error, warn};
use std::fs::{self, File};
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ConvertSpec {
    pub format: OutputFormat,
    pub quality: u8,
    pub strip_exif: bool,
    pub normalize_color: bool,
    /// Decoded pixel ceiling.
    pub max_pixels: u64,
}

impl ConvertSpec {
    pub fn new(format: OutputFormat, quality: u8) -> Self {
        Self {
            format,
            quality,
            strip_exif: false,
            normalize_color: true,
            max_pixels: MAX_IMAGE_PIXELS,
        }
    }
}

impl Default for ConvertSpec {
    fn default() -> Self {
        // Quality default is within 1..=100
        Self::new(OutputFormat::Jpeg, DEFAULT_CONVERT_QUALITY as u8)
    }
}

/// Why a conversion produced no output.
#[derive(Debug, Error)]
pub enum ConvertFailure {
    #[error("cannot decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("decompression bomb rejected: {pixels} pixels exceeds the limit of {limit}")]
    DecompressionBomb { pixels: u64, limit: u64 },

    #[error("refusing to write through a symlink: {0}")]
    SymlinkBlocked(PathBuf),

    #[error("cannot encode {format}: {reason}")]
    Encode { format: OutputFormat, reason: String },

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the best-effort color normalization step.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("embedded ICC profile is invalid: {0}")]
    InvalidProfile(#[source] lcms2::Error),

    #[error("cannot build a transform to sRGB: {0}")]
    Transform(#[source] lcms2::Error),
}

/// Convert `input` into `output`, reporting success as a boolean.
///
/// Every failure category is logged under its own message.
pub fn convert_image(input: &Path, output: &Path, spec: &ConvertSpec) -> bool {
    match try_convert_image(input, output, spec) {
        Ok(()) => true,
        Err(failure @ ConvertFailure::DecompressionBomb { .. }) => {
            error!("Image rejected as a decompression bomb: {}", failure);
            false
        }
        Err(failure @ ConvertFailure::SymlinkBlocked(_)) => {
            error!("Symlink blocked: {}", failure);
            false
        }
        Err(failure) => {
            error!("Conversion of {} failed: {}", input.display(), failure);
            false
        }
    }
}

pub fn try_convert_image(
    input: &Path,
    output: &Path,
    spec: &ConvertSpec,
) -> Result<(), ConvertFailure> {
    if path_has_symlink(output) {
        return Err(ConvertFailure::SymlinkBlocked(output.to_path_buf()));
    }

    let decoded = decode_image(input, spec.max_pixels).map_err(|e| match e {
        ImgProError::DecompressionBomb { pixels, limit } => {
            ConvertFailure::DecompressionBomb { pixels, limit }
        }
        ImgProError::Io(io) => ConvertFailure::Io(io),
        other => ConvertFailure::Decode {
            path: input.to_path_buf(),
            reason: other.to_string(),
        },
    })?;

    let exif = if spec.strip_exif || !spec.format.carries_exif() {
        None
    } else {
        carried_exif(input)
    };

    let mut image = decoded.image;
    let mut icc_profile = None;
    if spec.normalize_color {
        if let Some(profile) = decoded.icc_profile.as_deref() {
            match convert_to_srgb(&image, profile) {
                Ok(normalized) => image = normalized,
                Err(e) => debug!("Keeping original pixels of {}: {}", input.display(), e),
            }
        }
        icc_profile = srgb_profile_bytes();
    }

    let image = normalize_for_output(image, spec.format);
    let encode_failure = |reason: String| ConvertFailure::Encode {
        format: spec.format,
        reason,
    };
    let encoded = encode_image(&image, spec.format, spec.quality)
        .map_err(|e| encode_failure(e.to_string()))?;
    let encoded =
        embed_metadata(encoded, icc_profile, exif).map_err(|e| encode_failure(e.to_string()))?;

    fs::write(output, encoded)?;
    Ok(())
}

/// Transform pixels from an embedded ICC profile into sRGB, keeping alpha.
pub fn convert_to_srgb(image: &DynamicImage, icc: &[u8]) -> Result<DynamicImage, ProfileError> {
    let source = Profile::new_icc(icc).map_err(ProfileError::InvalidProfile)?;
    let srgb = Profile::new_srgb();
    let transform: Transform<[u8; 3], [u8; 3]> = Transform::new(
        &source,
        PixelFormat::RGB_8,
        &srgb,
        PixelFormat::RGB_8,
        Intent::Perceptual,
    )
    .map_err(ProfileError::Transform)?;

    if image.color().has_alpha() {
        let mut rgba = image.to_rgba8();
        let mut colors: Vec<[u8; 3]> = rgba.pixels().map(|p| [p[0], p[1], p[2]]).collect();
        transform.transform_in_place(&mut colors);
        for (pixel, color) in rgba.pixels_mut().zip(colors) {
            pixel.0[..3].copy_from_slice(&color);
        }
        Ok(DynamicImage::ImageRgba8(rgba))
    } else {
        let mut rgb = image.to_rgb8();
        let mut colors: Vec<[u8; 3]> = rgb.pixels().map(|p| p.0).collect();
        transform.transform_in_place(&mut colors);
        for (pixel, color) in rgb.pixels_mut().zip(colors) {
            pixel.0 = color;
        }
        Ok(DynamicImage::ImageRgb8(rgb))
    }
}

fn srgb_profile_bytes() -> Option<Vec<u8>> {
    match Profile::new_srgb().icc() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!("Could not serialize the sRGB profile: {}", e);
            None
        }
    }
}

/// Source EXIF re-serialized without the GPS block, or `None` when the
/// source has none.
fn carried_exif(input: &Path) -> Option<Vec<u8>> {
    let file = File::open(input).ok()?;
    let exif = Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .ok()?;

    let kept = without_gps(exif.fields());
    if kept.is_empty() {
        return None;
    }

    match serialize_exif(&kept) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!("Dropping EXIF of {}: {}", input.display(), e);
            None
        }
    }
}

/// Primary-image fields minus the GPS sub-IFD and the IFD pointers the
/// writer regenerates itself.
pub fn without_gps<'a>(fields: impl Iterator<Item = &'a Field>) -> Vec<&'a Field> {
    fields
        .filter(|f| f.ifd_num == In::PRIMARY)
        .filter(|f| f.tag.context() != Context::Gps)
        .filter(|f| {
            !matches!(
                f.tag,
                Tag::ExifIFDPointer | Tag::GPSInfoIFDPointer | Tag::InteropIFDPointer
            )
        })
        .filter(|f| !matches!(f.value, Value::Unknown(..)))
        .collect()
}

fn serialize_exif(fields: &[&Field]) -> Result<Vec<u8>, exif::Error> {
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut buffer = Cursor::new(Vec::new());
    writer.write(&mut buffer, false)?;
    Ok(buffer.into_inner())
}
