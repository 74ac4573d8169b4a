//! Shared codec plumbing: capped decoding, alpha flattening, encoding and
//! splicing metadata segments into encoded bytes.

use crate::constants::{
    DECODE_BYTES_PER_PIXEL, LIBDEFLATER_HIGH_LEVEL, LIBDEFLATER_LOW_LEVEL, OXIPNG_PRESET,
    ZOPFLI_ITERATIONS,
};
use crate::error::{ImgProError, Result};
use crate::formats::OutputFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::error::ImageError;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, Limits, Rgb, RgbImage};
use img_parts::{Bytes, DynImage, ImageEXIF, ImageICC};
use log::debug;
use oxipng::{Deflaters, Options};
use std::fs;
use std::num::NonZeroU8;
use std::path::Path;

/// A decoded raster together with what the container said about it.
#[derive(Debug)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub format: ImageFormat,
    pub icc_profile: Option<Vec<u8>>,
}

/// Decode an image by content, refusing anything above `max_pixels`.
///
/// The pixel count is checked from the header before any pixel buffer is
/// allocated, and the decoder then runs under an allocation limit.
pub fn decode_image(path: &Path, max_pixels: u64) -> Result<DecodedImage> {
    let (width, height) = ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()
        .map_err(|e| classify_decode_error(e, path, max_pixels))?;
    let pixels = u64::from(width) * u64::from(height);
    if pixels > max_pixels {
        return Err(ImgProError::DecompressionBomb {
            pixels,
            limit: max_pixels,
        });
    }

    let mut reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| ImgProError::CannotRead(path.to_path_buf()))?;

    let mut limits = Limits::default();
    limits.max_alloc = Some(max_pixels.saturating_mul(DECODE_BYTES_PER_PIXEL));
    reader.limits(limits);

    let mut decoder = reader
        .into_decoder()
        .map_err(|e| classify_decode_error(e, path, max_pixels))?;

    let icc_profile = match decoder.icc_profile() {
        Ok(profile) => profile,
        Err(e) => {
            debug!("Ignoring unreadable ICC profile in {}: {}", path.display(), e);
            None
        }
    };

    let image = DynamicImage::from_decoder(decoder)
        .map_err(|e| classify_decode_error(e, path, max_pixels))?;

    Ok(DecodedImage {
        image,
        format,
        icc_profile,
    })
}

fn classify_decode_error(err: ImageError, path: &Path, max_pixels: u64) -> ImgProError {
    match err {
        ImageError::Limits(_) => ImgProError::DecompressionBomb {
            pixels: 0,
            limit: max_pixels,
        },
        ImageError::IoError(e) => ImgProError::Io(e),
        other => {
            debug!("Decode failed for {}: {}", path.display(), other);
            ImgProError::CannotRead(path.to_path_buf())
        }
    }
}

/// Composite onto an opaque white background and drop to three channels.
///
/// Grayscale and palette inputs are widened; inputs without alpha are simply
/// converted.
pub fn flatten_to_rgb(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut flattened = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in flattened.pixels_mut().zip(rgba.pixels()) {
        let alpha = u32::from(src[3]);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        *dst = Rgb([blend(src[0]), blend(src[1]), blend(src[2])]);
    }
    flattened
}

/// Bring a raster into a pixel layout every output encoder accepts.
pub fn normalize_for_output(img: DynamicImage, format: OutputFormat) -> DynamicImage {
    if !format.supports_transparency() {
        return DynamicImage::ImageRgb8(flatten_to_rgb(&img));
    }
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Encode a raster into memory in the given output format.
pub fn encode_image(img: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            img.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, quality))?;
        }
        OutputFormat::Png => {
            img.write_with_encoder(PngEncoder::new(&mut buffer))?;
            buffer = optimize_png(&buffer, quality)?;
        }
        OutputFormat::WebP => {
            let encoder = webp::Encoder::from_image(img)
                .map_err(|reason| ImgProError::WebPEncoding(reason.to_string()))?;
            buffer = encoder.encode(f32::from(quality)).to_vec();
        }
    }
    Ok(buffer)
}

fn optimize_png(data: &[u8], quality: u8) -> Result<Vec<u8>> {
    let mut options = Options::from_preset(OXIPNG_PRESET);

    // Deflater effort follows the requested quality
    options.deflate = if quality >= 90 {
        NonZeroU8::new(ZOPFLI_ITERATIONS)
            .map(|iterations| Deflaters::Zopfli { iterations })
            .unwrap_or(Deflaters::Libdeflater {
                compression: LIBDEFLATER_HIGH_LEVEL,
            })
    } else if quality >= 70 {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_HIGH_LEVEL,
        }
    } else {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_LOW_LEVEL,
        }
    };

    oxipng::optimize_from_memory(data, &options)
        .map_err(|e| ImgProError::PngOptimization(e.to_string()))
}

/// Splice an ICC profile and/or a TIFF-structured EXIF block into encoded bytes.
///
/// Containers the splicer does not understand are returned unchanged.
pub fn embed_metadata(
    encoded: Vec<u8>,
    icc_profile: Option<Vec<u8>>,
    exif: Option<Vec<u8>>,
) -> Result<Vec<u8>> {
    if icc_profile.is_none() && exif.is_none() {
        return Ok(encoded);
    }

    let bytes = Bytes::from(encoded);
    let mut container = match DynImage::from_bytes(bytes.clone())
        .map_err(|e| ImgProError::Metadata(e.to_string()))?
    {
        Some(container) => container,
        None => return Ok(bytes.to_vec()),
    };

    if let Some(profile) = icc_profile {
        container.set_icc_profile(Some(Bytes::from(profile)));
    }
    if let Some(exif) = exif {
        container.set_exif(Some(Bytes::from(exif)));
    }

    let mut output = Vec::new();
    container.encoder().write_to(&mut output)?;
    Ok(output)
}

/// Flatten, encode as JPEG and write, with no metadata carried over.
pub fn save_stripped_jpeg(img: &DynamicImage, output: &Path, quality: u8) -> Result<()> {
    let flattened = DynamicImage::ImageRgb8(flatten_to_rgb(img));
    let encoded = encode_image(&flattened, OutputFormat::Jpeg, quality)?;
    fs::write(output, encoded)?;
    Ok(())
}
