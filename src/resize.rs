use crate::constants::MAX_IMAGE_PIXELS;
use crate::error::Result;
use crate::processing::{decode_image, save_stripped_jpeg};
use crate::utils::file_size_kb;
use image::imageops::FilterType;
use image::GenericImageView;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Axis the requested sizes apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Width,
    Height,
}

#[derive(Debug, Clone)]
pub struct ResizeSpec {
    pub sizes: Vec<u32>,
    pub dimension: Dimension,
    pub quality: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub size_kb: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSize {
    pub size: u32,
    pub reason: String,
}

/// Every requested size ends up in exactly one of the two lists.
#[derive(Debug, Clone, Default)]
pub struct ResizeResult {
    pub created: Vec<CreatedImage>,
    pub skipped: Vec<SkippedSize>,
}

impl ResizeResult {
    pub fn created_paths(&self) -> Vec<PathBuf> {
        self.created.iter().map(|c| c.path.clone()).collect()
    }
}

/// Target dimensions for one requested size, or `None` when it would upscale.
///
/// The companion axis is scaled by `size / original` and truncated.
pub fn calculate_target_dimensions(
    width: u32,
    height: u32,
    size: u32,
    dimension: Dimension,
) -> Option<(u32, u32)> {
    let (along, across) = match dimension {
        Dimension::Width => (width, height),
        Dimension::Height => (height, width),
    };
    if size > along || along == 0 {
        return None;
    }

    let companion = (u64::from(across) * u64::from(size) / u64::from(along)).max(1) as u32;
    Some(match dimension {
        Dimension::Width => (size, companion),
        Dimension::Height => (companion, size),
    })
}

/// Human reason for skipping a size larger than the source.
pub fn skip_reason(width: u32, height: u32, dimension: Dimension) -> String {
    match dimension {
        Dimension::Width => format!("original is only {}px wide", width),
        Dimension::Height => format!("original is only {}px tall", height),
    }
}

/// `photo.jpg` at 300 -> `photo_300.jpg`
pub fn resized_file_name(input: &Path, size: u32) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match input.extension() {
        Some(ext) => format!("{}_{}.{}", stem, size, ext.to_string_lossy()),
        None => format!("{}_{}", stem, size),
    }
}

/// Write one downscaled, metadata-free JPEG per requested size into
/// `output_dir`, skipping every size that would upscale.
pub fn resize_image(input: &Path, output_dir: &Path, spec: &ResizeSpec) -> Result<ResizeResult> {
    let decoded = decode_image(input, MAX_IMAGE_PIXELS)?;
    let (width, height) = decoded.image.dimensions();
    debug!("Resizing {} ({}x{})", input.display(), width, height);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut result = ResizeResult::default();
    for &size in &spec.sizes {
        let Some((target_w, target_h)) =
            calculate_target_dimensions(width, height, size, spec.dimension)
        else {
            result.skipped.push(SkippedSize {
                size,
                reason: skip_reason(width, height, spec.dimension),
            });
            continue;
        };

        spinner.set_message(format!("Resizing to {}x{}", target_w, target_h));
        let resized = decoded
            .image
            .resize_exact(target_w, target_h, FilterType::Lanczos3);
        let output = output_dir.join(resized_file_name(input, size));
        save_stripped_jpeg(&resized, &output, spec.quality)?;

        result.created.push(CreatedImage {
            size_kb: file_size_kb(&output)?,
            path: output,
            width: target_w,
            height: target_h,
        });
    }
    spinner.finish_and_clear();

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{write_full_exif_jpeg, write_jpeg};
    use tempfile::TempDir;

    #[test]
    fn test_companion_dimension_is_truncated() {
        assert_eq!(
            calculate_target_dimensions(1200, 800, 300, Dimension::Width),
            Some((300, 200))
        );
        assert_eq!(
            calculate_target_dimensions(1600, 900, 800, Dimension::Width),
            Some((800, 450))
        );
        // 100 * 333 / 1000 = 33.3
        assert_eq!(
            calculate_target_dimensions(1000, 333, 100, Dimension::Width),
            Some((100, 33))
        );
        assert_eq!(
            calculate_target_dimensions(800, 1200, 600, Dimension::Height),
            Some((400, 600))
        );
    }

    #[test]
    fn test_equal_size_is_kept_larger_is_skipped() {
        assert_eq!(
            calculate_target_dimensions(1200, 800, 1200, Dimension::Width),
            Some((1200, 800))
        );
        assert_eq!(calculate_target_dimensions(1200, 800, 1201, Dimension::Width), None);
        assert_eq!(calculate_target_dimensions(1200, 800, 801, Dimension::Height), None);
    }

    #[test]
    fn test_companion_never_collapses_to_zero() {
        assert_eq!(
            calculate_target_dimensions(4000, 10, 1, Dimension::Width),
            Some((1, 1))
        );
    }

    #[test]
    fn test_resized_file_name_keeps_extension_case() {
        assert_eq!(resized_file_name(Path::new("/a/photo.jpg"), 300), "photo_300.jpg");
        assert_eq!(resized_file_name(Path::new("IMG.JPEG"), 50), "IMG_50.JPEG");
    }

    #[test]
    fn test_resize_partitions_created_and_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_jpeg(temp_dir.path(), "sample.jpg", 400, 300);
        let output_dir = temp_dir.path().join("resized");
        std::fs::create_dir(&output_dir).unwrap();

        let spec = ResizeSpec {
            sizes: vec![100, 400, 500],
            dimension: Dimension::Width,
            quality: 90,
        };
        let result = resize_image(&input, &output_dir, &spec).unwrap();

        assert_eq!(result.created.len(), 2);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].size, 500);
        assert_eq!(result.skipped[0].reason, "original is only 400px wide");

        let first = &result.created[0];
        assert_eq!((first.width, first.height), (100, 75));
        assert_eq!(first.path, output_dir.join("sample_100.jpg"));
        let reloaded = image::open(&first.path).unwrap();
        assert_eq!(reloaded.dimensions(), (100, 75));
    }

    #[test]
    fn test_resize_all_skipped_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_jpeg(temp_dir.path(), "tiny.jpg", 50, 50);

        let spec = ResizeSpec {
            sizes: vec![100, 200],
            dimension: Dimension::Height,
            quality: 90,
        };
        let result = resize_image(&input, temp_dir.path(), &spec).unwrap();
        assert!(result.created.is_empty());
        assert_eq!(result.skipped[1].reason, "original is only 50px tall");
    }

    #[test]
    fn test_resize_strips_exif() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_full_exif_jpeg(temp_dir.path(), "with_exif.jpg");

        let spec = ResizeSpec {
            sizes: vec![200],
            dimension: Dimension::Width,
            quality: 90,
        };
        let result = resize_image(&input, temp_dir.path(), &spec).unwrap();
        assert!(crate::info::extract_exif(&result.created[0].path).is_none());
    }
}
