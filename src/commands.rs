//! Per-step command handlers. Each validates its input, performs one
//! operation and reports the files it produced for the next chain step.

use crate::chain::{ChainStep, StepOutput};
use crate::cli::{Args, Commands};
use crate::constants::JPEG_EXTENSIONS;
use crate::convert::{convert_image, ConvertSpec};
use crate::error::{ImgProError, Result};
use crate::formats::{probe_format, OutputFormat};
use crate::info::{get_image_info, render_csv, render_json, render_text, ExifDisplay};
use crate::rename::{rename_image, RenameOutcome, RenameSpec};
use crate::resize::{resize_image, Dimension, ResizeSpec};
use crate::utils::display_name;
use crate::validation::{parse_sizes, resolve_output_dir, validate_input_file, validate_quality};
use clap::Parser;
use log::warn;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

impl Commands {
    /// Parse one chain segment, e.g. `["resize", "a.jpg", "--width", "300"]`.
    pub fn parse_segment<A>(segment: &[A]) -> Result<Self>
    where
        A: Into<OsString> + Clone,
    {
        let argv = std::iter::once(OsString::from("imgpro")).chain(segment.iter().cloned().map(Into::into));
        Ok(Args::try_parse_from(argv)?.command)
    }
}

impl ChainStep for Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Info { .. } => "info",
            Commands::Resize { .. } => "resize",
            Commands::Convert { .. } => "convert",
            Commands::Rename { .. } => "rename",
        }
    }

    fn input(&self) -> Option<&Path> {
        match self {
            Commands::Info { file, .. }
            | Commands::Resize { file, .. }
            | Commands::Convert { file, .. }
            | Commands::Rename { file, .. } => file.as_deref(),
        }
    }

    fn accepts_carried(&self) -> bool {
        true
    }

    fn run(&self, input: &Path) -> Result<StepOutput> {
        match self {
            Commands::Info {
                json,
                short,
                exif,
                exif_all,
                ..
            } => {
                let display = if *exif_all {
                    ExifDisplay::All
                } else if *exif {
                    ExifDisplay::Curated
                } else {
                    ExifDisplay::Hidden
                };
                cmd_info(input, *json, *short, display)
            }
            Commands::Resize {
                width,
                height,
                output,
                quality,
                ..
            } => cmd_resize(input, width.as_deref(), height.as_deref(), output, *quality),
            Commands::Convert {
                format,
                output,
                quality,
                strip_exif,
                ..
            } => cmd_convert(input, format, output, *quality, *strip_exif),
            Commands::Rename {
                ext,
                prefix_exif_date,
                output,
                ..
            } => cmd_rename(input, *ext, *prefix_exif_date, output.clone()),
        }
    }
}

/// Report on one image; the input passes through to the next step.
pub fn cmd_info(input: &Path, json: bool, short: bool, exif: ExifDisplay) -> Result<StepOutput> {
    validate_input_file(input)?;

    let meta = get_image_info(input).map_err(|e| match e {
        ImgProError::CannotRead(path) => ImgProError::UnreadableImage(path),
        other => other,
    })?;

    if json {
        println!("{}", render_json(&meta, exif == ExifDisplay::All)?);
    } else if short {
        println!("{}", render_csv(&meta));
    } else {
        println!("{}", render_text(&meta, exif));
    }

    Ok(StepOutput::single(input))
}

pub fn cmd_resize(
    input: &Path,
    width: Option<&str>,
    height: Option<&str>,
    output: &Path,
    quality: u32,
) -> Result<StepOutput> {
    validate_input_file(input)?;
    require_jpeg_extension(input)?;

    let (dimension, sizes) = match (width, height) {
        (Some(_), Some(_)) => {
            return Err(ImgProError::InvalidArgument(
                "Cannot specify both --width and --height".to_string(),
            ))
        }
        (Some(list), None) => (Dimension::Width, parse_sizes(list)?),
        (None, Some(list)) => (Dimension::Height, parse_sizes(list)?),
        (None, None) => {
            return Err(ImgProError::InvalidArgument(
                "Must specify either --width or --height".to_string(),
            ))
        }
    };
    let quality = validate_quality(quality)?;

    let (orig_width, orig_height) = image::image_dimensions(input)
        .map_err(|_| ImgProError::CannotRead(input.to_path_buf()))?;

    let output_dir = resolve_output_dir(output, input)?;

    println!(
        "Processing: {} ({}x{})",
        display_name(input),
        orig_width,
        orig_height
    );
    println!("Output directory: {}", output.display());
    println!();

    let spec = ResizeSpec {
        sizes,
        dimension,
        quality,
    };
    let result = resize_image(input, &output_dir, &spec)?;

    for created in &result.created {
        println!(
            "✓ Created: {} ({}x{}, {:.0} KB)",
            display_name(&created.path),
            created.width,
            created.height,
            created.size_kb
        );
    }

    if !result.skipped.is_empty() {
        println!();
        for skipped in &result.skipped {
            println!("⚠ Skipped {}px: {}", skipped.size, skipped.reason);
        }
    }

    println!();
    if result.created.is_empty() {
        warn!("No images created (all sizes would require upscaling)");
    } else {
        println!(
            "Successfully created {} image(s) from {}",
            result.created.len(),
            display_name(input)
        );
    }

    Ok(result.created_paths().into())
}

fn require_jpeg_extension(input: &Path) -> Result<()> {
    let extension = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    if JPEG_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(ImgProError::UnsupportedFormat(format!(
            "Unsupported format: resize accepts JPEG input only. Supported extensions: {}",
            JPEG_EXTENSIONS.join(", ")
        )))
    }
}

pub fn cmd_convert(
    input: &Path,
    format: &str,
    output: &Path,
    quality: u32,
    strip_exif: bool,
) -> Result<StepOutput> {
    validate_input_file(input)?;

    let format: OutputFormat = format.parse()?;
    let quality = validate_quality(quality)?;
    probe_format(input)?;

    let output_dir = resolve_output_dir(output, input)?;
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output_path = output_dir.join(format!("{}{}", stem, format.extension()));

    if output_path.exists() {
        warn!("Overwriting existing file: {}", output_path.display());
    }

    let spec = ConvertSpec {
        strip_exif,
        ..ConvertSpec::new(format, quality)
    };
    if !convert_image(input, &output_path, &spec) {
        return Err(ImgProError::ConversionFailed(input.to_path_buf()));
    }

    println!("Created: {}", output_path.display());
    Ok(StepOutput::single(output_path))
}

pub fn cmd_rename(
    input: &Path,
    correct_extension: bool,
    add_date_prefix: bool,
    output: Option<PathBuf>,
) -> Result<StepOutput> {
    validate_input_file(input)?;
    let spec = RenameSpec::new(correct_extension, add_date_prefix, output)?;

    match rename_image(input, &spec)? {
        RenameOutcome::Created(path) => {
            println!("Created: {}", path.display());
            Ok(StepOutput::single(path))
        }
        RenameOutcome::Unchanged(path) => {
            println!("No change needed: {}", display_name(&path));
            Ok(StepOutput::single(path))
        }
        RenameOutcome::Skipped => Ok(StepOutput::none()),
    }
}
