use crate::constants::{MAX_INPUT_FILE_SIZE, MAX_QUALITY, MAX_SIZES_COUNT, MIN_QUALITY};
use crate::error::{ImgProError, Result};
use log::warn;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Validate an input file before anything reads or decodes it.
///
/// Missing files are `FileNotFound`; files over [`MAX_INPUT_FILE_SIZE`] are
/// refused as invalid arguments. A symlinked input only produces a warning.
pub fn validate_input_file(path: &Path) -> Result<PathBuf> {
    validate_input_file_with_limit(path, MAX_INPUT_FILE_SIZE)
}

pub fn validate_input_file_with_limit(path: &Path, max_size: u64) -> Result<PathBuf> {
    if !path.exists() {
        return Err(ImgProError::FileNotFound(path.to_path_buf()));
    }

    if is_symlink(path) {
        warn!("Input file is a symlink: {}", path.display());
    }

    let metadata = fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(ImgProError::InvalidArgument(format!(
            "Input path is not a file: {}",
            path.display()
        )));
    }

    if metadata.len() > max_size {
        return Err(ImgProError::FileTooLarge(metadata.len(), max_size));
    }

    Ok(path.to_path_buf())
}

/// Reject traversal and NUL bytes in an output path, then resolve it.
///
/// Paths that resolve outside the input file's directory are allowed with a
/// warning.
pub fn validate_output_path(output: &Path, input: &Path) -> Result<PathBuf> {
    if output.as_os_str().to_string_lossy().contains('\0') {
        return Err(ImgProError::UnsafeOutputPath(
            "output path contains a null byte".to_string(),
        ));
    }

    if output.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(ImgProError::UnsafeOutputPath(format!(
            "'..' components are not allowed: {}",
            output.display()
        )));
    }

    let resolved = resolve_lenient(output)?;
    let input_dir = input
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let input_dir = resolve_lenient(input_dir)?;

    if !resolved.starts_with(&input_dir) {
        warn!(
            "Output path is outside the input file's directory: {}",
            resolved.display()
        );
    }

    Ok(resolved)
}

/// Validate an output directory, refuse a symlinked one, and create it.
pub fn resolve_output_dir(output: &Path, input: &Path) -> Result<PathBuf> {
    let resolved = validate_output_path(output, input)?;

    // `link/` and `link/.` would make lstat follow the link
    let trimmed: PathBuf = output.components().collect();
    if is_symlink(&trimmed) {
        return Err(ImgProError::SymlinkOutputDir(output.to_path_buf()));
    }

    fs::create_dir_all(&resolved)?;
    Ok(resolved)
}

/// True when any existing segment of `path` is a symbolic link.
pub fn path_has_symlink(path: &Path) -> bool {
    path.ancestors()
        .filter(|p| !p.as_os_str().is_empty())
        .any(is_symlink)
}

/// Parse a comma separated list of positive pixel sizes.
pub fn parse_sizes(sizes: &str) -> Result<Vec<u32>> {
    let parts: Vec<&str> = sizes.split(',').map(str::trim).collect();

    if parts.len() > MAX_SIZES_COUNT {
        return Err(ImgProError::TooManySizes(parts.len(), MAX_SIZES_COUNT));
    }

    parts
        .into_iter()
        .map(|part| {
            let value: i64 = part
                .parse()
                .map_err(|_| ImgProError::InvalidSize(format!("'{}' is not a number", part)))?;
            if value <= 0 {
                return Err(ImgProError::InvalidSize(
                    "Sizes must be positive integers".to_string(),
                ));
            }
            u32::try_from(value)
                .map_err(|_| ImgProError::InvalidSize(format!("{} is too large", value)))
        })
        .collect()
}

/// Check an encoder quality and narrow it to the encoder's `u8` range.
pub fn validate_quality(quality: u32) -> Result<u8> {
    if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
        return Err(ImgProError::InvalidQuality(quality));
    }
    u8::try_from(quality).map_err(|_| ImgProError::InvalidQuality(quality))
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Absolute form of `path` with symlinks resolved for the part that exists.
fn resolve_lenient(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut resolved = canonical;
            for part in rest.iter().rev() {
                resolved.push(part);
            }
            return Ok(resolved);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(absolute),
        }
    }
}
