use crate::error::{ImgProError, Result};
use crate::formats::{format_extension, format_name, probe_format};
use crate::info::{extract_exif, ExifSummary};
use crate::utils::display_name;
use crate::validation::resolve_output_dir;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, PersistError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameSpec {
    pub correct_extension: bool,
    pub add_date_prefix: bool,
    pub output_dir: Option<PathBuf>,
}

impl RenameSpec {
    /// At least one of the two actions must be requested.
    pub fn new(
        correct_extension: bool,
        add_date_prefix: bool,
        output_dir: Option<PathBuf>,
    ) -> Result<Self> {
        if !correct_extension && !add_date_prefix {
            return Err(ImgProError::InvalidArgument(
                "At least one action flag (--ext or --prefix-exif-date) is required".to_string(),
            ));
        }
        Ok(Self {
            correct_extension,
            add_date_prefix,
            output_dir,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// A copy was written at this path.
    Created(PathBuf),
    /// The computed name is the file itself.
    Unchanged(PathBuf),
    /// Only a date prefix was requested and none could be derived.
    Skipped,
}

/// `2024:11:12 14:30:00` -> `2024-11-12T143000_`
///
/// Each of the six components must be non-empty ASCII digits.
pub fn format_exif_date_prefix(date: &str) -> Option<String> {
    let mut tokens = date.split(' ');
    let (date_part, time_part) = match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(d), Some(t), None) => (d, t),
        _ => return None,
    };

    let date_fields = numeric_fields(date_part)?;
    let time_fields = numeric_fields(time_part)?;

    Some(format!(
        "{}T{}_",
        date_fields.join("-"),
        time_fields.concat()
    ))
}

fn numeric_fields(part: &str) -> Option<Vec<&str>> {
    let fields: Vec<&str> = part.split(':').collect();
    let valid = fields.len() == 3
        && fields
            .iter()
            .all(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()));
    valid.then_some(fields)
}

/// `{prefix}{stem}{extension}`, keeping the original extension when no
/// replacement is given.
pub fn build_renamed_filename(
    original: &Path,
    extension: Option<&str>,
    date_prefix: Option<&str>,
) -> String {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = match extension {
        Some(ext) => ext.to_string(),
        None => original
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default(),
    };
    format!("{}{}{}", date_prefix.unwrap_or(""), stem, extension)
}

/// Copy `input` to its derived name. The source is never modified, except
/// for a case-only rename on a case-insensitive filesystem where source
/// and destination are one file.
pub fn rename_image(input: &Path, spec: &RenameSpec) -> Result<RenameOutcome> {
    let detected = probe_format(input)?;

    let extension = spec
        .correct_extension
        .then(|| format_extension(&format_name(detected)));

    let mut date_prefix = None;
    if spec.add_date_prefix {
        let date_taken = extract_exif(input)
            .map(|exif| ExifSummary::from_map(&exif))
            .and_then(|summary| summary.date_taken_text());

        date_prefix = match date_taken.as_deref() {
            None => {
                warn!("No EXIF date found in {}, skipping", display_name(input));
                None
            }
            Some(raw) => {
                let prefix = format_exif_date_prefix(raw);
                if prefix.is_none() {
                    warn!(
                        "Unrecognised EXIF date '{}' in {}, skipping",
                        raw,
                        display_name(input)
                    );
                }
                prefix
            }
        };

        if date_prefix.is_none() && !spec.correct_extension {
            return Ok(RenameOutcome::Skipped);
        }
    }

    let file_name = build_renamed_filename(input, extension.as_deref(), date_prefix.as_deref());
    let output_dir = match &spec.output_dir {
        Some(dir) => resolve_output_dir(dir, input)?,
        None => input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf(),
    };
    let output = output_dir.join(&file_name);

    let (source, target) = (resolve_parent(input)?, resolve_parent(&output)?);
    if source == target {
        return Ok(RenameOutcome::Unchanged(input.to_path_buf()));
    }

    if output.exists() {
        if is_same_file(input, &output) {
            if differs_only_by_case(&source, &target) {
                debug!("{} and {} differ only by case", input.display(), output.display());
                replace_case_only(input, &output)?;
                return Ok(RenameOutcome::Created(output));
            }
            // symlink or hard link to the source; copying would truncate it
            warn!(
                "{} already refers to {}, leaving both untouched",
                output.display(),
                display_name(input)
            );
            return Ok(RenameOutcome::Unchanged(output));
        }
        warn!("Overwriting existing file: {}", output.display());
    }

    fs::copy(input, &output)?;
    Ok(RenameOutcome::Created(output))
}

/// Stage to a temporary file beside the destination, remove the original,
/// then atomically move the staged copy to the final name. If the last
/// step fails the staged copy is moved back to the original name.
pub fn replace_case_only(input: &Path, output: &Path) -> Result<()> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let staged = NamedTempFile::new_in(dir)?;
    fs::copy(input, staged.path())?;
    fs::remove_file(input)?;

    if let Err(PersistError { error, file }) = staged.persist(output) {
        file.persist(input).map_err(|restore| ImgProError::Io(restore.error))?;
        return Err(ImgProError::Io(error));
    }
    Ok(())
}

/// Path with its parent directory resolved and the final component kept.
fn resolve_parent(path: &Path) -> Result<PathBuf> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path.file_name().unwrap_or_default();
    Ok(parent.canonicalize()?.join(name))
}

fn differs_only_by_case(a: &Path, b: &Path) -> bool {
    a != b && a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

#[cfg(unix)]
fn is_same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
