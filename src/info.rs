use crate::constants::{COMMON_RATIOS, NO_COMMON_RATIO};
use crate::error::{ImgProError, Result};
use crate::utils::{absolute_path, display_name, file_size_kb, round2, title_case_key};
use exif::{Field, In, Reader, Tag, Value};
use image::ImageReader;
use log::debug;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Every EXIF tag of the primary image, keyed by its readable tag name.
pub type ExifMap = BTreeMap<String, JsonValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Square,
    Landscape,
    Portrait,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Orientation::Square => "square",
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        };
        write!(f, "{}", name)
    }
}

/// The curated subset of EXIF shown by `info --exif`.
///
/// Each field is present only when the source carried the matching tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExifSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_taken: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_make: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_model: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpi_x: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpi_y: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_unit: Option<JsonValue>,
}

impl ExifSummary {
    /// Pick the curated fields out of a full tag map.
    ///
    /// The original capture time wins over the generic modification time.
    pub fn from_map(exif: &ExifMap) -> Self {
        let get = |tag: Tag| exif.get(&tag.to_string()).cloned();
        Self {
            date_taken: get(Tag::DateTimeOriginal).or_else(|| get(Tag::DateTime)),
            camera_make: get(Tag::Make),
            camera_model: get(Tag::Model),
            orientation: get(Tag::Orientation),
            dpi_x: get(Tag::XResolution),
            dpi_y: get(Tag::YResolution),
            resolution_unit: get(Tag::ResolutionUnit),
        }
    }

    /// Present fields in display order.
    pub fn entries(&self) -> Vec<(&'static str, &JsonValue)> {
        [
            ("date_taken", &self.date_taken),
            ("camera_make", &self.camera_make),
            ("camera_model", &self.camera_model),
            ("orientation", &self.orientation),
            ("dpi_x", &self.dpi_x),
            ("dpi_y", &self.dpi_y),
            ("resolution_unit", &self.resolution_unit),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key, v)))
        .collect()
    }

    pub fn date_taken_text(&self) -> Option<String> {
        self.date_taken.as_ref().map(display_value)
    }
}

#[derive(Debug, Clone)]
pub struct ImageMetadata {
    pub filename: String,
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    pub ratio_raw: String,
    pub common_ratio: &'static str,
    pub size_kb: f64,
    pub has_exif: bool,
    pub exif_curated: Option<ExifSummary>,
    pub exif_all: Option<ExifMap>,
    pub creation_date: Option<String>,
}

/// Which EXIF block a report should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExifDisplay {
    Hidden,
    Curated,
    All,
}

pub fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Reduce `width:height` by their greatest common divisor.
pub fn reduce_ratio(width: u32, height: u32) -> (u32, u32) {
    let divisor = gcd(width, height).max(1);
    (width / divisor, height / divisor)
}

/// Aspect ratio rendered as a reduced `W:H` string, e.g. `16:9`.
pub fn calculate_aspect_ratio(width: u32, height: u32) -> String {
    let (w, h) = reduce_ratio(width, height);
    format!("{}:{}", w, h)
}

pub fn classify_orientation(width: u32, height: u32) -> Orientation {
    match width.cmp(&height) {
        std::cmp::Ordering::Equal => Orientation::Square,
        std::cmp::Ordering::Greater => Orientation::Landscape,
        std::cmp::Ordering::Less => Orientation::Portrait,
    }
}

/// Display name of a reduced ratio from the common ratio table, or `none`.
pub fn match_common_ratio(ratio: &str) -> &'static str {
    COMMON_RATIOS
        .iter()
        .find(|(raw, _)| *raw == ratio)
        .map(|(_, name)| *name)
        .unwrap_or(NO_COMMON_RATIO)
}

/// Read the EXIF block of a file, or `None` when it carries none.
pub fn extract_exif(path: &Path) -> Option<ExifMap> {
    let file = File::open(path).ok()?;
    let exif = match Reader::new().read_from_container(&mut BufReader::new(file)) {
        Ok(exif) => exif,
        Err(e) => {
            debug!("No readable EXIF in {}: {}", path.display(), e);
            return None;
        }
    };

    let map: ExifMap = exif
        .fields()
        .filter(|field| field.ifd_num == In::PRIMARY)
        .map(|field| (field.tag.to_string(), field_value(field)))
        .collect();

    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

/// JSON rendering of a tag value: text for strings, numbers for single
/// integers and rationals, the library's display form otherwise.
fn field_value(field: &Field) -> JsonValue {
    match &field.value {
        Value::Ascii(parts) => JsonValue::String(
            parts
                .iter()
                .map(|part| {
                    String::from_utf8_lossy(part)
                        .trim_end_matches('\0')
                        .to_string()
                })
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Byte(v) if v.len() == 1 => json!(v[0]),
        Value::Short(v) if v.len() == 1 => json!(v[0]),
        Value::Long(v) if v.len() == 1 => json!(v[0]),
        Value::Rational(v) if v.len() == 1 => json!(v[0].to_f64()),
        Value::SRational(v) if v.len() == 1 => json!(v[0].to_f64()),
        _ => JsonValue::String(field.display_value().to_string()),
    }
}

/// Plain text for a JSON value: strings unquoted, anything else as JSON.
pub fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Gather dimensions, classification and capture metadata for one file.
///
/// Only the header is decoded. A file the codec cannot parse is a
/// `CannotRead`; a file without EXIF is not an error.
pub fn get_image_info(path: &Path) -> Result<ImageMetadata> {
    let (width, height) = ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()
        .map_err(|e| {
            debug!("Cannot read dimensions of {}: {}", path.display(), e);
            ImgProError::CannotRead(path.to_path_buf())
        })?;

    let ratio_raw = calculate_aspect_ratio(width, height);
    let common_ratio = match_common_ratio(&ratio_raw);

    let exif_all = extract_exif(path);
    let exif_curated = exif_all.as_ref().map(ExifSummary::from_map);
    let creation_date = exif_curated
        .as_ref()
        .and_then(ExifSummary::date_taken_text);

    Ok(ImageMetadata {
        filename: display_name(path),
        path: absolute_path(path)?.to_string_lossy().into_owned(),
        width,
        height,
        orientation: classify_orientation(width, height),
        ratio_raw,
        common_ratio,
        size_kb: file_size_kb(path)?,
        has_exif: exif_all.is_some(),
        exif_curated,
        exif_all,
        creation_date,
    })
}

#[derive(Serialize)]
struct InfoReport<'a> {
    filename: &'a str,
    path: &'a str,
    width: u32,
    height: u32,
    orientation: Orientation,
    ratio_raw: &'a str,
    common_ratio: &'a str,
    size_kb: f64,
    has_exif: bool,
    creation_date: Option<&'a str>,
    exif: Option<JsonValue>,
}

/// One-line JSON report with a fixed key order.
pub fn render_json(meta: &ImageMetadata, exif_all: bool) -> Result<String> {
    let exif = match (&meta.exif_all, &meta.exif_curated) {
        (Some(all), _) if exif_all => Some(serde_json::to_value(all)?),
        (_, Some(curated)) => Some(serde_json::to_value(curated)?),
        _ => None,
    };

    let report = InfoReport {
        filename: &meta.filename,
        path: &meta.path,
        width: meta.width,
        height: meta.height,
        orientation: meta.orientation,
        ratio_raw: &meta.ratio_raw,
        common_ratio: meta.common_ratio,
        size_kb: round2(meta.size_kb),
        has_exif: meta.has_exif,
        creation_date: meta.creation_date.as_deref(),
        exif,
    };
    Ok(serde_json::to_string(&report)?)
}

/// `filename,width,height,orientation,ratio_raw,common_ratio,size_kb,creation_date`
pub fn render_csv(meta: &ImageMetadata) -> String {
    [
        meta.filename.clone(),
        meta.width.to_string(),
        meta.height.to_string(),
        meta.orientation.to_string(),
        meta.ratio_raw.clone(),
        meta.common_ratio.to_string(),
        format!("{:.2}", meta.size_kb),
        meta.creation_date.clone().unwrap_or_default(),
    ]
    .join(",")
}

pub fn render_text(meta: &ImageMetadata, exif: ExifDisplay) -> String {
    let mut lines = vec![
        format!("File: {}", meta.filename),
        format!("Path: {}", meta.path),
        format!("Dimensions: {}x{}", meta.width, meta.height),
        format!("Orientation: {}", meta.orientation),
    ];

    if meta.common_ratio == NO_COMMON_RATIO {
        lines.push(format!("Aspect Ratio: {}", meta.ratio_raw));
    } else {
        lines.push(format!(
            "Aspect Ratio: {} ({})",
            meta.ratio_raw, meta.common_ratio
        ));
    }

    lines.push(format!("File Size: {:.2} KB", meta.size_kb));
    lines.push(format!(
        "EXIF Present: {}",
        if meta.has_exif { "Yes" } else { "No" }
    ));

    if meta.has_exif && exif != ExifDisplay::Hidden {
        lines.push(String::new());
        lines.push("EXIF Data:".to_string());
        match (exif, &meta.exif_all, &meta.exif_curated) {
            (ExifDisplay::All, Some(all), _) => {
                for (key, value) in all {
                    lines.push(format!("  {}: {}", key, display_value(value)));
                }
            }
            (_, _, Some(curated)) => {
                for (key, value) in curated.entries() {
                    lines.push(format!("  {}: {}", title_case_key(key), display_value(value)));
                }
            }
            _ => {}
        }
    }

    lines.join("\n")
}
