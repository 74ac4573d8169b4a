//! Small helpers shared by the report and command modules.

use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// File size in kilobytes (bytes / 1024).
pub fn file_size_kb(path: &Path) -> Result<f64> {
    Ok(fs::metadata(path)?.len() as f64 / 1024.0)
}

/// Round to two decimal places for reports.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `date_taken` -> `Date Taken`
pub fn title_case_key(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Absolute form of a path without resolving symlinks.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Lossy file name of a path, empty when it has none.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_title_case_key() {
        assert_eq!(title_case_key("date_taken"), "Date Taken");
        assert_eq!(title_case_key("dpi_x"), "Dpi X");
        assert_eq!(title_case_key("orientation"), "Orientation");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.345_6), 12.35);
        assert_eq!(round2(0.004), 0.0);
    }

    #[test]
    fn test_file_size_kb() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("two_kb.bin");
        fs::write(&path, vec![0u8; 2048]).unwrap();
        assert_eq!(file_size_kb(&path).unwrap(), 2.0);
    }

    #[test]
    fn test_absolute_path_keeps_absolute() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(absolute_path(temp_dir.path()).unwrap(), temp_dir.path());
        assert!(absolute_path(Path::new("photo.jpg")).unwrap().is_absolute());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/tmp/photo.jpg")), "photo.jpg");
        assert_eq!(display_name(Path::new("/")), "");
    }
}
