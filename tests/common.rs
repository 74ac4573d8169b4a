#![allow(dead_code)]

use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SAMPLE_DATE: &str = "2024:11:12 14:30:00";

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}

pub fn create_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([30, 90, 200])))
        .save_with_format(&path, ImageFormat::Jpeg)
        .unwrap();
    path
}

/// 1920x1080 landscape JPEG without metadata.
pub fn create_landscape_jpeg(dir: &Path) -> PathBuf {
    create_jpeg(dir, "landscape.jpg", 1920, 1080)
}

pub fn create_transparent_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut img = RgbaImage::from_pixel(64, 64, Rgba([255, 0, 0, 255]));
    for x in 0..32 {
        for y in 0..64 {
            img.put_pixel(x, y, Rgba([0, 0, 0, 0]));
        }
    }
    DynamicImage::ImageRgba8(img)
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

pub fn create_text_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    File::create(&path)
        .unwrap()
        .write_all(b"This is not an image file")
        .unwrap();
    path
}

fn ascii(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

/// 800x600 JPEG with capture date, camera identity and a GPS reference.
pub fn create_exif_jpeg(dir: &Path, name: &str) -> PathBuf {
    let path = create_jpeg(dir, name, 800, 600);

    let fields = [
        ascii(Tag::DateTimeOriginal, SAMPLE_DATE),
        ascii(Tag::Make, "Canon"),
        ascii(Tag::Model, "EOS R5"),
        ascii(Tag::GPSLatitudeRef, "N"),
    ];
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut block = Cursor::new(Vec::new());
    writer.write(&mut block, false).unwrap();

    let mut jpeg = Jpeg::from_bytes(Bytes::from(fs::read(&path).unwrap())).unwrap();
    jpeg.set_exif(Some(Bytes::from(block.into_inner())));
    let mut file = File::create(&path).unwrap();
    jpeg.encoder().write_to(&mut file).unwrap();
    path
}

/// Names of the files in `dir` with the given extension, sorted.
pub fn files_with_extension(dir: &Path, extension: &str) -> Vec<String> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |e| e == extension))
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
