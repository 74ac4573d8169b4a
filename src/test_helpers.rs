//! Fixture builders shared by the unit tests.

use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};
use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub const SAMPLE_DATE: &str = "2024:11:12 14:30:00";

pub fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([0, 200, 0])))
        .save_with_format(&path, ImageFormat::Jpeg)
        .unwrap();
    path
}

pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])))
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

pub fn ascii(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

pub fn short(tag: Tag, value: u16) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Short(vec![value]),
    }
}

/// TIFF-structured EXIF block holding `fields`.
pub fn exif_block(fields: &[Field]) -> Vec<u8> {
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut buffer = Cursor::new(Vec::new());
    writer.write(&mut buffer, false).unwrap();
    buffer.into_inner()
}

/// A JPEG carrying an EXIF block built from `fields`.
pub fn write_jpeg_with_exif(
    dir: &Path,
    name: &str,
    width: u32,
    height: u32,
    fields: &[Field],
) -> PathBuf {
    let path = write_jpeg(dir, name, width, height);
    let mut jpeg = Jpeg::from_bytes(Bytes::from(fs::read(&path).unwrap())).unwrap();
    jpeg.set_exif(Some(Bytes::from(exif_block(fields))));
    let mut file = File::create(&path).unwrap();
    jpeg.encoder().write_to(&mut file).unwrap();
    path
}

/// JPEG with a capture date, camera identity and a GPS block.
pub fn write_full_exif_jpeg(dir: &Path, name: &str) -> PathBuf {
    write_jpeg_with_exif(
        dir,
        name,
        800,
        600,
        &[
            ascii(Tag::DateTimeOriginal, SAMPLE_DATE),
            ascii(Tag::DateTime, "2024:12:01 09:00:00"),
            ascii(Tag::Make, "Canon"),
            ascii(Tag::Model, "EOS R5"),
            short(Tag::Orientation, 1),
            ascii(Tag::GPSLatitudeRef, "N"),
        ],
    )
}
