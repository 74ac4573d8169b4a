pub const DEFAULT_RESIZE_QUALITY: u32 = 90;
pub const DEFAULT_CONVERT_QUALITY: u32 = 80;
pub const MIN_QUALITY: u32 = 1;
pub const MAX_QUALITY: u32 = 100;

pub const DEFAULT_RESIZE_OUTPUT: &str = "./resized/";
pub const DEFAULT_CONVERT_OUTPUT: &str = "./converted/";

/// Inputs larger than this are refused before any decode attempt (200 MiB).
pub const MAX_INPUT_FILE_SIZE: u64 = 200 * 1024 * 1024;

/// Decoded pixel ceiling; anything above is treated as a decompression bomb.
pub const MAX_IMAGE_PIXELS: u64 = 2 * 89_478_485;

/// Worst-case decoded bytes per pixel (16-bit RGBA), used for the allocation limit.
pub const DECODE_BYTES_PER_PIXEL: u64 = 8;

pub const MAX_SIZES_COUNT: usize = 20;

pub const CHAIN_SEPARATOR: &str = "+";

pub const ZOPFLI_ITERATIONS: u8 = 15;
pub const LIBDEFLATER_HIGH_LEVEL: u8 = 12;
pub const LIBDEFLATER_LOW_LEVEL: u8 = 8;
pub const OXIPNG_PRESET: u8 = 4;

pub const JPEG_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".JPG", ".JPEG"];

/// Reduced aspect ratios with a recognisable display name.
pub const COMMON_RATIOS: &[(&str, &str)] = &[
    ("1:1", "1:1"),
    ("4:3", "4:3"),
    ("3:4", "3:4"),
    ("3:2", "3:2"),
    ("2:3", "2:3"),
    ("16:9", "16:9"),
    ("9:16", "9:16"),
    ("5:4", "5:4"),
    ("4:5", "4:5"),
    // Instagram landscape
    ("191:100", "1.91:1"),
];

/// Detected container format name to preferred file extension.
pub const FORMAT_EXTENSIONS: &[(&str, &str)] = &[
    ("JPEG", ".jpg"),
    ("PNG", ".png"),
    ("HEIF", ".heic"),
    ("GIF", ".gif"),
    ("WEBP", ".webp"),
    ("TIFF", ".tiff"),
    ("BMP", ".bmp"),
    ("ICO", ".ico"),
    ("PPM", ".ppm"),
    ("DNG", ".dng"),
];

pub const NO_COMMON_RATIO: &str = "none";
