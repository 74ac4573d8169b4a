use crate::constants::{
    DEFAULT_CONVERT_OUTPUT, DEFAULT_CONVERT_QUALITY, DEFAULT_RESIZE_OUTPUT, DEFAULT_RESIZE_QUALITY,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "imgpro",
    about = "Command-line tool for responsive image processing",
    long_about = "imgpro inspects, resizes, converts and renames images. \
                  Commands can be chained with a standalone '+' so that each step \
                  works on the files produced by the previous one.",
    version,
    after_help = "EXAMPLES:\n  \
    imgpro info photo.jpg --json\n  \
    imgpro resize photo.jpg --width 300,600,900 --output ./resized\n  \
    imgpro convert photo.png --format jpeg --strip-exif\n  \
    imgpro rename IMG_0001.jpg --ext --prefix-exif-date\n  \
    imgpro resize photo.jpg --width 300 + convert --format webp"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        about = "Display image information and metadata",
        long_about = "Inspect an image file and report dimensions, orientation, aspect ratio \
                      and capture metadata."
    )]
    Info {
        #[arg(help = "Path to image file (defaults to the previous step's output)")]
        file: Option<PathBuf>,

        #[arg(long, conflicts_with = "short", help = "Output in JSON format")]
        json: bool,

        #[arg(long, help = "Output as a single CSV line")]
        short: bool,

        #[arg(long, help = "Show curated EXIF metadata")]
        exif: bool,

        #[arg(long, help = "Show all EXIF metadata tags")]
        exif_all: bool,
    },

    #[command(
        about = "Resize an image to multiple widths or heights",
        long_about = "Resize a JPEG to several target widths or heights while keeping its \
                      aspect ratio. Sizes larger than the original are skipped, never upscaled. \
                      Output never carries EXIF metadata."
    )]
    Resize {
        #[arg(help = "Path to JPEG file (defaults to the previous step's output)")]
        file: Option<PathBuf>,

        #[arg(
            long,
            conflicts_with = "height",
            required_unless_present = "height",
            help = "Comma-separated target widths (e.g. 300,600,900)"
        )]
        width: Option<String>,

        #[arg(long, help = "Comma-separated target heights (e.g. 400,800)")]
        height: Option<String>,

        #[arg(long, default_value = DEFAULT_RESIZE_OUTPUT, help = "Output directory")]
        output: PathBuf,

        #[arg(
            long,
            default_value_t = DEFAULT_RESIZE_QUALITY,
            help = "JPEG quality 1-100"
        )]
        quality: u32,
    },

    #[command(
        about = "Convert an image to another format",
        long_about = "Convert an image to JPEG, PNG or WebP. Colors are normalized to sRGB, \
                      transparency is flattened onto white for JPEG, and GPS metadata is \
                      always removed."
    )]
    Convert {
        #[arg(help = "Path to source image (defaults to the previous step's output)")]
        file: Option<PathBuf>,

        #[arg(short = 'f', long, help = "Target format (jpeg, jpg, png, webp)")]
        format: String,

        #[arg(long, default_value = DEFAULT_CONVERT_OUTPUT, help = "Output directory")]
        output: PathBuf,

        #[arg(
            long,
            default_value_t = DEFAULT_CONVERT_QUALITY,
            help = "Encoder quality 1-100"
        )]
        quality: u32,

        #[arg(long, help = "Remove all EXIF metadata from the output")]
        strip_exif: bool,
    },

    #[command(
        about = "Copy an image under a name derived from its content",
        long_about = "Copy an image to a new name with the extension matching its real format \
                      and/or its EXIF capture date as a prefix. The original is kept."
    )]
    Rename {
        #[arg(help = "Path to image file (defaults to the previous step's output)")]
        file: Option<PathBuf>,

        #[arg(long, help = "Correct the extension to match the detected format")]
        ext: bool,

        #[arg(long, help = "Prefix the EXIF capture date (YYYY-MM-DDTHHMMSS_)")]
        prefix_exif_date: bool,

        #[arg(long, help = "Output directory (default: the source's directory)")]
        output: Option<PathBuf>,
    },
}
