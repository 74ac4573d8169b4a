pub mod chain;
pub mod cli;
pub mod commands;
pub mod constants;
pub mod convert;
pub mod error;
pub mod formats;
pub mod info;
pub mod processing;
pub mod rename;
pub mod resize;
pub mod utils;
pub mod validation;

#[cfg(test)]
mod test_helpers;

pub use chain::{execute_chain, split_chain, ChainStep, StepOutput};
pub use convert::{convert_image, convert_to_srgb, try_convert_image, ConvertFailure, ConvertSpec};
pub use error::{ImgProError, Result};
pub use formats::{probe_format, OutputFormat};
pub use info::{
    calculate_aspect_ratio, classify_orientation, get_image_info, match_common_ratio,
    ImageMetadata, Orientation,
};
pub use rename::{build_renamed_filename, format_exif_date_prefix, RenameOutcome, RenameSpec};
pub use resize::{calculate_target_dimensions, resize_image, Dimension, ResizeResult, ResizeSpec};
pub use validation::{parse_sizes, validate_input_file, validate_output_path};
