mod ffprobe_info;
mod frame_sampler;
mod path_validator;
mod timecode;
mod tool_command;

pub use ffprobe_info::{FrameRate, VideoProperties, parse_ffprobe_json, probe_video_properties};
pub use frame_sampler::{SamplePolicy, extract_frame_at, sample_timestamps};
pub use path_validator::{
    ensure_directory_exists, file_stem_or, move_file, validate_directory_exists,
    validate_file_exists,
};
pub use timecode::{Timecode, TimecodeParseError, format_seconds};
pub use tool_command::{ToolCommand, ToolOutput};
