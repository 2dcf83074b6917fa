pub mod load;
pub mod save;
pub mod types;

pub use load::{CONFIG_ENV_VAR, CONFIG_FILE_NAME, config_path};
pub use types::{
    CheckConfig, CommonConfig, Config, EnhancerConfig, EnhancerKind, FfmpegConfig,
    FrameExtractConfig, GenLowScaleConfig, UpscaleConfig, WorkspaceConfig,
};
