//! 功能元件模組
//!
//! 每個子模組實現一個獨立的模式，共用 `pipeline` 與 `tools`

pub mod frame_extractor;
pub mod low_scale_generator;
pub mod upscale_check;
pub mod upscaler;

pub use frame_extractor::FrameExtractor;
pub use low_scale_generator::LowScaleGenerator;
pub use upscale_check::UpscaleCheck;
pub use upscaler::Upscaler;
