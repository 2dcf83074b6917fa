//! 影片超解析度元件
//!
//! 依設定的時間區段裁切、拆解、增強、重組並合併成 `<name>_upscaled.mp4`

mod main;
mod progress;

pub use main::{Upscaler, build_job};
pub use progress::ProgressObserver;
