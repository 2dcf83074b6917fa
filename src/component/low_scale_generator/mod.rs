//! 低解析度影像產生元件
//!
//! 將資料夾內的影像依寬度等比例縮小，保留原檔名

mod main;

pub use main::{LowScaleGenerator, collect_images};
