//! 超解析度試跑元件
//!
//! 在來源影片中固定間隔取樣畫格，以每個倍率分別縮小後送進增強工具，
//! 方便比較不同倍率的效果。

mod main;

pub use main::{UpscaleCheck, check_width};
