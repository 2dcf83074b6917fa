//! 固定間隔畫格擷取元件

mod main;

pub use main::{FrameExtractor, frame_output_name};
