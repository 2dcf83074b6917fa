use crate::config::Config;
use crate::pipeline::StageContext;
use crate::tools::{
    ensure_directory_exists, extract_frame_at, file_stem_or, probe_video_properties,
    sample_timestamps, validate_file_exists,
};
use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// `<stem>_frame_<index:08>.png`
#[must_use]
pub fn frame_output_name(stem: &str, index: usize) -> String {
    format!("{stem}_frame_{index:08}.png")
}

pub struct FrameExtractor {
    config: Config,
    shutdown_signal: Arc<AtomicBool>,
}

impl FrameExtractor {
    pub const fn new(config: Config, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            config,
            shutdown_signal,
        }
    }

    pub fn run(&self) -> Result<()> {
        println!("{}", style("=== 畫格擷取 ===").cyan().bold());

        let settings = &self.config.frame_extract;
        if settings.input_video_path.is_empty() {
            println!("{}", style("未設定任何影片（frame_extract.input_video_path）").yellow());
            return Ok(());
        }
        ensure_directory_exists(&settings.output_image_path)?;

        let ctx = StageContext::new(Arc::clone(&self.shutdown_signal))
            .with_timeout(self.config.stage_timeout());

        let mut total = 0;
        for video in &settings.input_video_path {
            let count = self
                .extract_video(video, &settings.output_image_path, &ctx)
                .with_context(|| format!("擷取 {} 失敗", video.display()))?;
            total += count;
        }

        println!();
        println!(
            "共擷取 {} 張畫格至 {}",
            style(total).green(),
            settings.output_image_path.display()
        );
        info!("畫格擷取完成，共 {total} 張");
        Ok(())
    }

    fn extract_video(&self, video: &Path, output_dir: &Path, ctx: &StageContext) -> Result<usize> {
        validate_file_exists(video)?;
        let properties = probe_video_properties(&self.config.ffmpeg.ffprobe_path, video, ctx)?;
        let settings = &self.config.frame_extract;
        let stamps = sample_timestamps(
            properties.duration_seconds,
            settings.frame_extraction_interval,
            settings.sample_policy,
        );
        if stamps.is_empty() {
            warn!("{} 太短，沒有可擷取的時間點", video.display());
            return Ok(0);
        }

        let stem = file_stem_or(video, "video");
        let progress_bar = ProgressBar::new(stamps.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                .progress_chars("#>-"),
        );
        progress_bar.set_message(stem.clone());

        let ffmpeg = &self.config.ffmpeg.ffmpeg_path;
        let result = stamps.par_iter().enumerate().try_for_each(|(i, &stamp)| {
            let output = output_dir.join(frame_output_name(&stem, i));
            let extracted = extract_frame_at(ffmpeg, video, stamp, None, &output, ctx);
            progress_bar.inc(1);
            extracted
        });
        progress_bar.finish_and_clear();
        result?;

        println!("  {} : {} 張", stem, stamps.len());
        Ok(stamps.len())
    }
}
