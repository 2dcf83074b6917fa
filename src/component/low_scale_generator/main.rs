use crate::config::Config;
use crate::pipeline::stages::ffmpeg_command;
use crate::pipeline::{PipelineError, StageContext, StageKind};
use crate::tools::{ensure_directory_exists, validate_directory_exists};
use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// 資料夾內（不遞迴）的影像檔，依檔名排序
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    validate_directory_exists(dir)?;

    let mut images: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        })
        .collect();
    images.sort();
    Ok(images)
}

pub struct LowScaleGenerator {
    config: Config,
    shutdown_signal: Arc<AtomicBool>,
}

impl LowScaleGenerator {
    pub const fn new(config: Config, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            config,
            shutdown_signal,
        }
    }

    pub fn run(&self) -> Result<()> {
        println!("{}", style("=== 低解析度影像產生 ===").cyan().bold());

        let settings = &self.config.gen_low_scale;
        let images = collect_images(&settings.input_image_path)?;
        if images.is_empty() {
            println!("{}", style("找不到任何影像檔案").yellow());
            return Ok(());
        }
        ensure_directory_exists(&settings.output_image_path)?;

        println!(
            "{}",
            style(format!(
                "找到 {} 張影像，縮放至 {}px 寬",
                images.len(),
                settings.width_px
            ))
            .green()
        );

        let ctx = StageContext::new(Arc::clone(&self.shutdown_signal))
            .with_timeout(self.config.stage_timeout());

        let progress_bar = ProgressBar::new(images.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                .progress_chars("#>-"),
        );
        progress_bar.set_message("縮放中...");

        let succeeded = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        images.par_iter().for_each(|image| {
            if ctx.is_cancelled() {
                return;
            }
            match self.downscale(image, &settings.output_image_path, &ctx) {
                Ok(()) => {
                    succeeded.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) if is_cancellation(&e) => return,
                Err(e) => {
                    error!("{}: {e}", image.display());
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
            progress_bar.inc(1);
        });

        let cancelled = ctx.is_cancelled();
        if cancelled {
            progress_bar.abandon_with_message("已中斷");
        } else {
            progress_bar.finish_with_message("完成");
        }

        let succeeded = succeeded.into_inner();
        let failed = failed.into_inner();
        println!();
        println!("{}", style("=== 縮放摘要 ===").cyan().bold());
        println!("  總計: {} 張", images.len());
        println!("  成功: {} 張", style(succeeded).green());
        if failed > 0 {
            println!("  失敗: {} 張", style(failed).red());
        }
        let skipped = images.len() - succeeded - failed;
        if skipped > 0 {
            println!("  未處理: {} 張", style(skipped).yellow());
        }
        info!("低解析度影像產生結束 - 成功: {succeeded}, 失敗: {failed}, 未處理: {skipped}");

        if cancelled {
            return Err(PipelineError::Cancelled {
                stage: StageKind::Decompose,
            }
            .into());
        }
        Ok(())
    }

    fn downscale(&self, image: &Path, output_dir: &Path, ctx: &StageContext) -> Result<()> {
        let Some(name) = image.file_name() else {
            anyhow::bail!("無效的檔名: {}", image.display());
        };

        let mut cmd = ffmpeg_command(&self.config.ffmpeg.ffmpeg_path, StageKind::Decompose);
        cmd.arg("-i")
            .arg(image)
            .arg("-vf")
            .arg(format!("scale={}:-1", self.config.gen_low_scale.width_px))
            .arg("-y")
            .arg(output_dir.join(name));
        cmd.execute(ctx)?;
        Ok(())
    }
}

fn is_cancellation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<PipelineError>()
        .is_some_and(|e| matches!(e.root(), PipelineError::Cancelled { .. }))
}
