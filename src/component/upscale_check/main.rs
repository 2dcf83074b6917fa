use crate::config::Config;
use crate::pipeline::stages::build_transform;
use crate::pipeline::{
    EnhanceRequest, FrameEnhancer, FrameSet, Stage, StageContext, StageKind, Workspace,
    frame_file_name,
};
use crate::tools::{
    Timecode, ensure_directory_exists, extract_frame_at, probe_video_properties,
    sample_timestamps, validate_file_exists,
};
use anyhow::{Context, Result, bail};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// 倍率 `rate` 時的取樣寬度
#[must_use]
pub fn check_width(output_px_width: u32, rate: u32) -> Option<u32> {
    if rate == 0 {
        return None;
    }
    Some(output_px_width / rate).filter(|w| *w > 0)
}

pub struct UpscaleCheck {
    config: Config,
    shutdown_signal: Arc<AtomicBool>,
}

impl UpscaleCheck {
    pub const fn new(config: Config, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            config,
            shutdown_signal,
        }
    }

    pub fn run(&self) -> Result<()> {
        println!("{}", style("=== 超解析度試跑 ===").cyan().bold());

        let source = self.config.common.input_path();
        validate_file_exists(&source)?;

        let ctx = StageContext::new(Arc::clone(&self.shutdown_signal))
            .with_timeout(self.config.stage_timeout());
        let properties = probe_video_properties(&self.config.ffmpeg.ffprobe_path, &source, &ctx)?;

        let check = &self.config.check;
        let stamps = sample_timestamps(
            properties.duration_seconds,
            check.output_interval_sec,
            check.sample_policy,
        );
        if stamps.is_empty() {
            bail!(
                "影片長度 {:.1}s 不足以每 {} 秒取樣",
                properties.duration_seconds,
                check.output_interval_sec
            );
        }
        println!("{}", style(format!("取樣 {} 個時間點", stamps.len())).dim());

        ensure_directory_exists(self.config.workspace_root())?;
        let workspace = Workspace::acquire(
            self.config.workspace_root(),
            &self.config.workspace.job_id()?,
        )?;
        let enhancer = FrameEnhancer::new(build_transform(&self.config)?);

        for &rate in &check.upscale_rates {
            let Some(width) = check_width(check.output_px_width, rate) else {
                bail!("倍率 {rate} 無法用於寬度 {}", check.output_px_width);
            };

            let resize_dir = workspace.join(format!("resize_{rate}"));
            fs::create_dir_all(&resize_dir)
                .with_context(|| format!("無法建立 {}", resize_dir.display()))?;

            self.extract_samples(&source, &stamps, width, &resize_dir, &ctx)?;

            let frames = FrameSet::scan(&resize_dir, None, StageKind::Decompose)?;
            let enhanced = enhancer.run(
                EnhanceRequest {
                    frames,
                    output_dir: workspace.join(format!("upscale_{rate}")),
                    scale: rate,
                },
                &ctx,
            )?;
            println!(
                "  x{rate}: {} 張畫格 → {}",
                enhanced.count,
                style(enhanced.dir.display()).green()
            );
        }

        println!();
        println!("試跑結果保留於 {}", style(workspace.dir().display()).green());
        info!("試跑完成，工作目錄 {}", workspace.dir().display());
        Ok(())
    }

    fn extract_samples(
        &self,
        source: &Path,
        stamps: &[Timecode],
        width: u32,
        output_dir: &Path,
        ctx: &StageContext,
    ) -> Result<()> {
        let progress_bar = ProgressBar::new(stamps.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        progress_bar.set_message(format!("擷取 {width}px 畫格"));

        let ffmpeg = &self.config.ffmpeg.ffmpeg_path;
        let result = stamps.par_iter().enumerate().try_for_each(|(i, &stamp)| {
            let output = output_dir.join(frame_file_name(i));
            let extracted = extract_frame_at(ffmpeg, source, stamp, Some(width), &output, ctx);
            progress_bar.inc(1);
            extracted
        });

        match result {
            Ok(()) => progress_bar.finish_with_message("完成"),
            Err(_) => progress_bar.abandon_with_message("失敗"),
        }
        Ok(result?)
    }
}
