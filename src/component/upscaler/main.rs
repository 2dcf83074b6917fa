use super::progress::ProgressObserver;
use crate::config::Config;
use crate::pipeline::{
    CleanupPolicy, JobReport, Orchestrator, PipelineJob, StageContext, StageSet, TimeSegment,
};
use crate::tools::{ensure_directory_exists, validate_file_exists};
use anyhow::{Context, Result};
use console::style;
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// 依設定建立工作
pub fn build_job(config: &Config) -> Result<PipelineJob> {
    let upscale = &config.upscale;
    let segments = upscale
        .time_segments
        .iter()
        .map(|(start, end)| TimeSegment::parse(start, end))
        .collect::<crate::pipeline::Result<Vec<_>>>()
        .context("時間區段設定錯誤")?;

    Ok(PipelineJob {
        source: config.upscale_source(),
        segments,
        upscale: upscale.upscale_rate,
        base_width: upscale.base_width,
        cleanup: CleanupPolicy::from_flag(upscale.remove_tmp_flag),
        workspace_root: config.workspace_root().to_path_buf(),
        job_id: config.workspace.job_id()?,
        overwrite_output: upscale.overwrite_output,
    })
}

pub struct Upscaler {
    config: Config,
    shutdown_signal: Arc<AtomicBool>,
}

impl Upscaler {
    pub const fn new(config: Config, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            config,
            shutdown_signal,
        }
    }

    pub fn run(&self) -> Result<()> {
        println!("{}", style("=== 影片超解析度 ===").cyan().bold());

        let job = build_job(&self.config)?;
        validate_file_exists(&job.source)?;
        ensure_directory_exists(&job.workspace_root)?;

        println!("  來源: {}", job.source.display());
        for (i, segment) in job.segments.iter().enumerate() {
            println!("  區段 {}: {segment}", i + 1);
        }
        println!("  倍率: x{}（拆解寬度 {}px）", job.upscale, job.frame_width());
        println!();

        let stages = StageSet::ffmpeg(&self.config)?;
        let ctx = StageContext::new(Arc::clone(&self.shutdown_signal))
            .with_timeout(self.config.stage_timeout());
        let observer = ProgressObserver::new(job.segments.len())?;

        let report = Orchestrator::new(job, stages)
            .with_context(ctx)
            .with_observer(observer)
            .run()?;

        self.print_summary(&report);
        Ok(())
    }

    fn print_summary(&self, report: &JobReport) {
        println!();
        println!("{}", style("=== 超解析度摘要 ===").cyan().bold());
        for record in &report.segments {
            println!(
                "  區段 {} [{}]: {} 張畫格",
                record.number, record.segment, record.frame_count
            );
        }
        println!("  輸出: {}", style(report.output.display()).green());

        if report.cleanup_warnings.is_empty() {
            if report.workspace_dir.exists() {
                println!("  工作目錄已保留: {}", report.workspace_dir.display());
            }
        } else {
            println!();
            println!("{}", style("清理暫存檔時發生問題:").yellow());
            for warning in &report.cleanup_warnings {
                println!("  {warning}");
                warn!("{warning}");
            }
        }

        info!(
            "超解析度完成 - {} 個區段，輸出 {}",
            report.segments.len(),
            report.output.display()
        );
    }
}
