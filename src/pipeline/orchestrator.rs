//! 管線排程
//!
//! 一次只處理一個區段，區段內的階段依序執行：
//! 裁切 → 查詢屬性 → 拆解 → 增強 → 重組 → 合併音訊。
//! 所有區段完成後合併成最終輸出，再依清理政策刪除工作目錄。
//! 任何階段失敗都會中止整個工作，並保留工作目錄供檢查。

use super::enhancer::EnhanceRequest;
use super::error::{PipelineError, Result};
use super::job::PipelineJob;
use super::segment::{SegmentArtifacts, SegmentState, TimeSegment};
use super::stage::StageContext;
use super::stages::{
    ConcatRequest, DecomposeRequest, RecomposeRequest, RemuxRequest, StageSet, TrimRequest,
};
use super::workspace::{CleanupPolicy, Workspace, remove_dir};
use log::{error, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};

/// 整個工作的狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Concatenating,
    Complete,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "Running",
            Self::Concatenating => "Concatenating",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// 狀態變化通知，預設不做任何事
pub trait PipelineObserver {
    /// `number` 為 1 起算的區段編號
    fn segment_state(&self, _number: usize, _total: usize, _state: SegmentState) {}

    fn job_state(&self, _state: JobState) {}
}

/// 不接收通知
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// 單一完成區段的紀錄
#[derive(Debug, Clone)]
pub struct SegmentRecord {
    pub number: usize,
    pub segment: TimeSegment,
    pub frame_count: usize,
    pub final_segment: PathBuf,
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub output: PathBuf,
    pub workspace_dir: PathBuf,
    pub segments: Vec<SegmentRecord>,
    /// 清理失敗不影響結果，只在這裡回報
    pub cleanup_warnings: Vec<String>,
}

pub struct Orchestrator<'a> {
    job: PipelineJob,
    stages: StageSet,
    ctx: StageContext,
    observer: Box<dyn PipelineObserver + 'a>,
}

impl<'a> Orchestrator<'a> {
    #[must_use]
    pub fn new(job: PipelineJob, stages: StageSet) -> Self {
        Self {
            job,
            stages,
            ctx: StageContext::default(),
            observer: Box::new(NoopObserver),
        }
    }

    #[must_use]
    pub fn with_context(mut self, ctx: StageContext) -> Self {
        self.ctx = ctx;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: impl PipelineObserver + 'a) -> Self {
        self.observer = Box::new(observer);
        self
    }

    #[must_use]
    pub const fn job(&self) -> &PipelineJob {
        &self.job
    }

    /// 執行整個工作
    ///
    /// 失敗時回傳的錯誤以 `Segment` 標示 1 起算的區段編號，並保留工作目錄。
    pub fn run(&self) -> Result<JobReport> {
        self.observer.job_state(JobState::Running);
        let result = self.run_job();
        match &result {
            Ok(report) => {
                self.observer.job_state(JobState::Complete);
                info!("工作完成，輸出 {}", report.output.display());
            }
            Err(e) => {
                self.observer.job_state(JobState::Failed);
                error!("工作失敗: {e}");
            }
        }
        result
    }

    fn run_job(&self) -> Result<JobReport> {
        self.job.validate()?;

        let output = self.job.output_path();
        if output.exists() && !self.job.overwrite_output {
            return Err(PipelineError::OutputConflict { path: output });
        }

        let workspace = Workspace::acquire(&self.job.workspace_root, &self.job.job_id)?;
        info!(
            "工作 {} 開始，共 {} 個區段，工作目錄 {}",
            self.job.job_id,
            self.job.segments.len(),
            workspace.dir().display()
        );

        let mut warnings = Vec::new();
        let mut records = Vec::with_capacity(self.job.segments.len());
        for (index, segment) in self.job.segments.iter().enumerate() {
            let number = index + 1;
            let artifacts = workspace.segment_artifacts(index, &self.job.stem());
            match self.run_segment(number, *segment, &artifacts, &mut warnings) {
                Ok(record) => records.push(record),
                Err(e) => {
                    self.observer
                        .segment_state(number, self.job.segments.len(), SegmentState::Failed);
                    error!(
                        "區段 {number} 失敗，保留工作目錄 {} 供檢查",
                        workspace.dir().display()
                    );
                    return Err(e.in_segment(number));
                }
            }
        }

        self.observer.job_state(JobState::Concatenating);
        self.ctx.check_cancelled(self.stages.concat.kind())?;
        let output = self.stages.concat.run(
            ConcatRequest {
                segments: records.iter().map(|r| r.final_segment.clone()).collect(),
                manifest: workspace.manifest_path(),
                output,
            },
            &self.ctx,
        )?;

        let workspace_dir = workspace.dir().to_path_buf();
        if let Err(e) = workspace.release(self.job.cleanup) {
            warnings.push(e.to_string());
        }

        Ok(JobReport {
            output,
            workspace_dir,
            segments: records,
            cleanup_warnings: warnings,
        })
    }

    fn run_segment(
        &self,
        number: usize,
        segment: TimeSegment,
        artifacts: &SegmentArtifacts,
        warnings: &mut Vec<String>,
    ) -> Result<SegmentRecord> {
        let total = self.job.segments.len();
        let advance = |state: SegmentState| {
            info!("區段 {number}/{total} [{segment}] → {state}");
            self.observer.segment_state(number, total, state);
        };
        advance(SegmentState::Pending);

        self.ctx.check_cancelled(self.stages.trim.kind())?;
        let clip = self.stages.trim.run(
            TrimRequest {
                source: self.job.source.clone(),
                segment,
                output: artifacts.trimmed_clip.clone(),
            },
            &self.ctx,
        )?;
        advance(SegmentState::Extracted);

        self.ctx.check_cancelled(self.stages.probe.kind())?;
        let properties = self.stages.probe.run(clip.clone(), &self.ctx)?;

        self.ctx.check_cancelled(self.stages.decompose.kind())?;
        let raw_frames = self.stages.decompose.run(
            DecomposeRequest {
                clip: clip.clone(),
                width: self.job.frame_width(),
                output_dir: artifacts.raw_frames_dir.clone(),
            },
            &self.ctx,
        )?;
        advance(SegmentState::Decomposed);

        self.ctx.check_cancelled(self.stages.enhance.kind())?;
        let enhanced = self.stages.enhance.run(
            EnhanceRequest {
                frames: raw_frames,
                output_dir: artifacts.enhanced_frames_dir.clone(),
                scale: self.job.upscale,
            },
            &self.ctx,
        )?;
        advance(SegmentState::Enhanced);
        self.retire(&artifacts.raw_frames_dir, warnings);

        self.ctx.check_cancelled(self.stages.recompose.kind())?;
        let frame_count = enhanced.count;
        let video = self.stages.recompose.run(
            RecomposeRequest {
                frames: enhanced,
                properties: properties.clone(),
                output: artifacts.recomposed_video.clone(),
            },
            &self.ctx,
        )?;
        advance(SegmentState::Recomposed);
        self.retire(&artifacts.enhanced_frames_dir, warnings);

        self.ctx.check_cancelled(self.stages.remux.kind())?;
        let final_segment = self.stages.remux.run(
            RemuxRequest {
                video,
                audio_source: clip,
                output: artifacts.final_segment.clone(),
                has_audio: properties.has_audio(),
            },
            &self.ctx,
        )?;
        advance(SegmentState::Remuxed);
        advance(SegmentState::Finalized);

        Ok(SegmentRecord {
            number,
            segment,
            frame_count,
            final_segment,
        })
    }

    /// 下游階段完成後依政策刪除畫格目錄，失敗只記錄警告
    fn retire(&self, dir: &Path, warnings: &mut Vec<String>) {
        if self.job.cleanup != CleanupPolicy::Remove || !dir.exists() {
            return;
        }
        if let Err(e) = remove_dir(dir) {
            warn!("{e}");
            warnings.push(e.to_string());
        }
    }
}
