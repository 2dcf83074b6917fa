use super::error::{PipelineError, Result};
use super::segment::TimeSegment;
use super::workspace::{CleanupPolicy, JobId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 裁切後片段沒有音訊時的處理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAudioPolicy {
    /// 以 `MissingStream` 中止工作
    #[default]
    Abort,
    /// 輸出只含視訊的區段
    VideoOnly,
}

/// 重組前是否比對增強畫格數與 `長度 × 幀率`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameCountPolicy {
    #[default]
    Ignore,
    Warn,
    Enforce,
}

/// 容許的畫格數誤差（四捨五入）
pub const FRAME_COUNT_TOLERANCE: usize = 1;

/// 一次完整的超解析度工作，建立後不再變動
#[derive(Debug, Clone)]
pub struct PipelineJob {
    pub source: PathBuf,
    pub segments: Vec<TimeSegment>,
    pub upscale: u32,
    pub base_width: u32,
    pub cleanup: CleanupPolicy,
    pub workspace_root: PathBuf,
    pub job_id: JobId,
    pub overwrite_output: bool,
}

impl PipelineJob {
    /// 拆解畫格的寬度：`base_width / upscale`
    #[must_use]
    pub const fn frame_width(&self) -> u32 {
        if self.upscale == 0 {
            return 0;
        }
        self.base_width / self.upscale
    }

    /// 來源檔名（不含副檔名）
    #[must_use]
    pub fn stem(&self) -> String {
        self.source
            .file_stem()
            .map_or_else(|| "video".to_string(), |s| s.to_string_lossy().to_string())
    }

    /// 最終輸出：來源目錄下的 `<stem>_upscaled.mp4`
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        let dir = self.source.parent().unwrap_or_else(|| Path::new("."));
        dir.join(format!("{}_upscaled.mp4", self.stem()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.segments.is_empty() {
            return Err(PipelineError::InvalidJob("至少需要一個時間區段".to_string()));
        }
        if self.upscale == 0 {
            return Err(PipelineError::InvalidJob("放大倍率必須大於 0".to_string()));
        }
        if self.frame_width() == 0 {
            return Err(PipelineError::InvalidJob(format!(
                "基準寬度 {} 除以倍率 {} 後為 0",
                self.base_width, self.upscale
            )));
        }
        if !self.source.is_file() {
            return Err(PipelineError::InvalidJob(format!(
                "來源影片不存在: {}",
                self.source.display()
            )));
        }
        Ok(())
    }
}
