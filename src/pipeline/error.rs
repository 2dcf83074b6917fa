//! 管線錯誤型別
//!
//! 所有階段的失敗都會往上傳遞到 [`Orchestrator`](super::Orchestrator)，
//! 由它加上區段編號後回報給呼叫端。

use super::stage::StageKind;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// 媒體串流種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 工作目錄或中繼目錄無法建立
    #[error("無法建立目錄 {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 目錄已存在（可能是上次失敗留下的畫格）
    #[error("目錄已存在: {}", path.display())]
    DirectoryConflict { path: PathBuf },

    /// 最終輸出檔案已存在
    #[error("輸出檔案已存在: {}", path.display())]
    OutputConflict { path: PathBuf },

    /// 外部工具以非零狀態結束
    #[error("{stage} 階段失敗: {message}")]
    ExternalTool { stage: StageKind, message: String },

    #[error("{stage} 階段逾時（{after:?}）")]
    Timeout { stage: StageKind, after: Duration },

    #[error("{stage} 階段已取消")]
    Cancelled { stage: StageKind },

    /// 輸入缺少預期的串流
    #[error("{stage} 階段找不到 {kind} 串流: {}", path.display())]
    MissingStream {
        stage: StageKind,
        kind: StreamKind,
        path: PathBuf,
    },

    #[error("{stage} 階段畫格數量不符: 預期 {expected}，實際 {actual}")]
    FrameCountMismatch {
        stage: StageKind,
        expected: usize,
        actual: usize,
    },

    /// 清理暫存檔失敗（只會以警告形式回報）
    #[error("無法刪除 {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("無法解析 {} 的 ffprobe 輸出: {message}", path.display())]
    Probe { path: PathBuf, message: String },

    #[error("時間區段無效: {0}")]
    InvalidSegment(String),

    #[error("工作設定無效: {0}")]
    InvalidJob(String),

    #[error("I/O 錯誤: {0}")]
    Io(#[from] io::Error),

    /// 以 1 起算的區段編號包裝任何階段錯誤
    #[error("區段 {number} 失敗: {source}")]
    Segment {
        number: usize,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    pub fn external(stage: StageKind, message: impl Into<String>) -> Self {
        Self::ExternalTool {
            stage,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn in_segment(self, number: usize) -> Self {
        Self::Segment {
            number,
            source: Box::new(self),
        }
    }

    /// 去除 `Segment` 包裝後的實際錯誤
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Segment { source, .. } => source.root(),
            other => other,
        }
    }

    /// 失敗的階段
    #[must_use]
    pub fn stage(&self) -> Option<StageKind> {
        match self.root() {
            Self::ExternalTool { stage, .. }
            | Self::Timeout { stage, .. }
            | Self::Cancelled { stage }
            | Self::MissingStream { stage, .. }
            | Self::FrameCountMismatch { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// 失敗的區段編號（1 起算）
    #[must_use]
    pub const fn segment_number(&self) -> Option<usize> {
        match self {
            Self::Segment { number, .. } => Some(*number),
            _ => None,
        }
    }

    /// 依失敗類別與階段區分的程序結束碼
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.root() {
            Self::Io(_) | Self::Segment { .. } => 1,
            Self::InvalidSegment(_) | Self::InvalidJob(_) => 2,
            Self::DirectoryCreation { .. }
            | Self::DirectoryConflict { .. }
            | Self::OutputConflict { .. } => 3,
            Self::MissingStream { .. } => 4,
            Self::Timeout { .. } => 5,
            Self::Cleanup { .. } => 6,
            Self::Probe { .. } => 11,
            Self::FrameCountMismatch { stage, .. } | Self::ExternalTool { stage, .. } => {
                stage.exit_code()
            }
            Self::Cancelled { .. } => 130,
        }
    }
}
