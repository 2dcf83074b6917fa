use super::error::{PipelineError, Result};
use crate::tools::Timecode;
use std::fmt;
use std::path::PathBuf;

/// 來源影片中的一段時間範圍，`start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSegment {
    start: Timecode,
    end: Timecode,
}

impl TimeSegment {
    pub fn new(start: Timecode, end: Timecode) -> Result<Self> {
        if start >= end {
            return Err(PipelineError::InvalidSegment(format!(
                "開始時間 {start} 必須早於結束時間 {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// 由兩個 `HH:MM:SS` 字串建立
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let start = start
            .parse::<Timecode>()
            .map_err(|e| PipelineError::InvalidSegment(e.to_string()))?;
        let end = end
            .parse::<Timecode>()
            .map_err(|e| PipelineError::InvalidSegment(e.to_string()))?;
        Self::new(start, end)
    }

    #[must_use]
    pub const fn start(&self) -> Timecode {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> Timecode {
        self.end
    }

    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        (self.end.as_millis() - self.start.as_millis()) as f64 / 1000.0
    }
}

impl fmt::Display for TimeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

/// 單一區段的處理狀態，只能依序前進，不可跳過
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Pending,
    Extracted,
    Decomposed,
    Enhanced,
    Recomposed,
    Remuxed,
    Finalized,
    Failed,
}

impl SegmentState {
    /// 下一個合法狀態；`Finalized` 與 `Failed` 為終止狀態
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Extracted),
            Self::Extracted => Some(Self::Decomposed),
            Self::Decomposed => Some(Self::Enhanced),
            Self::Enhanced => Some(Self::Recomposed),
            Self::Recomposed => Some(Self::Remuxed),
            Self::Remuxed => Some(Self::Finalized),
            Self::Finalized | Self::Failed => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Failed)
    }
}

impl fmt::Display for SegmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "Pending",
            Self::Extracted => "Extracted",
            Self::Decomposed => "Decomposed",
            Self::Enhanced => "Enhanced",
            Self::Recomposed => "Recomposed",
            Self::Remuxed => "Remuxed",
            Self::Finalized => "Finalized",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// 區段 `i` 在工作目錄中的中繼產物路徑
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentArtifacts {
    pub index: usize,
    pub trimmed_clip: PathBuf,
    pub raw_frames_dir: PathBuf,
    pub enhanced_frames_dir: PathBuf,
    pub recomposed_video: PathBuf,
    pub final_segment: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_requires_start_before_end() {
        assert!(TimeSegment::parse("00:10:07", "00:36:16").is_ok());
        assert!(TimeSegment::parse("00:36:16", "00:10:07").is_err());
        assert!(TimeSegment::parse("00:00:05", "00:00:05").is_err());
        assert!(TimeSegment::parse("bad", "00:00:05").is_err());
    }

    #[test]
    fn test_segment_duration() {
        let seg = TimeSegment::parse("00:10:07", "00:36:16").unwrap();
        assert!((seg.duration_seconds() - 1569.0).abs() < f64::EPSILON);
        assert_eq!(seg.to_string(), "00:10:07 - 00:36:16");
    }

    #[test]
    fn test_state_sequence_is_linear() {
        let mut state = SegmentState::Pending;
        let mut visited = vec![state];
        while let Some(next) = state.next() {
            visited.push(next);
            state = next;
        }
        assert_eq!(
            visited,
            vec![
                SegmentState::Pending,
                SegmentState::Extracted,
                SegmentState::Decomposed,
                SegmentState::Enhanced,
                SegmentState::Recomposed,
                SegmentState::Remuxed,
                SegmentState::Finalized,
            ]
        );
        assert!(SegmentState::Failed.next().is_none());
        assert!(SegmentState::Failed.is_terminal());
    }
}
