use super::{ffmpeg_command, require_output};
use crate::pipeline::error::Result;
use crate::pipeline::segment::TimeSegment;
use crate::pipeline::stage::{Stage, StageContext, StageKind};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct TrimRequest {
    pub source: PathBuf,
    pub segment: TimeSegment,
    pub output: PathBuf,
}

/// 從來源影片裁切 `[start, end]` 成獨立片段
#[derive(Debug, Clone)]
pub struct SegmentExtractor {
    ffmpeg: PathBuf,
    video_encoder: Option<String>,
}

impl SegmentExtractor {
    #[must_use]
    pub fn new(ffmpeg: &Path, video_encoder: Option<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.to_path_buf(),
            video_encoder,
        }
    }
}

impl Stage for SegmentExtractor {
    type Input = TrimRequest;
    type Output = PathBuf;

    fn kind(&self) -> StageKind {
        StageKind::Trim
    }

    fn run(&self, request: TrimRequest, ctx: &StageContext) -> Result<PathBuf> {
        let mut cmd = ffmpeg_command(&self.ffmpeg, StageKind::Trim);
        cmd.arg("-ss")
            .arg(request.segment.start().to_string())
            .arg("-to")
            .arg(request.segment.end().to_string())
            .arg("-i")
            .arg(&request.source);
        if let Some(encoder) = &self.video_encoder {
            cmd.arg("-c:v").arg(encoder);
        }
        cmd.arg("-y").arg(&request.output);

        cmd.execute(ctx)?;
        require_output(&request.output, StageKind::Trim)?;
        Ok(request.output)
    }
}
