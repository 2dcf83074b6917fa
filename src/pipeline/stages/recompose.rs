use super::{ffmpeg_command, require_output};
use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::frames::FrameSet;
use crate::pipeline::job::{FRAME_COUNT_TOLERANCE, FrameCountPolicy};
use crate::pipeline::stage::{Stage, StageContext, StageKind};
use crate::tools::{VideoProperties, format_seconds};
use log::warn;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RecomposeRequest {
    pub frames: FrameSet,
    pub properties: VideoProperties,
    pub output: PathBuf,
}

/// 以原片段的幀率、長度與像素格式，把增強後的畫格組回只含視訊的影片
#[derive(Debug, Clone)]
pub struct FrameRecomposer {
    ffmpeg: PathBuf,
    video_encoder: Option<String>,
    frame_count_policy: FrameCountPolicy,
}

impl FrameRecomposer {
    #[must_use]
    pub fn new(
        ffmpeg: &Path,
        video_encoder: Option<String>,
        frame_count_policy: FrameCountPolicy,
    ) -> Self {
        Self {
            ffmpeg: ffmpeg.to_path_buf(),
            video_encoder,
            frame_count_policy,
        }
    }

    fn check_frame_count(&self, frames: &FrameSet, properties: &VideoProperties) -> Result<()> {
        let expected = properties.expected_frame_count();
        if frames.count.abs_diff(expected) <= FRAME_COUNT_TOLERANCE {
            return Ok(());
        }
        match self.frame_count_policy {
            FrameCountPolicy::Ignore => Ok(()),
            FrameCountPolicy::Warn => {
                warn!(
                    "{} 有 {} 張畫格，依長度與幀率應為 {expected} 張",
                    frames.dir.display(),
                    frames.count
                );
                Ok(())
            }
            FrameCountPolicy::Enforce => Err(PipelineError::FrameCountMismatch {
                stage: StageKind::Recompose,
                expected,
                actual: frames.count,
            }),
        }
    }
}

impl Stage for FrameRecomposer {
    type Input = RecomposeRequest;
    type Output = PathBuf;

    fn kind(&self) -> StageKind {
        StageKind::Recompose
    }

    fn run(&self, request: RecomposeRequest, ctx: &StageContext) -> Result<PathBuf> {
        let RecomposeRequest {
            frames,
            properties,
            output,
        } = request;
        self.check_frame_count(&frames, &properties)?;

        let encoder = self
            .video_encoder
            .as_deref()
            .unwrap_or(properties.codec.as_str());

        let mut cmd = ffmpeg_command(&self.ffmpeg, StageKind::Recompose);
        cmd.arg("-framerate")
            .arg(&properties.frame_rate.raw)
            .args(["-start_number", "0", "-i"])
            .arg(frames.pattern())
            .arg("-t")
            .arg(format_seconds(properties.duration_seconds))
            .arg("-c:v")
            .arg(encoder)
            .arg("-pix_fmt")
            .arg(&properties.pix_fmt)
            .args(["-an", "-y"])
            .arg(&output);

        cmd.execute(ctx)?;
        require_output(&output, StageKind::Recompose)?;
        Ok(output)
    }
}
