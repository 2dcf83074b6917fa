use crate::pipeline::error::Result;
use crate::pipeline::stage::{Stage, StageContext, StageKind};
use crate::tools::{VideoProperties, probe_video_properties};
use log::debug;
use std::path::{Path, PathBuf};

/// 查詢裁切後片段的影片屬性，每個區段重新查詢
#[derive(Debug, Clone)]
pub struct ProbeStage {
    ffprobe: PathBuf,
}

impl ProbeStage {
    #[must_use]
    pub fn new(ffprobe: &Path) -> Self {
        Self {
            ffprobe: ffprobe.to_path_buf(),
        }
    }
}

impl Stage for ProbeStage {
    type Input = PathBuf;
    type Output = VideoProperties;

    fn kind(&self) -> StageKind {
        StageKind::Probe
    }

    fn run(&self, clip: PathBuf, ctx: &StageContext) -> Result<VideoProperties> {
        let properties = probe_video_properties(&self.ffprobe, &clip, ctx)?;
        debug!(
            "{}: {} {} {}fps {:.3}s 音訊={}",
            clip.display(),
            properties.codec,
            properties.pix_fmt,
            properties.frame_rate.raw,
            properties.duration_seconds,
            properties.audio_codec.as_deref().unwrap_or("無")
        );
        Ok(properties)
    }
}
