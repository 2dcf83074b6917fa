use super::ffmpeg_command;
use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::frames::{FrameSet, sequence_pattern};
use crate::pipeline::stage::{Stage, StageContext, StageKind};
use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DecomposeRequest {
    pub clip: PathBuf,
    pub width: u32,
    /// 不可事先存在
    pub output_dir: PathBuf,
}

/// 將片段輸出成依序編號的 PNG 畫格，高度依比例自動計算
#[derive(Debug, Clone)]
pub struct FrameDecomposer {
    ffmpeg: PathBuf,
}

impl FrameDecomposer {
    #[must_use]
    pub fn new(ffmpeg: &Path) -> Self {
        Self {
            ffmpeg: ffmpeg.to_path_buf(),
        }
    }
}

impl Stage for FrameDecomposer {
    type Input = DecomposeRequest;
    type Output = FrameSet;

    fn kind(&self) -> StageKind {
        StageKind::Decompose
    }

    fn run(&self, request: DecomposeRequest, ctx: &StageContext) -> Result<FrameSet> {
        let dir = &request.output_dir;
        fs::create_dir(dir).map_err(|source| {
            if source.kind() == io::ErrorKind::AlreadyExists {
                PipelineError::DirectoryConflict { path: dir.clone() }
            } else {
                PipelineError::DirectoryCreation {
                    path: dir.clone(),
                    source,
                }
            }
        })?;

        let mut cmd = ffmpeg_command(&self.ffmpeg, StageKind::Decompose);
        cmd.arg("-i")
            .arg(&request.clip)
            .arg("-vf")
            .arg(format!("scale={}:-1", request.width))
            .args(["-vcodec", "png", "-start_number", "0"])
            .arg(dir.join(sequence_pattern(None)));
        cmd.execute(ctx)?;

        let frames = FrameSet::scan(dir, None, StageKind::Decompose)?;
        if frames.count == 0 {
            return Err(PipelineError::external(
                StageKind::Decompose,
                format!("{} 沒有輸出任何畫格", request.clip.display()),
            ));
        }
        info!("已拆解 {} 張畫格至 {}", frames.count, dir.display());
        Ok(frames)
    }
}
