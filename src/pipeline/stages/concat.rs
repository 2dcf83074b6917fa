use super::{ffmpeg_command, require_output};
use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::stage::{Stage, StageContext, StageKind};
use crate::tools::move_file;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ConcatRequest {
    /// 依宣告順序排列的區段成品
    pub segments: Vec<PathBuf>,
    pub manifest: PathBuf,
    pub output: PathBuf,
}

/// concat demuxer 清單的一行，單引號跳脫為 `'\''`
#[must_use]
pub fn manifest_line(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', r"'\''");
    format!("file '{escaped}'")
}

/// 合併所有區段；只有一個區段時直接移動，不重新編碼
#[derive(Debug, Clone)]
pub struct SegmentConcatenator {
    ffmpeg: PathBuf,
}

impl SegmentConcatenator {
    #[must_use]
    pub fn new(ffmpeg: &Path) -> Self {
        Self {
            ffmpeg: ffmpeg.to_path_buf(),
        }
    }
}

impl Stage for SegmentConcatenator {
    type Input = ConcatRequest;
    type Output = PathBuf;

    fn kind(&self) -> StageKind {
        StageKind::Concat
    }

    fn run(&self, request: ConcatRequest, ctx: &StageContext) -> Result<PathBuf> {
        match request.segments.as_slice() {
            [] => Err(PipelineError::external(StageKind::Concat, "沒有可合併的區段")),
            [only] => {
                info!("單一區段，移動至 {}", request.output.display());
                Ok(move_file(only, &request.output)?)
            }
            segments => {
                let manifest: String = segments
                    .iter()
                    .map(|p| manifest_line(p) + "\n")
                    .collect();
                fs::write(&request.manifest, manifest)?;

                let mut cmd = ffmpeg_command(&self.ffmpeg, StageKind::Concat);
                cmd.args(["-f", "concat", "-safe", "0", "-i"])
                    .arg(&request.manifest)
                    .args(["-c", "copy", "-y"])
                    .arg(&request.output);
                cmd.execute(ctx)?;
                require_output(&request.output, StageKind::Concat)?;
                info!("已合併 {} 個區段至 {}", segments.len(), request.output.display());
                Ok(request.output)
            }
        }
    }
}
