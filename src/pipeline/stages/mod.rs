//! ffmpeg 實作的管線階段
//!
//! 每個階段都是 [`Stage`] 的一個實作；[`StageSet`] 把整條管線需要的階段
//! 收在一起，測試時可逐一替換成假的實作。

mod concat;
mod decompose;
mod extract;
mod probe;
mod recompose;
mod remux;

pub use concat::{ConcatRequest, SegmentConcatenator, manifest_line};
pub use decompose::{DecomposeRequest, FrameDecomposer};
pub use extract::{SegmentExtractor, TrimRequest};
pub use probe::ProbeStage;
pub use recompose::{FrameRecomposer, RecomposeRequest};
pub use remux::{AudioRemuxer, RemuxRequest};

use super::enhancer::{
    BatchTransform, EnhanceRequest, FrameEnhancer, PassthroughEnhancer, SubprocessEnhancer,
};
use super::error::{PipelineError, Result};
use super::frames::FrameSet;
use super::stage::{BoxedStage, StageKind};
use crate::config::{Config, EnhancerKind};
use crate::tools::{ToolCommand, VideoProperties};
use std::path::{Path, PathBuf};

/// 所有 ffmpeg 呼叫共用的前置參數
pub(crate) fn ffmpeg_command(ffmpeg: &Path, stage: StageKind) -> ToolCommand {
    let mut cmd = ToolCommand::new(ffmpeg, stage);
    cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error"]);
    cmd
}

/// 確認外部工具確實產生了輸出檔
pub(crate) fn require_output(path: &Path, stage: StageKind) -> Result<()> {
    let produced = path.metadata().is_ok_and(|m| m.is_file() && m.len() > 0);
    if !produced {
        return Err(PipelineError::external(
            stage,
            format!("未產生輸出檔: {}", path.display()),
        ));
    }
    Ok(())
}

/// 整條管線的階段集合
pub struct StageSet {
    pub trim: BoxedStage<TrimRequest, PathBuf>,
    pub probe: BoxedStage<PathBuf, VideoProperties>,
    pub decompose: BoxedStage<DecomposeRequest, FrameSet>,
    pub enhance: BoxedStage<EnhanceRequest, FrameSet>,
    pub recompose: BoxedStage<RecomposeRequest, PathBuf>,
    pub remux: BoxedStage<RemuxRequest, PathBuf>,
    pub concat: BoxedStage<ConcatRequest, PathBuf>,
}

impl StageSet {
    /// 以 ffmpeg / ffprobe 與設定中的增強工具建立完整階段集合
    pub fn ffmpeg(config: &Config) -> Result<Self> {
        let ff = &config.ffmpeg;
        let upscale = &config.upscale;

        Ok(Self {
            trim: Box::new(SegmentExtractor::new(
                &ff.ffmpeg_path,
                ff.video_encoder.clone(),
            )),
            probe: Box::new(ProbeStage::new(&ff.ffprobe_path)),
            decompose: Box::new(FrameDecomposer::new(&ff.ffmpeg_path)),
            enhance: Box::new(FrameEnhancer::new(build_transform(config)?)),
            recompose: Box::new(FrameRecomposer::new(
                &ff.ffmpeg_path,
                ff.video_encoder.clone(),
                upscale.frame_count_policy,
            )),
            remux: Box::new(AudioRemuxer::new(&ff.ffmpeg_path, upscale.missing_audio)),
            concat: Box::new(SegmentConcatenator::new(&ff.ffmpeg_path)),
        })
    }
}

/// 依設定建立增強工具
pub fn build_transform(config: &Config) -> Result<Box<dyn BatchTransform>> {
    let enhancer = &config.enhancer;
    Ok(match enhancer.kind {
        EnhancerKind::Subprocess => Box::new(SubprocessEnhancer::from_command_line(
            &enhancer.command,
            enhancer.output_suffix.clone(),
        )?),
        EnhancerKind::Passthrough => {
            Box::new(PassthroughEnhancer::new(enhancer.output_suffix.clone()))
        }
    })
}
