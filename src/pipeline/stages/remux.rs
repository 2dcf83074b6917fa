use super::{ffmpeg_command, require_output};
use crate::pipeline::error::{PipelineError, Result, StreamKind};
use crate::pipeline::job::MissingAudioPolicy;
use crate::pipeline::stage::{Stage, StageContext, StageKind};
use crate::tools::ToolCommand;
use log::warn;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RemuxRequest {
    /// 重組後只含視訊的影片
    pub video: PathBuf,
    /// 音訊來源（裁切後片段）
    pub audio_source: PathBuf,
    pub output: PathBuf,
    pub has_audio: bool,
}

/// 以串流複製合併重組視訊與原片段音訊
#[derive(Debug, Clone)]
pub struct AudioRemuxer {
    ffmpeg: PathBuf,
    missing_audio: MissingAudioPolicy,
}

impl AudioRemuxer {
    #[must_use]
    pub fn new(ffmpeg: &Path, missing_audio: MissingAudioPolicy) -> Self {
        Self {
            ffmpeg: ffmpeg.to_path_buf(),
            missing_audio,
        }
    }

    /// 依音訊有無與政策組出 ffmpeg 命令
    fn command(&self, request: &RemuxRequest) -> Result<ToolCommand> {
        let mut cmd = ffmpeg_command(&self.ffmpeg, StageKind::Remux);

        if request.has_audio {
            cmd.arg("-i")
                .arg(&request.video)
                .arg("-i")
                .arg(&request.audio_source)
                .args(["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "copy"]);
        } else {
            match self.missing_audio {
                MissingAudioPolicy::Abort => {
                    return Err(PipelineError::MissingStream {
                        stage: StageKind::Remux,
                        kind: StreamKind::Audio,
                        path: request.audio_source.clone(),
                    });
                }
                MissingAudioPolicy::VideoOnly => {
                    warn!(
                        "{} 沒有音訊，輸出只含視訊",
                        request.audio_source.display()
                    );
                    cmd.arg("-i")
                        .arg(&request.video)
                        .args(["-map", "0:v:0", "-c", "copy"]);
                }
            }
        }

        cmd.arg("-y").arg(&request.output);
        Ok(cmd)
    }
}

impl Stage for AudioRemuxer {
    type Input = RemuxRequest;
    type Output = PathBuf;

    fn kind(&self) -> StageKind {
        StageKind::Remux
    }

    fn run(&self, request: RemuxRequest, ctx: &StageContext) -> Result<PathBuf> {
        self.command(&request)?.execute(ctx)?;
        require_output(&request.output, StageKind::Remux)?;
        Ok(request.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn request(has_audio: bool) -> RemuxRequest {
        RemuxRequest {
            video: PathBuf::from("/w/enhanced_video_0.mp4"),
            audio_source: PathBuf::from("/w/trim_0.mp4"),
            output: PathBuf::from("/w/a_0.mp4"),
            has_audio,
        }
    }

    #[test]
    fn test_missing_audio_aborts_by_default() {
        let stage = AudioRemuxer::new(Path::new("ffmpeg"), MissingAudioPolicy::default());
        let err = stage
            .run(
                request(false),
                &StageContext::new(Arc::new(AtomicBool::new(false))),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingStream {
                stage: StageKind::Remux,
                kind: StreamKind::Audio,
                ..
            }
        ));
    }

    #[test]
    fn test_remux_maps_video_and_audio() {
        let stage = AudioRemuxer::new(Path::new("ffmpeg"), MissingAudioPolicy::Abort);
        let line = stage.command(&request(true)).unwrap().command_line();
        assert_eq!(
            line,
            "ffmpeg -hide_banner -nostdin -loglevel error \
             -i /w/enhanced_video_0.mp4 -i /w/trim_0.mp4 \
             -map 0:v:0 -map 1:a:0 -c:v copy -c:a copy -y /w/a_0.mp4"
        );
    }

    #[test]
    fn test_video_only_policy_drops_audio_input() {
        let stage = AudioRemuxer::new(Path::new("ffmpeg"), MissingAudioPolicy::VideoOnly);
        let line = stage.command(&request(false)).unwrap().command_line();
        assert_eq!(
            line,
            "ffmpeg -hide_banner -nostdin -loglevel error \
             -i /w/enhanced_video_0.mp4 -map 0:v:0 -c copy -y /w/a_0.mp4"
        );
        assert!(!line.contains("trim_0.mp4"));
    }
}
