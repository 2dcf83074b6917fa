use crate::pipeline::{self, FrameCountPolicy, JobId, JobNaming, MissingAudioPolicy};
use crate::tools::SamplePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonConfig {
    pub input_base_path: PathBuf,
    pub input_file: String,
    /// 工作目錄的上層目錄
    pub output_base_path: PathBuf,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            input_base_path: PathBuf::from("."),
            input_file: "385174.mp4".to_string(),
            output_base_path: PathBuf::from("."),
        }
    }
}

impl CommonConfig {
    #[must_use]
    pub fn input_path(&self) -> PathBuf {
        self.input_base_path.join(&self.input_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpscaleConfig {
    /// 未設定時沿用 `common.input_file`
    pub input_file: Option<String>,
    pub time_segments: Vec<(String, String)>,
    pub upscale_rate: u32,
    pub base_width: u32,
    pub remove_tmp_flag: bool,
    pub missing_audio: MissingAudioPolicy,
    pub frame_count_policy: FrameCountPolicy,
    pub overwrite_output: bool,
}

impl Default for UpscaleConfig {
    fn default() -> Self {
        Self {
            input_file: None,
            time_segments: vec![("00:10:07".to_string(), "00:36:16".to_string())],
            upscale_rate: 4,
            base_width: 1280,
            remove_tmp_flag: false,
            missing_audio: MissingAudioPolicy::default(),
            frame_count_policy: FrameCountPolicy::default(),
            overwrite_output: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub naming: JobNaming,
    /// 指定時優先於 `naming`，可用來接續同一個工作目錄
    pub job_id: Option<String>,
}

impl WorkspaceConfig {
    pub fn job_id(&self) -> pipeline::Result<JobId> {
        match &self.job_id {
            Some(id) => JobId::new(id.clone()),
            None => Ok(JobId::from_naming(self.naming)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// 未設定時裁切沿用 ffmpeg 預設編碼，重組沿用原片段的編碼
    pub video_encoder: Option<String>,
    /// 單次外部程式呼叫的逾時秒數
    pub timeout_secs: Option<u64>,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            video_encoder: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancerKind {
    #[default]
    Subprocess,
    Passthrough,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub kind: EnhancerKind,
    /// 可使用 `{input}` `{output}` `{scale}` `{suffix}`
    pub command: String,
    pub output_suffix: String,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            kind: EnhancerKind::Subprocess,
            command: "python Real-ESRGAN/inference_realesrgan.py -i {input} -o {output} \
                      -n realesr-general-x4v3 -g 0 -s {scale} -dn 0.1 --suffix {suffix}"
                .to_string(),
            output_suffix: "out".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub output_interval_sec: u64,
    pub upscale_rates: Vec<u32>,
    pub output_px_width: u32,
    pub sample_policy: SamplePolicy,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            output_interval_sec: 300,
            upscale_rates: vec![1, 2, 4],
            output_px_width: 1280,
            sample_policy: SamplePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameExtractConfig {
    pub input_video_path: Vec<PathBuf>,
    pub output_image_path: PathBuf,
    pub frame_extraction_interval: u64,
    pub sample_policy: SamplePolicy,
}

impl Default for FrameExtractConfig {
    fn default() -> Self {
        Self {
            input_video_path: Vec::new(),
            output_image_path: PathBuf::from("frames"),
            frame_extraction_interval: 30,
            sample_policy: SamplePolicy::IncludeFirst,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenLowScaleConfig {
    pub input_image_path: PathBuf,
    pub output_image_path: PathBuf,
    pub width_px: u32,
}

impl Default for GenLowScaleConfig {
    fn default() -> Self {
        Self {
            input_image_path: PathBuf::from("frames"),
            output_image_path: PathBuf::from("low_scale"),
            width_px: 480,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub common: CommonConfig,
    pub upscale: UpscaleConfig,
    pub workspace: WorkspaceConfig,
    pub ffmpeg: FfmpegConfig,
    pub enhancer: EnhancerConfig,
    pub check: CheckConfig,
    pub frame_extract: FrameExtractConfig,
    pub gen_low_scale: GenLowScaleConfig,
}

impl Config {
    /// 超解析度模式的來源影片
    #[must_use]
    pub fn upscale_source(&self) -> PathBuf {
        let file = self
            .upscale
            .input_file
            .as_deref()
            .unwrap_or(&self.common.input_file);
        self.common.input_base_path.join(file)
    }

    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.common.output_base_path
    }

    #[must_use]
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.ffmpeg.timeout_secs.map(Duration::from_secs)
    }
}
