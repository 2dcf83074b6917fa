use crate::pipeline::{PipelineError, Result, StageContext, StageKind, StreamKind};
use crate::tools::ToolCommand;
use serde::Deserialize;
use std::path::Path;

/// 幀率：保留 ffprobe 的原始分數字串，供 ffmpeg 以精確值重建影片
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRate {
    pub raw: String,
    pub fps: f64,
}

impl FrameRate {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        parse_frame_rate(raw).map(|fps| Self {
            raw: raw.trim().to_string(),
            fps,
        })
    }
}

/// 由裁切後片段查詢出的唯讀影片屬性
#[derive(Debug, Clone)]
pub struct VideoProperties {
    pub frame_rate: FrameRate,
    pub codec: String,
    pub pix_fmt: String,
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub audio_codec: Option<String>,
}

impl VideoProperties {
    #[must_use]
    pub const fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }

    /// 依長度與幀率推算的畫格數
    #[must_use]
    pub fn expected_frame_count(&self) -> usize {
        (self.duration_seconds * self.frame_rate.fps).round().max(0.0) as usize
    }
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FormatInfo>,
    streams: Option<Vec<StreamInfo>>,
}

#[derive(Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    codec_name: Option<String>,
    pix_fmt: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

/// 使用 ffprobe 取得影片屬性
pub fn probe_video_properties(
    ffprobe: &Path,
    path: &Path,
    ctx: &StageContext,
) -> Result<VideoProperties> {
    let mut cmd = ToolCommand::new(ffprobe, StageKind::Probe);
    cmd.args([
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
    ])
    .arg(path);

    let output = cmd.execute(ctx)?;
    parse_ffprobe_json(&output.stdout, path)
}

/// 解析 ffprobe 的 JSON 輸出
pub fn parse_ffprobe_json(json: &str, path: &Path) -> Result<VideoProperties> {
    let probe: FfprobeOutput = serde_json::from_str(json).map_err(|e| PipelineError::Probe {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let probe_error = |message: &str| PipelineError::Probe {
        path: path.to_path_buf(),
        message: message.to_string(),
    };

    let streams = probe.streams.unwrap_or_default();

    // 找到第一個視訊串流
    let video_stream = streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| PipelineError::MissingStream {
            stage: StageKind::Probe,
            kind: StreamKind::Video,
            path: path.to_path_buf(),
        })?;

    let audio_codec = streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|s| s.codec_name.clone().unwrap_or_else(|| "unknown".to_string()));

    let frame_rate = video_stream
        .r_frame_rate
        .as_deref()
        .and_then(FrameRate::parse)
        .ok_or_else(|| probe_error("無法取得幀率"))?;

    // 取得影片長度（優先從 format，其次從 stream）
    let duration_seconds = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .or(video_stream.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| probe_error("無法取得影片長度"))?;

    Ok(VideoProperties {
        frame_rate,
        codec: video_stream
            .codec_name
            .clone()
            .ok_or_else(|| probe_error("無法取得視訊編碼"))?,
        pix_fmt: video_stream
            .pix_fmt
            .clone()
            .ok_or_else(|| probe_error("無法取得像素格式"))?,
        duration_seconds,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        audio_codec,
    })
}

/// 解析幀率字串（例如 "30/1" 或 "30000/1001"）
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let rate = rate.trim();
    if let Some((num_str, den_str)) = rate.split_once('/') {
        let num: f64 = num_str.parse().ok()?;
        let den: f64 = den_str.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate.parse::<f64>().ok().filter(|fps| *fps > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"codec_type": "video", "codec_name": "h264", "pix_fmt": "yuv420p",
             "width": 1920, "height": 1080, "r_frame_rate": "30000/1001"},
            {"codec_type": "audio", "codec_name": "aac"}
        ],
        "format": {"duration": "10.010000"}
    }"#;

    #[test]
    fn test_parse_frame_rate_fraction() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("24/1").unwrap() - 24.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_frame_rate_decimal() {
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("60").unwrap() - 60.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_frame_rate_invalid() {
        assert!(parse_frame_rate("invalid").is_none());
        assert!(parse_frame_rate("30/0").is_none());
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_ffprobe_json() {
        let props = parse_ffprobe_json(SAMPLE, Path::new("clip.mp4")).unwrap();
        assert_eq!(props.codec, "h264");
        assert_eq!(props.pix_fmt, "yuv420p");
        assert_eq!(props.frame_rate.raw, "30000/1001");
        assert_eq!(props.audio_codec.as_deref(), Some("aac"));
        assert!(props.has_audio());
        assert_eq!(props.expected_frame_count(), 300);
    }

    #[test]
    fn test_parse_ffprobe_json_without_audio() {
        let json = r#"{"streams": [{"codec_type": "video", "codec_name": "h264",
            "pix_fmt": "yuv420p", "r_frame_rate": "25/1", "duration": "4.0"}]}"#;
        let props = parse_ffprobe_json(json, Path::new("silent.mp4")).unwrap();
        assert!(!props.has_audio());
        assert_eq!(props.expected_frame_count(), 100);
    }

    #[test]
    fn test_parse_ffprobe_json_without_video() {
        let json = r#"{"streams": [{"codec_type": "audio", "codec_name": "aac"}],
            "format": {"duration": "3.0"}}"#;
        let err = parse_ffprobe_json(json, Path::new("audio.m4a")).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingStream {
                kind: StreamKind::Video,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_ffprobe_json_garbage() {
        let err = parse_ffprobe_json("not json", Path::new("x.mp4")).unwrap_err();
        assert!(matches!(err, PipelineError::Probe { .. }));
    }
}
