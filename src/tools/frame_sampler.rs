use crate::pipeline::{PipelineError, Result, StageContext, StageKind};
use crate::tools::{Timecode, ToolCommand};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 固定間隔取樣時，是否略過第 0 個時間點
///
/// 舊版流程一律略過第一個間隔（`intervals[1:]`），這裡保留為可設定的行為。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplePolicy {
    #[default]
    SkipFirst,
    IncludeFirst,
}

/// 從 0 秒開始，每 `interval_secs` 秒取一個時間點（不含影片結尾）
#[must_use]
pub fn sample_timestamps(
    duration_seconds: f64,
    interval_secs: u64,
    policy: SamplePolicy,
) -> Vec<Timecode> {
    if interval_secs == 0 || duration_seconds <= 0.0 {
        return Vec::new();
    }

    let whole_seconds = duration_seconds.trunc() as u64;
    let skip = match policy {
        SamplePolicy::SkipFirst => 1,
        SamplePolicy::IncludeFirst => 0,
    };

    (0..whole_seconds)
        .step_by(interval_secs as usize)
        .skip(skip)
        .map(Timecode::from_secs)
        .collect()
}

/// 擷取單一畫格為 PNG
///
/// `width` 為 `None` 時保留原始解析度；否則依寬度等比例縮放。
pub fn extract_frame_at(
    ffmpeg: &Path,
    video_path: &Path,
    timestamp: Timecode,
    width: Option<u32>,
    output_path: &Path,
    ctx: &StageContext,
) -> Result<()> {
    let mut cmd = ToolCommand::new(ffmpeg, StageKind::Decompose);
    cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error"])
        .arg("-ss")
        .arg(timestamp.to_string())
        .arg("-i")
        .arg(video_path)
        .args(["-frames:v", "1"]);

    if let Some(width) = width {
        cmd.arg("-vf").arg(format!("scale={width}:-1"));
    }

    cmd.args(["-vcodec", "png", "-y"]).arg(output_path);
    cmd.execute(ctx)?;

    if !output_path.exists() {
        return Err(PipelineError::external(
            StageKind::Decompose,
            format!("畫格未建立: {}", output_path.display()),
        ));
    }

    Ok(())
}
