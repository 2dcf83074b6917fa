use crate::pipeline::{JobState, PipelineObserver, SegmentState};
use indicatif::{ProgressBar, ProgressStyle};

/// 每個區段從 Pending 到 Finalized 共 6 次狀態轉換
const STEPS_PER_SEGMENT: u64 = 6;

/// 以進度條顯示區段狀態
pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    pub fn new(segments: usize) -> anyhow::Result<Self> {
        let bar = ProgressBar::new(segments as u64 * STEPS_PER_SEGMENT);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        Ok(Self { bar })
    }
}

impl PipelineObserver for ProgressObserver {
    fn segment_state(&self, number: usize, total: usize, state: SegmentState) {
        self.bar.set_message(format!("區段 {number}/{total}: {state}"));
        if state != SegmentState::Pending && state != SegmentState::Failed {
            self.bar.inc(1);
        }
    }

    fn job_state(&self, state: JobState) {
        match state {
            JobState::Running => {}
            JobState::Concatenating => self.bar.set_message("合併區段中..."),
            JobState::Complete => self.bar.finish_with_message("完成"),
            JobState::Failed => self.bar.abandon_with_message("失敗"),
        }
    }
}
