//! 影片超解析度管線的排程與工作目錄生命週期

mod enhancer;
mod error;
mod frames;
mod job;
mod orchestrator;
mod segment;
mod stage;
pub mod stages;
mod workspace;

pub use enhancer::{
    BatchTransform, EnhanceRequest, FrameEnhancer, PassthroughEnhancer, SubprocessEnhancer,
};
pub use error::{PipelineError, Result, StreamKind};
pub use frames::{
    FRAME_EXTENSION, FRAME_PREFIX, FrameSet, enhanced_file_name, frame_file_name,
    parse_frame_index, sequence_pattern,
};
pub use job::{FRAME_COUNT_TOLERANCE, FrameCountPolicy, MissingAudioPolicy, PipelineJob};
pub use orchestrator::{
    JobReport, JobState, NoopObserver, Orchestrator, PipelineObserver, SegmentRecord,
};
pub use segment::{SegmentArtifacts, SegmentState, TimeSegment};
pub use stage::{BoxedStage, Stage, StageContext, StageKind};
pub use stages::StageSet;
pub use workspace::{CleanupPolicy, JobId, JobNaming, Workspace, remove_dir};
