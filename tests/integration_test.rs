//! 整合測試 - 以假的階段驗證排程與工作目錄行為
//!
//! 不需要 ffmpeg 或增強工具

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sr_movie::pipeline::stages::{
    AudioRemuxer, ConcatRequest, DecomposeRequest, RecomposeRequest, RemuxRequest,
    SegmentConcatenator, TrimRequest,
};
use sr_movie::pipeline::{
    CleanupPolicy, EnhanceRequest, FrameEnhancer, FrameSet, JobId, JobState, MissingAudioPolicy,
    Orchestrator, PassthroughEnhancer, PipelineError, PipelineJob, PipelineObserver,
    SegmentState, Stage, StageContext, StageKind, StageSet, StreamKind, TimeSegment, Workspace,
    frame_file_name,
};
use sr_movie::tools::{FrameRate, VideoProperties};

const FRAMES_PER_SEGMENT: usize = 3;

struct FakeTrim;

impl Stage for FakeTrim {
    type Input = TrimRequest;
    type Output = PathBuf;

    fn kind(&self) -> StageKind {
        StageKind::Trim
    }

    fn run(&self, request: TrimRequest, _: &StageContext) -> sr_movie::pipeline::Result<PathBuf> {
        fs::write(&request.output, format!("clip {}", request.segment))?;
        Ok(request.output)
    }
}

struct FakeProbe;

impl Stage for FakeProbe {
    type Input = PathBuf;
    type Output = VideoProperties;

    fn kind(&self) -> StageKind {
        StageKind::Probe
    }

    fn run(&self, _: PathBuf, _: &StageContext) -> sr_movie::pipeline::Result<VideoProperties> {
        Ok(VideoProperties {
            frame_rate: FrameRate::parse("3/1").unwrap(),
            codec: "h264".to_string(),
            pix_fmt: "yuv420p".to_string(),
            duration_seconds: 1.0,
            width: 320,
            height: 180,
            audio_codec: Some("aac".to_string()),
        })
    }
}

/// 沒有音軌的片段
struct SilentProbe;

impl Stage for SilentProbe {
    type Input = PathBuf;
    type Output = VideoProperties;

    fn kind(&self) -> StageKind {
        StageKind::Probe
    }

    fn run(&self, clip: PathBuf, ctx: &StageContext) -> sr_movie::pipeline::Result<VideoProperties> {
        let mut properties = FakeProbe.run(clip, ctx)?;
        properties.audio_codec = None;
        Ok(properties)
    }
}

struct FakeDecompose;

impl Stage for FakeDecompose {
    type Input = DecomposeRequest;
    type Output = FrameSet;

    fn kind(&self) -> StageKind {
        StageKind::Decompose
    }

    fn run(&self, request: DecomposeRequest, _: &StageContext) -> sr_movie::pipeline::Result<FrameSet> {
        fs::create_dir(&request.output_dir)?;
        for i in 0..FRAMES_PER_SEGMENT {
            fs::write(request.output_dir.join(frame_file_name(i)), format!("frame {i}"))?;
        }
        FrameSet::scan(&request.output_dir, None, StageKind::Decompose)
    }
}

/// 第 `fail_on` 次呼叫（1 起算）時失敗，其餘交給 passthrough
struct FlakyEnhance {
    inner: FrameEnhancer,
    calls: AtomicUsize,
    fail_on: Option<usize>,
}

impl Stage for FlakyEnhance {
    type Input = EnhanceRequest;
    type Output = FrameSet;

    fn kind(&self) -> StageKind {
        StageKind::Enhance
    }

    fn run(&self, request: EnhanceRequest, ctx: &StageContext) -> sr_movie::pipeline::Result<FrameSet> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(call) {
            return Err(PipelineError::external(StageKind::Enhance, "exit status: 1"));
        }
        self.inner.run(request, ctx)
    }
}

struct FakeRecompose;

impl Stage for FakeRecompose {
    type Input = RecomposeRequest;
    type Output = PathBuf;

    fn kind(&self) -> StageKind {
        StageKind::Recompose
    }

    fn run(&self, request: RecomposeRequest, _: &StageContext) -> sr_movie::pipeline::Result<PathBuf> {
        let mut video = Vec::new();
        for path in request.frames.paths() {
            video.extend(fs::read(path)?);
        }
        fs::write(&request.output, video)?;
        Ok(request.output)
    }
}

struct FakeRemux;

impl Stage for FakeRemux {
    type Input = RemuxRequest;
    type Output = PathBuf;

    fn kind(&self) -> StageKind {
        StageKind::Remux
    }

    fn run(&self, request: RemuxRequest, _: &StageContext) -> sr_movie::pipeline::Result<PathBuf> {
        fs::copy(&request.video, &request.output)?;
        Ok(request.output)
    }
}

/// 記錄收到的音訊旗標，只複製視訊
#[derive(Clone, Default)]
struct VideoOnlyRemux {
    has_audio: Arc<Mutex<Vec<bool>>>,
}

impl Stage for VideoOnlyRemux {
    type Input = RemuxRequest;
    type Output = PathBuf;

    fn kind(&self) -> StageKind {
        StageKind::Remux
    }

    fn run(&self, request: RemuxRequest, _: &StageContext) -> sr_movie::pipeline::Result<PathBuf> {
        self.has_audio.lock().unwrap().push(request.has_audio);
        fs::copy(&request.video, &request.output)?;
        Ok(request.output)
    }
}

/// 寫出結果後把工作目錄整個刪掉，讓之後的清理失敗
struct WorkspaceWipingConcat;

impl Stage for WorkspaceWipingConcat {
    type Input = ConcatRequest;
    type Output = PathBuf;

    fn kind(&self) -> StageKind {
        StageKind::Concat
    }

    fn run(&self, request: ConcatRequest, ctx: &StageContext) -> sr_movie::pipeline::Result<PathBuf> {
        let workspace = request.manifest.parent().unwrap().to_path_buf();
        let output = FakeConcat.run(request, ctx)?;
        fs::remove_dir_all(workspace)?;
        Ok(output)
    }
}

/// 依順序串接位元組
struct FakeConcat;

impl Stage for FakeConcat {
    type Input = ConcatRequest;
    type Output = PathBuf;

    fn kind(&self) -> StageKind {
        StageKind::Concat
    }

    fn run(&self, request: ConcatRequest, _: &StageContext) -> sr_movie::pipeline::Result<PathBuf> {
        let mut joined = Vec::new();
        for segment in &request.segments {
            joined.extend(fs::read(segment)?);
            joined.push(b'|');
        }
        fs::write(&request.output, joined)?;
        Ok(request.output)
    }
}

fn fake_stages(fail_enhance_on: Option<usize>, real_concat: bool) -> StageSet {
    StageSet {
        trim: Box::new(FakeTrim),
        probe: Box::new(FakeProbe),
        decompose: Box::new(FakeDecompose),
        enhance: Box::new(FlakyEnhance {
            inner: FrameEnhancer::new(Box::new(PassthroughEnhancer::new("out"))),
            calls: AtomicUsize::new(0),
            fail_on: fail_enhance_on,
        }),
        recompose: Box::new(FakeRecompose),
        remux: Box::new(FakeRemux),
        concat: if real_concat {
            Box::new(SegmentConcatenator::new(Path::new("nonexistent_ffmpeg_xyz")))
        } else {
            Box::new(FakeConcat)
        },
    }
}

#[derive(Clone, Default)]
struct RecordingObserver {
    segments: Arc<Mutex<Vec<(usize, SegmentState)>>>,
    jobs: Arc<Mutex<Vec<JobState>>>,
}

impl PipelineObserver for RecordingObserver {
    fn segment_state(&self, number: usize, _total: usize, state: SegmentState) {
        self.segments.lock().unwrap().push((number, state));
    }

    fn job_state(&self, state: JobState) {
        self.jobs.lock().unwrap().push(state);
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    source: PathBuf,
    root: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let videos = dir.path().join("videos");
    let root = dir.path().join("work");
    fs::create_dir(&videos).unwrap();
    fs::create_dir(&root).unwrap();
    let source = videos.join("385174.mp4");
    fs::write(&source, b"source video").unwrap();
    Fixture {
        _dir: dir,
        source,
        root,
    }
}

fn job(fx: &Fixture, segments: &[(&str, &str)], cleanup: CleanupPolicy) -> PipelineJob {
    PipelineJob {
        source: fx.source.clone(),
        segments: segments
            .iter()
            .map(|(s, e)| TimeSegment::parse(s, e).unwrap())
            .collect(),
        upscale: 4,
        base_width: 1280,
        cleanup,
        workspace_root: fx.root.clone(),
        job_id: JobId::new("job-1").unwrap(),
        overwrite_output: false,
    }
}

fn context() -> StageContext {
    StageContext::new(Arc::new(AtomicBool::new(false)))
}

/// 測試 1: 單一區段完整流程，輸出放在來源目錄
#[test]
fn test_single_segment_end_to_end_with_cleanup() {
    let fx = fixture();
    let job = job(&fx, &[("00:10:07", "00:36:16")], CleanupPolicy::Remove);
    let observer = RecordingObserver::default();

    let report = Orchestrator::new(job, fake_stages(None, true))
        .with_context(context())
        .with_observer(observer.clone())
        .run()
        .unwrap();

    let expected_output = fx.source.parent().unwrap().join("385174_upscaled.mp4");
    assert_eq!(report.output, expected_output);
    assert_eq!(
        fs::read_to_string(&expected_output).unwrap(),
        "frame 0frame 1frame 2"
    );
    assert_eq!(report.segments.len(), 1);
    assert_eq!(report.segments[0].frame_count, FRAMES_PER_SEGMENT);
    assert!(report.cleanup_warnings.is_empty());
    assert!(!report.workspace_dir.exists(), "清理政策啟用時應刪除工作目錄");

    let states: Vec<SegmentState> = observer
        .segments
        .lock()
        .unwrap()
        .iter()
        .map(|(_, s)| *s)
        .collect();
    assert_eq!(
        states,
        vec![
            SegmentState::Pending,
            SegmentState::Extracted,
            SegmentState::Decomposed,
            SegmentState::Enhanced,
            SegmentState::Recomposed,
            SegmentState::Remuxed,
            SegmentState::Finalized,
        ]
    );
    assert_eq!(
        *observer.jobs.lock().unwrap(),
        vec![JobState::Running, JobState::Concatenating, JobState::Complete]
    );

    println!("✓ 單一區段完整流程測試通過");
}

/// 測試 2: 清理政策停用時保留所有中繼產物
#[test]
fn test_keep_policy_preserves_workspace() {
    let fx = fixture();
    let job = job(&fx, &[("00:00:01", "00:00:02")], CleanupPolicy::Keep);

    let report = Orchestrator::new(job, fake_stages(None, true))
        .with_context(context())
        .run()
        .unwrap();

    let ws = &report.workspace_dir;
    assert!(ws.is_dir());
    assert!(ws.ends_with("job-1"));
    assert!(ws.join("trim_0.mp4").is_file());
    assert!(ws.join("resize_img_0").join("image_00000000.png").is_file());
    assert!(ws.join("upscale_img_0").join("image_00000002_out.png").is_file());
    assert!(ws.join("enhanced_video_0.mp4").is_file());
    // 單一區段的成品已移到輸出位置
    assert!(!ws.join("385174_0.mp4").exists());
    assert!(report.output.is_file());

    println!("✓ 保留工作目錄測試通過");
}

/// 測試 3: 第 2 / 3 個區段增強失敗
#[test]
fn test_enhance_failure_on_second_of_three_segments() {
    let fx = fixture();
    let job = job(
        &fx,
        &[
            ("00:00:00", "00:00:01"),
            ("00:00:01", "00:00:02"),
            ("00:00:02", "00:00:03"),
        ],
        CleanupPolicy::Remove,
    );
    let observer = RecordingObserver::default();

    let err = Orchestrator::new(job.clone(), fake_stages(Some(2), false))
        .with_context(context())
        .with_observer(observer.clone())
        .run()
        .unwrap_err();

    assert_eq!(err.segment_number(), Some(2));
    assert_eq!(err.stage(), Some(StageKind::Enhance));
    assert!(matches!(err.root(), PipelineError::ExternalTool { .. }));
    assert_eq!(err.exit_code(), StageKind::Enhance.exit_code());

    // 失敗時不論政策都保留工作目錄
    let ws = Workspace::path_for(&fx.root, &job.job_id);
    assert!(ws.join("385174_0.mp4").is_file(), "區段 1 的成品應保留");
    assert!(!ws.join("resize_img_0").exists(), "區段 1 的畫格已依政策刪除");
    assert!(ws.join("resize_img_1").is_dir(), "失敗區段的畫格保留供檢查");
    assert!(!ws.join("trim_2.mp4").exists());
    assert!(!job.output_path().exists());

    let segments = observer.segments.lock().unwrap();
    assert!(segments.iter().all(|(n, _)| *n != 3), "區段 3 不應開始");
    assert_eq!(segments.last(), Some(&(2, SegmentState::Failed)));
    assert!(segments.contains(&(1, SegmentState::Finalized)));
    assert_eq!(observer.jobs.lock().unwrap().last(), Some(&JobState::Failed));

    println!("✓ 區段失敗測試通過");
}

/// 測試 4: 以同一個工作識別碼重複取得工作目錄
#[test]
fn test_existing_workspace_is_reused() {
    let fx = fixture();
    let job = job(&fx, &[("00:00:00", "00:00:01")], CleanupPolicy::Keep);

    let first = Workspace::acquire(&fx.root, &job.job_id).unwrap();
    fs::write(first.join("notes.txt"), b"keep me").unwrap();

    let report = Orchestrator::new(job, fake_stages(None, true))
        .with_context(context())
        .run()
        .unwrap();

    assert_eq!(report.workspace_dir, first.dir());
    assert!(first.join("notes.txt").is_file());
    assert_eq!(fs::read_dir(&fx.root).unwrap().count(), 1);

    println!("✓ 工作目錄沿用測試通過");
}

/// 測試 5: 多個區段依宣告順序合併
#[test]
fn test_segments_concatenated_in_declaration_order() {
    let fx = fixture();
    let job = job(
        &fx,
        &[("00:00:05", "00:00:06"), ("00:00:01", "00:00:02")],
        CleanupPolicy::Keep,
    );

    let report = Orchestrator::new(job, fake_stages(None, false))
        .with_context(context())
        .run()
        .unwrap();

    assert_eq!(report.segments.len(), 2);
    assert_eq!(report.segments[0].segment.to_string(), "00:00:05 - 00:00:06");
    assert!(report.segments[0].final_segment.ends_with("385174_0.mp4"));
    assert!(report.segments[1].final_segment.ends_with("385174_1.mp4"));
    assert_eq!(
        fs::read_to_string(&report.output).unwrap(),
        "frame 0frame 1frame 2|frame 0frame 1frame 2|"
    );

    println!("✓ 多區段合併測試通過");
}

/// 測試 6: 輸出已存在時不開始工作
#[test]
fn test_existing_output_is_conflict() {
    let fx = fixture();
    let job = job(&fx, &[("00:00:00", "00:00:01")], CleanupPolicy::Keep);
    fs::write(job.output_path(), b"previous result").unwrap();

    let err = Orchestrator::new(job.clone(), fake_stages(None, true))
        .with_context(context())
        .run()
        .unwrap_err();

    assert!(matches!(err, PipelineError::OutputConflict { .. }));
    assert!(!Workspace::path_for(&fx.root, &job.job_id).exists());
    assert_eq!(fs::read(job.output_path()).unwrap(), b"previous result");

    println!("✓ 輸出衝突測試通過");
}

/// 測試 7: 收到中斷信號時停止
#[test]
fn test_cancelled_job_stops_before_first_stage() {
    let fx = fixture();
    let job = job(&fx, &[("00:00:00", "00:00:01")], CleanupPolicy::Remove);
    let ctx = StageContext::new(Arc::new(AtomicBool::new(true)));

    let err = Orchestrator::new(job.clone(), fake_stages(None, true))
        .with_context(ctx)
        .run()
        .unwrap_err();

    assert!(matches!(err.root(), PipelineError::Cancelled { .. }));
    assert_eq!(err.exit_code(), 130);
    assert!(!Workspace::path_for(&fx.root, &job.job_id).join("trim_0.mp4").exists());

    println!("✓ 中斷測試通過");
}

/// 測試 8: 清理失敗只產生警告，不影響成功結果
#[test]
fn test_cleanup_failure_is_reported_as_warning() {
    let fx = fixture();
    let job = job(
        &fx,
        &[("00:00:00", "00:00:01"), ("00:00:01", "00:00:02")],
        CleanupPolicy::Remove,
    );
    let observer = RecordingObserver::default();
    let mut stages = fake_stages(None, false);
    stages.concat = Box::new(WorkspaceWipingConcat);

    let report = Orchestrator::new(job, stages)
        .with_context(context())
        .with_observer(observer.clone())
        .run()
        .unwrap();

    assert!(report.output.is_file());
    assert_eq!(report.cleanup_warnings.len(), 1);
    assert!(
        report.cleanup_warnings[0].contains(&report.workspace_dir.display().to_string()),
        "{:?}",
        report.cleanup_warnings
    );
    assert_eq!(observer.jobs.lock().unwrap().last(), Some(&JobState::Complete));

    println!("✓ 清理失敗警告測試通過");
}

/// 測試 9: 片段沒有音訊時預設中止
#[test]
fn test_silent_clip_aborts_under_default_policy() {
    let fx = fixture();
    let job = job(&fx, &[("00:00:00", "00:00:01")], CleanupPolicy::Remove);
    let mut stages = fake_stages(None, true);
    stages.probe = Box::new(SilentProbe);
    stages.remux = Box::new(AudioRemuxer::new(
        Path::new("nonexistent_ffmpeg_xyz"),
        MissingAudioPolicy::Abort,
    ));

    let err = Orchestrator::new(job.clone(), stages)
        .with_context(context())
        .run()
        .unwrap_err();

    assert_eq!(err.segment_number(), Some(1));
    assert_eq!(err.stage(), Some(StageKind::Remux));
    assert!(matches!(
        err.root(),
        PipelineError::MissingStream {
            stage: StageKind::Remux,
            kind: StreamKind::Audio,
            ..
        }
    ));
    assert_eq!(err.exit_code(), 4);

    let ws = Workspace::path_for(&fx.root, &job.job_id);
    assert!(ws.join("enhanced_video_0.mp4").is_file(), "失敗時保留重組結果");
    assert!(!job.output_path().exists());

    println!("✓ 無音訊中止測試通過");
}

/// 測試 10: 片段沒有音訊時可改為只輸出視訊
#[test]
fn test_silent_clip_finalizes_video_only() {
    let fx = fixture();
    let job = job(&fx, &[("00:00:00", "00:00:01")], CleanupPolicy::Keep);
    let remux = VideoOnlyRemux::default();
    let observer = RecordingObserver::default();
    let mut stages = fake_stages(None, true);
    stages.probe = Box::new(SilentProbe);
    stages.remux = Box::new(remux.clone());

    let report = Orchestrator::new(job, stages)
        .with_context(context())
        .with_observer(observer.clone())
        .run()
        .unwrap();

    assert_eq!(*remux.has_audio.lock().unwrap(), vec![false]);
    assert_eq!(
        fs::read_to_string(&report.output).unwrap(),
        "frame 0frame 1frame 2"
    );
    assert!(
        observer
            .segments
            .lock()
            .unwrap()
            .contains(&(1, SegmentState::Finalized))
    );

    println!("✓ 只輸出視訊測試通過");
}
