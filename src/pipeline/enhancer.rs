//! 外部畫格增強工具轉接
//!
//! 增強工具只需遵守目錄契約：輸入目錄中 N 張依序的畫格，輸出目錄中產生
//! N 張同索引的畫格，檔名為輸入檔名加上固定後綴。

use super::error::{PipelineError, Result};
use super::frames::{FrameSet, enhanced_file_name};
use super::stage::{Stage, StageContext, StageKind};
use crate::tools::ToolCommand;
use log::info;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// 目錄進、目錄出的批次影像轉換
pub trait BatchTransform: Send + Sync {
    fn name(&self) -> &str;

    /// 輸出檔名附加的後綴
    fn output_suffix(&self) -> &str;

    fn apply(&self, input: &Path, output: &Path, scale: u32, ctx: &StageContext) -> Result<()>;
}

/// 以命令列樣板呼叫外部程式（例如 Real-ESRGAN）
///
/// 樣板中的 `{input}`、`{output}`、`{scale}`、`{suffix}` 會被替換。
#[derive(Debug, Clone)]
pub struct SubprocessEnhancer {
    program: PathBuf,
    args: Vec<String>,
    suffix: String,
}

impl SubprocessEnhancer {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, suffix: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args,
            suffix: suffix.into(),
        }
    }

    /// 由以空白分隔的命令列建立，第一個字為程式
    pub fn from_command_line(command: &str, suffix: impl Into<String>) -> Result<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words
            .next()
            .ok_or_else(|| PipelineError::InvalidJob("增強命令不可為空".to_string()))?;
        Ok(Self::new(program, words.collect(), suffix))
    }

    fn render_args(&self, input: &Path, output: &Path, scale: u32) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        let scale = scale.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{scale}", &scale)
                    .replace("{suffix}", &self.suffix)
            })
            .collect()
    }
}

impl BatchTransform for SubprocessEnhancer {
    fn name(&self) -> &str {
        "subprocess"
    }

    fn output_suffix(&self) -> &str {
        &self.suffix
    }

    fn apply(&self, input: &Path, output: &Path, scale: u32, ctx: &StageContext) -> Result<()> {
        let mut cmd = ToolCommand::new(&self.program, StageKind::Enhance);
        cmd.args(self.render_args(input, output, scale));
        cmd.execute(ctx)?;
        Ok(())
    }
}

/// 不做任何轉換，只依命名規則複製畫格
#[derive(Debug, Clone)]
pub struct PassthroughEnhancer {
    suffix: String,
}

impl PassthroughEnhancer {
    #[must_use]
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }
}

impl BatchTransform for PassthroughEnhancer {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn output_suffix(&self) -> &str {
        &self.suffix
    }

    fn apply(&self, input: &Path, output: &Path, _scale: u32, ctx: &StageContext) -> Result<()> {
        let frames = FrameSet::scan(input, None, StageKind::Enhance)?;
        (0..frames.count).into_par_iter().try_for_each(|i| -> Result<()> {
            ctx.check_cancelled(StageKind::Enhance)?;
            fs::copy(
                frames.dir.join(frames.file_name(i)),
                output.join(enhanced_file_name(i, &self.suffix)),
            )?;
            Ok(())
        })
    }
}

/// 增強階段的輸入
#[derive(Debug, Clone)]
pub struct EnhanceRequest {
    pub frames: FrameSet,
    pub output_dir: PathBuf,
    pub scale: u32,
}

/// 將任一 [`BatchTransform`] 包裝成增強階段，並檢查輸出數量與命名
pub struct FrameEnhancer {
    transform: Box<dyn BatchTransform>,
}

impl FrameEnhancer {
    #[must_use]
    pub fn new(transform: Box<dyn BatchTransform>) -> Self {
        Self { transform }
    }
}

impl Stage for FrameEnhancer {
    type Input = EnhanceRequest;
    type Output = FrameSet;

    fn kind(&self) -> StageKind {
        StageKind::Enhance
    }

    fn run(&self, request: EnhanceRequest, ctx: &StageContext) -> Result<FrameSet> {
        fs::create_dir_all(&request.output_dir).map_err(|source| {
            PipelineError::DirectoryCreation {
                path: request.output_dir.clone(),
                source,
            }
        })?;

        info!(
            "使用 {} 增強 {} 張畫格（x{}）",
            self.transform.name(),
            request.frames.count,
            request.scale
        );
        self.transform
            .apply(&request.frames.dir, &request.output_dir, request.scale, ctx)?;

        let suffix = self.transform.output_suffix();
        let enhanced = FrameSet::scan(&request.output_dir, Some(suffix), StageKind::Enhance)?;
        if enhanced.count != request.frames.count {
            return Err(PipelineError::FrameCountMismatch {
                stage: StageKind::Enhance,
                expected: request.frames.count,
                actual: enhanced.count,
            });
        }
        Ok(enhanced)
    }
}
