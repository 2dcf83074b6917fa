use super::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 管線階段種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Trim,
    Probe,
    Decompose,
    Enhance,
    Recompose,
    Remux,
    Concat,
}

impl StageKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trim => "trim",
            Self::Probe => "probe",
            Self::Decompose => "decompose",
            Self::Enhance => "enhance",
            Self::Recompose => "recompose",
            Self::Remux => "remux",
            Self::Concat => "concat",
        }
    }

    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Trim => 10,
            Self::Probe => 11,
            Self::Decompose => 12,
            Self::Enhance => 13,
            Self::Recompose => 14,
            Self::Remux => 15,
            Self::Concat => 16,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 每次階段執行共用的環境：中斷旗標與逾時設定
#[derive(Debug, Clone, Default)]
pub struct StageContext {
    cancel: Arc<AtomicBool>,
    timeout: Option<Duration>,
}

impl StageContext {
    #[must_use]
    pub const fn new(cancel: Arc<AtomicBool>) -> Self {
        Self {
            cancel,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// 已收到中斷信號時回傳 `Cancelled`
    pub fn check_cancelled(&self, stage: StageKind) -> Result<()> {
        if self.is_cancelled() {
            return Err(PipelineError::Cancelled { stage });
        }
        Ok(())
    }
}

/// 管線中的單一步驟
///
/// 每個階段只消費上一個階段的輸出，並以阻塞方式執行完畢才返回。
pub trait Stage {
    type Input;
    type Output;

    fn kind(&self) -> StageKind;

    fn run(&self, input: Self::Input, ctx: &StageContext) -> Result<Self::Output>;
}

pub type BoxedStage<I, O> = Box<dyn Stage<Input = I, Output = O>>;
