//! 阻塞式外部工具執行
//!
//! 以輪詢 `try_wait` 的方式等待子程序結束，期間檢查中斷信號與逾時。

use crate::pipeline::{PipelineError, Result, StageContext, StageKind};
use log::{debug, info, warn};
use std::ffi::{OsStr, OsString};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 錯誤訊息中保留的 stderr 行數
const STDERR_TAIL_LINES: usize = 20;

/// 子程序執行結果
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    stage: StageKind,
}

impl ToolCommand {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, stage: StageKind) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stage,
        }
    }

    pub fn arg(&mut self, arg: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub const fn stage(&self) -> StageKind {
        self.stage
    }

    /// 可讀的完整命令列（僅供紀錄）
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 執行命令並等待結束
    ///
    /// 非零結束碼回傳 `ExternalTool`；收到中斷信號時終止子程序並回傳
    /// `Cancelled`；超過 `ctx` 的逾時則回傳 `Timeout`。
    pub fn execute(&self, ctx: &StageContext) -> Result<ToolOutput> {
        ctx.check_cancelled(self.stage)?;
        info!("[{}] 執行: {}", self.stage, self.command_line());

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PipelineError::external(
                    self.stage,
                    format!("無法啟動 {}: {e}", self.program.display()),
                )
            })?;

        let stdout_reader = spawn_line_reader(child.stdout.take(), self.stage);
        let stderr_reader = spawn_line_reader(child.stderr.take(), self.stage);

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(PipelineError::external(
                        self.stage,
                        format!("無法檢查程序狀態: {e}"),
                    ));
                }
            }

            if ctx.is_cancelled() {
                warn!("[{}] 收到中斷信號，終止程序 [{}]", self.stage, child.id());
                let _ = child.kill();
                let _ = child.wait();
                return Err(PipelineError::Cancelled { stage: self.stage });
            }

            if let Some(limit) = ctx.timeout()
                && started.elapsed() >= limit
            {
                warn!("[{}] 執行逾時，終止程序 [{}]", self.stage, child.id());
                let _ = child.kill();
                let _ = child.wait();
                return Err(PipelineError::Timeout {
                    stage: self.stage,
                    after: limit,
                });
            }

            thread::sleep(POLL_INTERVAL);
        };

        let stdout = join_reader(stdout_reader);
        let stderr = join_reader(stderr_reader);

        // Ctrl-C 的 SIGINT 會送到整個程序群組，子程序可能先自行結束
        if !status.success() && ctx.is_cancelled() {
            warn!("[{}] 程序因中斷信號結束: {}", self.stage, status);
            return Err(PipelineError::Cancelled { stage: self.stage });
        }

        if !status.success() {
            return Err(PipelineError::external(
                self.stage,
                format!(
                    "{} 結束狀態 {}: {}",
                    self.program.display(),
                    status,
                    stderr_tail(&stderr)
                ),
            ));
        }

        debug!(
            "[{}] 完成，耗時 {:.1}s",
            self.stage,
            started.elapsed().as_secs_f64()
        );

        Ok(ToolOutput {
            status,
            stdout,
            stderr,
        })
    }
}

/// 在背景讀取子程序輸出，避免管線緩衝區塞滿造成死結
fn spawn_line_reader<R>(pipe: Option<R>, stage: StageKind) -> Option<JoinHandle<String>>
where
    R: Read + Send + 'static,
{
    let pipe = pipe?;
    Some(thread::spawn(move || {
        let mut collected = String::new();
        for line in BufReader::new(pipe).lines().map_while(std::result::Result::ok) {
            debug!("[{stage}] {line}");
            collected.push_str(&line);
            collected.push('\n');
        }
        collected
    }))
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    let tail = lines[start..].join("\n");
    if tail.is_empty() {
        "（無錯誤輸出）".to_string()
    } else {
        tail
    }
}
