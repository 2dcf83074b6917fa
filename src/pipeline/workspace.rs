//! 工作目錄管理
//!
//! 每個工作在 `<root>/<job id>` 下擁有獨立的工作目錄，所有中繼產物都放在
//! 這裡。以同一個 [`JobId`] 重複取得會沿用既有目錄。

use super::error::{PipelineError, Result};
use super::segment::SegmentArtifacts;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const MANIFEST_FILE_NAME: &str = "filelist.txt";

/// 工作識別碼產生方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobNaming {
    #[default]
    Uuid,
    /// 以作業系統的程序 ID 命名（舊版行為）
    Process,
}

/// 工作識別碼，決定工作目錄名稱
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(PipelineError::InvalidJob(format!(
                "工作識別碼只能包含英數字、'-'、'_': {id:?}"
            )));
        }
        Ok(Self(id))
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    #[must_use]
    pub fn from_process() -> Self {
        Self(std::process::id().to_string())
    }

    #[must_use]
    pub fn from_naming(naming: JobNaming) -> Self {
        match naming {
            JobNaming::Uuid => Self::generate(),
            JobNaming::Process => Self::from_process(),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 工作結束後是否刪除工作目錄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPolicy {
    Remove,
    Keep,
}

impl CleanupPolicy {
    #[must_use]
    pub const fn from_flag(remove_tmp: bool) -> Self {
        if remove_tmp { Self::Remove } else { Self::Keep }
    }

    #[must_use]
    pub const fn removes(self) -> bool {
        matches!(self, Self::Remove)
    }
}

#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    job_id: JobId,
}

impl Workspace {
    /// `root` 下以 `job_id` 命名的目錄路徑（不會建立）
    ///
    /// 工作識別碼以獨立的路徑元件接在 `root` 之後，而非直接串接字串。
    #[must_use]
    pub fn path_for(root: &Path, job_id: &JobId) -> PathBuf {
        root.join(job_id.as_str())
    }

    /// 建立或沿用工作目錄
    ///
    /// `root` 必須已存在；無法建立時回傳 `DirectoryCreation`。
    pub fn acquire(root: &Path, job_id: &JobId) -> Result<Self> {
        let dir = Self::path_for(root, job_id);

        match fs::create_dir(&dir) {
            Ok(()) => info!("已建立工作目錄 {}", dir.display()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {
                info!("工作目錄 {} 已存在，沿用", dir.display());
            }
            Err(source) => {
                return Err(PipelineError::DirectoryCreation { path: dir, source });
            }
        }

        // 轉成絕對路徑，concat 清單中的路徑才不會依清單位置解析
        let dir = fs::canonicalize(&dir)
            .map_err(|source| PipelineError::DirectoryCreation { path: dir, source })?;

        Ok(Self {
            dir,
            job_id: job_id.clone(),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub const fn job_id(&self) -> &JobId {
        &self.job_id
    }

    #[must_use]
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.join(name)
    }

    /// 區段 `index`（0 起算）的產物路徑；`stem` 為來源影片檔名
    #[must_use]
    pub fn segment_artifacts(&self, index: usize, stem: &str) -> SegmentArtifacts {
        SegmentArtifacts {
            index,
            trimmed_clip: self.join(format!("trim_{index}.mp4")),
            raw_frames_dir: self.join(format!("resize_img_{index}")),
            enhanced_frames_dir: self.join(format!("upscale_img_{index}")),
            recomposed_video: self.join(format!("enhanced_video_{index}.mp4")),
            final_segment: self.join(format!("{stem}_{index}.mp4")),
        }
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.join(MANIFEST_FILE_NAME)
    }

    /// 依政策刪除整個工作目錄
    ///
    /// 刪除失敗回傳 `Cleanup`，可能留下部分檔案。
    pub fn release(self, policy: CleanupPolicy) -> Result<()> {
        if !policy.removes() {
            info!("保留工作目錄 {}", self.dir.display());
            return Ok(());
        }

        fs::remove_dir_all(&self.dir).map_err(|source| {
            warn!("無法刪除工作目錄 {}: {source}", self.dir.display());
            PipelineError::Cleanup {
                path: self.dir.clone(),
                source,
            }
        })?;
        info!("已刪除工作目錄 {}", self.dir.display());
        Ok(())
    }
}

/// 刪除中繼目錄
pub fn remove_dir(path: &Path) -> Result<()> {
    fs::remove_dir_all(path).map_err(|source| PipelineError::Cleanup {
        path: path.to_path_buf(),
        source,
    })?;
    info!("已刪除 {}", path.display());
    Ok(())
}
