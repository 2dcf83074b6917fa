//! 畫格序列命名規則
//!
//! 拆解階段輸出 `image_00000000.png` 起算的連續序列（索引 0 為第一格），
//! 增強工具輸出 `image_00000000_<suffix>.png`，重組階段再依同一規則讀回。

use super::error::{PipelineError, Result};
use super::stage::StageKind;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const FRAME_PREFIX: &str = "image_";
pub const FRAME_EXTENSION: &str = "png";
const INDEX_WIDTH: usize = 8;

#[must_use]
pub fn frame_file_name(index: usize) -> String {
    format!("{FRAME_PREFIX}{index:0INDEX_WIDTH$}.{FRAME_EXTENSION}")
}

#[must_use]
pub fn enhanced_file_name(index: usize, suffix: &str) -> String {
    format!("{FRAME_PREFIX}{index:0INDEX_WIDTH$}_{suffix}.{FRAME_EXTENSION}")
}

/// ffmpeg image2 使用的檔名樣式
#[must_use]
pub fn sequence_pattern(suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{FRAME_PREFIX}%0{INDEX_WIDTH}d_{suffix}.{FRAME_EXTENSION}"),
        None => format!("{FRAME_PREFIX}%0{INDEX_WIDTH}d.{FRAME_EXTENSION}"),
    }
}

/// 由檔名解析畫格索引；檔名不符合規則時回傳 `None`
#[must_use]
pub fn parse_frame_index(file_name: &str, suffix: Option<&str>) -> Option<usize> {
    let stem = file_name
        .strip_prefix(FRAME_PREFIX)?
        .strip_suffix(FRAME_EXTENSION)?
        .strip_suffix('.')?;
    let digits = match suffix {
        Some(suffix) => stem.strip_suffix(suffix)?.strip_suffix('_')?,
        None => stem,
    };
    if digits.len() != INDEX_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// 目錄中一組連續編號的畫格
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSet {
    pub dir: PathBuf,
    pub count: usize,
    pub suffix: Option<String>,
}

impl FrameSet {
    /// 掃描目錄並確認索引從 0 開始且連續
    pub fn scan(dir: &Path, suffix: Option<&str>, stage: StageKind) -> Result<Self> {
        let indices = collect_indices(dir, suffix)?;

        let count = indices.len();
        if let Some(&last) = indices.last()
            && last + 1 != count
        {
            let missing = (0..=last).find(|i| !indices.contains(i)).unwrap_or(0);
            return Err(PipelineError::external(
                stage,
                format!(
                    "{} 的畫格序列不連續，缺少索引 {missing}",
                    dir.display()
                ),
            ));
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            count,
            suffix: suffix.map(str::to_string),
        })
    }

    #[must_use]
    pub fn pattern(&self) -> PathBuf {
        self.dir.join(sequence_pattern(self.suffix.as_deref()))
    }

    #[must_use]
    pub fn file_name(&self, index: usize) -> String {
        match self.suffix.as_deref() {
            Some(suffix) => enhanced_file_name(index, suffix),
            None => frame_file_name(index),
        }
    }

    /// 依索引排序的畫格路徑
    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        (0..self.count).map(|i| self.dir.join(self.file_name(i)))
    }
}

/// 目錄內（不遞迴）符合命名規則的畫格索引，已排序
fn collect_indices(dir: &Path, suffix: Option<&str>) -> Result<Vec<usize>> {
    if !dir.is_dir() {
        return Err(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("畫格目錄不存在: {}", dir.display()),
        )));
    }

    let indices: BTreeSet<usize> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| parse_frame_index(&entry.file_name().to_string_lossy(), suffix))
        .collect();

    Ok(indices.into_iter().collect())
}
