use crate::config::types::Config;
use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "sr_movie.json";

/// 指定設定檔路徑的環境變數
pub const CONFIG_ENV_VAR: &str = "SR_MOVIE_CONFIG";

#[must_use]
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map_or_else(|| PathBuf::from(CONFIG_FILE_NAME), PathBuf::from)
}

impl Config {
    pub fn new() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// 檔案不存在時使用預設值；格式錯誤則回傳錯誤
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("找不到設定檔 {}，使用預設值", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("無法讀取設定檔 {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("無法解析設定檔 {}", path.display()))
    }
}
