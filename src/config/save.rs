use crate::config::types::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(config).context("無法序列化設定")?;

    fs::write(path, content)
        .with_context(|| format!("無法寫入設定檔 {}", path.display()))?;

    Ok(())
}
