use crate::config::save::save_config;
use crate::config::{Config, config_path};
use crate::menu::handlers::{
    run_frame_extractor, run_low_scale_generator, run_upscale_check, run_upscaler,
};
use anyhow::Result;
use console::{Term, style};
use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// 回傳 `false` 表示結束程式
pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &Config,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style("=== 影片超解析度工具 ===").cyan().bold());
    println!("{}", style("按 ESC 離開").dim());

    let options = [
        "影片超解析度",
        "超解析度試跑（比較倍率）",
        "固定間隔擷取畫格",
        "產生低解析度影像",
        "寫出目前設定檔",
        "離開",
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("請選擇功能")
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => {
            run_upscaler(term, shutdown_signal, config)?;
            Ok(true)
        }
        Some(1) => {
            run_upscale_check(term, shutdown_signal, config)?;
            Ok(true)
        }
        Some(2) => {
            run_frame_extractor(term, shutdown_signal, config)?;
            Ok(true)
        }
        Some(3) => {
            run_low_scale_generator(term, shutdown_signal, config)?;
            Ok(true)
        }
        Some(4) => {
            let path = config_path();
            save_config(config, &path)?;
            println!("\n{} {}", style("設定已寫入").green(), path.display());
            std::thread::sleep(std::time::Duration::from_secs(1));
            Ok(true)
        }
        Some(5) | None => Ok(false),
        _ => unreachable!(),
    }
}
