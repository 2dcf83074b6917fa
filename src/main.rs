use anyhow::{Result, bail};
use console::{Term, style};
use log::{info, warn};
use sr_movie::component::{FrameExtractor, LowScaleGenerator, UpscaleCheck, Upscaler};
use sr_movie::config::Config;
use sr_movie::init;
use sr_movie::menu::show_main_menu;
use sr_movie::pipeline::PipelineError;
use sr_movie::signal::setup_shutdown_signal;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn main() -> ExitCode {
    init::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("錯誤:").red().bold(), e);
            let code = e
                .chain()
                .find_map(|cause| cause.downcast_ref::<PipelineError>())
                .map_or(1, PipelineError::exit_code);
            warn!("程式結束，結束碼 {code}");
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn run() -> Result<()> {
    let shutdown_signal = setup_shutdown_signal()?;
    let config = Config::new()?;

    // 指定模式時只執行一次，不進入選單
    if let Some(mode) = std::env::args().nth(1) {
        return run_mode(&mode, config, shutdown_signal);
    }

    let term = Term::stdout();
    loop {
        match show_main_menu(&term, &shutdown_signal, &config) {
            Ok(true) if shutdown_signal.load(Ordering::SeqCst) => {
                info!("收到中斷信號，結束程式");
                break;
            }
            Ok(true) => {}
            Ok(false) => {
                term.clear_screen()?;
                println!("\n{}", style("再見！").green().bold());
                info!("Program exited normally");
                break;
            }
            Err(e) => {
                warn!("Program error: {e}");
                return Err(e);
            }
        }
    }

    Ok(())
}

fn run_mode(mode: &str, config: Config, shutdown_signal: Arc<AtomicBool>) -> Result<()> {
    info!("執行模式: {mode}");
    match mode {
        "upscale" => Upscaler::new(config, shutdown_signal).run(),
        "check" => UpscaleCheck::new(config, shutdown_signal).run(),
        "frame_extract" => FrameExtractor::new(config, shutdown_signal).run(),
        "gen_low_scale" => LowScaleGenerator::new(config, shutdown_signal).run(),
        other => bail!(
            "未知的模式 {other:?}（可用: upscale, check, frame_extract, gen_low_scale）"
        ),
    }
}
