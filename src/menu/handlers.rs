use crate::component::{FrameExtractor, LowScaleGenerator, UpscaleCheck, Upscaler};
use crate::config::Config;
use crate::pause;
use anyhow::Result;
use console::{Term, style};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

fn report(result: Result<()>) {
    if let Err(e) = result {
        eprintln!("{} {:#}", style("錯誤:").red().bold(), e);
    }
}

pub fn run_upscaler(term: &Term, shutdown_signal: &Arc<AtomicBool>, config: &Config) -> Result<()> {
    let upscaler = Upscaler::new(config.clone(), Arc::clone(shutdown_signal));
    report(upscaler.run());

    pause(term)?;
    Ok(())
}

pub fn run_upscale_check(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &Config,
) -> Result<()> {
    let check = UpscaleCheck::new(config.clone(), Arc::clone(shutdown_signal));
    report(check.run());

    pause(term)?;
    Ok(())
}

pub fn run_frame_extractor(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &Config,
) -> Result<()> {
    let extractor = FrameExtractor::new(config.clone(), Arc::clone(shutdown_signal));
    report(extractor.run());

    pause(term)?;
    Ok(())
}

pub fn run_low_scale_generator(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &Config,
) -> Result<()> {
    let generator = LowScaleGenerator::new(config.clone(), Arc::clone(shutdown_signal));
    report(generator.run());

    pause(term)?;
    Ok(())
}
