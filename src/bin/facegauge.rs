//! facegauge - face size and camera distance from live video
//!
//! This binary:
//! 1. Loads layered configuration (defaults, config file, env, flags)
//! 2. Loads the face detector model once
//! 3. Opens the frame source and the display
//! 4. Runs the measurement loop until `q`, Ctrl-C, or the source ends

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use facegauge::config::ConfigOverrides;
use facegauge::{
    build_detector, open_display, open_source, EndReason, FacegaugeConfig, MeasurementLoop,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (TOML, or JSON when the name ends in .json).
    #[arg(long, env = "FACEGAUGE_CONFIG")]
    config: Option<PathBuf>,
    /// Video source: camera index, /dev/videoN, stub://name, or an image file or directory.
    #[arg(long)]
    source: Option<String>,
    /// Detector backend (cascade|stub).
    #[arg(long)]
    backend: Option<String>,
    /// Haar cascade model file.
    #[arg(long)]
    cascade: Option<PathBuf>,
    /// Display mode (window|headless).
    #[arg(long)]
    display: Option<String>,
    /// Headless key script, one character per frame, '.' for no key (e.g. "....c...q").
    #[arg(long)]
    keys: Option<String>,
    /// UI mode for stderr progress.
    #[arg(long, value_enum, default_value = "auto", value_name = "MODE")]
    ui: ui::UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = ui::Ui::new(args.ui);

    let mut cfg = FacegaugeConfig::load_from(args.config.as_deref())?;
    cfg.apply_overrides(&args.overrides())?;
    cfg.validate()?;
    log::info!(
        "source={} backend={} display={} reference={} {} at {} {}",
        cfg.source.uri,
        cfg.detector.backend,
        cfg.display.mode,
        cfg.reference.known_width,
        cfg.reference.unit,
        cfg.reference.known_distance,
        cfg.reference.unit
    );

    let detector = staged(&ui, "loading face detector", || {
        let mut detector = build_detector(cfg.detector.backend, &cfg.detector.cascade_path)?;
        detector.warm_up()?;
        Ok(detector)
    })?;
    let source = staged(&ui, "opening video source", || {
        open_source(&cfg.source).with_context(|| format!("cannot open source {}", cfg.source.uri))
    })?;
    let display = staged(&ui, "opening display", || {
        open_display(
            cfg.display.mode,
            &cfg.display.window_title,
            args.keys.as_deref(),
        )
    })?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("failed to install Ctrl-C handler")?;

    println!("Press 'c' to calibrate focal length using a reference face.");
    println!("Press 'q' to quit.");

    let report = MeasurementLoop::new(source, detector, display, cfg.measurement_settings())
        .with_shutdown_flag(shutdown)
        .run()?;

    if report.end == EndReason::SourceEnded {
        log::info!(
            "{} ended after {} frames",
            report.source.uri,
            report.source.frames_captured
        );
    }
    Ok(())
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            source: self.source.clone(),
            backend: self.backend.clone(),
            cascade_path: self.cascade.clone(),
            display: self.display.clone(),
        }
    }
}

fn staged<T>(ui: &ui::Ui, name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let stage = ui.stage(name);
    match f() {
        Ok(value) => Ok(value),
        Err(e) => {
            stage.fail();
            Err(e)
        }
    }
}
