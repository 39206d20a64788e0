//! fruit_detect - live banana detection over a camera stream.
//!
//! 1. Loads the bundled cascade classifier on a background thread
//! 2. Connects the camera while the classifier loads
//! 3. Starts frame delivery once loading has completed (success or not)
//! 4. Annotates detections and hands frames to the configured sink
//! 5. Applies size presets typed on stdin between frames

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;

use fruit_detect::control::{menu_items, spawn_stdin_menu, MenuCommand};
use fruit_detect::ui::{Ui, UiMode};
use fruit_detect::{
    CameraSource, ClassifierLoader, DetectorSlot, DirBundle, FrameSink, FruitDetectConfig,
    LoadedClassifier, Pipeline, ResourceLoadFailure, Session, SizePolicy,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Detect bananas in a live camera stream")]
struct Args {
    /// TOML config file.
    #[arg(long, env = "FRUIT_DETECT_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Camera device (stub://name, a stills directory, or /dev/videoN).
    #[arg(long)]
    camera: Option<String>,

    /// Starting fruit size preset in percent (50, 40, 30, 20).
    #[arg(long, value_name = "PERCENT")]
    preset: Option<u32>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,

    /// Startup output: auto, plain, or pretty.
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,

    /// Do not read menu commands from stdin.
    #[arg(long)]
    no_menu: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::for_stderr(UiMode::parse(&args.ui)?);

    let mut cfg = FruitDetectConfig::load_from(args.config.as_deref())?;
    if let Some(camera) = args.camera {
        cfg.camera.device = camera;
    }
    if let Some(percent) = args.preset {
        cfg.preset_percent = percent;
    }
    let preset = cfg.preset()?;

    let pending = match cfg.classifier.backend.factory() {
        Ok(factory) => {
            let mut loader = ClassifierLoader::new(
                Box::new(DirBundle::new(cfg.classifier.bundle_dir.clone())),
                factory,
                cfg.classifier.resource.clone(),
            );
            if let Some(digest) = &cfg.classifier.sha256 {
                loader = loader.with_expected_sha256(digest.clone());
            }
            Some(loader.spawn())
        }
        Err(err) => {
            log::error!("ClassifierLoader: {:#}", err);
            None
        }
    };

    let mut source = CameraSource::new(cfg.camera.clone())?;
    {
        let mut stage = ui.stage("connect camera");
        if let Err(err) = source.connect() {
            stage.fail(format!("{:#}", err));
            return Err(err);
        }
    }

    let loaded = {
        let mut stage = ui.stage("load classifier");
        let loaded = match pending {
            Some(pending) => pending.wait(),
            None => LoadedClassifier {
                kind: cfg.classifier.method,
                slot: DetectorSlot::Absent(ResourceLoadFailure::BackendUnavailable(format!(
                    "{:?}",
                    cfg.classifier.backend
                ))),
                digest: None,
            },
        };
        if let DetectorSlot::Absent(failure) = &loaded.slot {
            stage.fail(failure.to_string());
        }
        loaded
    };

    let mut session = Session::new(SizePolicy::from_preset(preset), cfg.classifier.method);
    session.install(loaded)?;
    if !session.detectors().has_ready(cfg.classifier.method) {
        log::warn!("no {} detector available; frames pass through unannotated", cfg.classifier.method);
    }

    let sink = FrameSink::new(cfg.output.clone())?;
    let (tx, rx) = mpsc::channel();
    let ctrlc_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(MenuCommand::Quit);
    })
    .context("install ctrl-c handler")?;
    if !args.no_menu {
        ui.menu(&menu_items());
        spawn_stdin_menu(tx)?;
    } else {
        drop(tx);
    }

    log::info!(
        "fruit_detect running: camera={} preset={} backend={:?}",
        cfg.camera.device,
        preset.label(),
        cfg.classifier.backend
    );

    let mut pipeline = Pipeline::new(source, sink, session)
        .with_commands(rx)
        .with_target_fps(cfg.camera.target_fps);
    if let Some(max_frames) = args.max_frames {
        if max_frames == 0 {
            return Err(anyhow!("--max-frames must be greater than zero"));
        }
        pipeline = pipeline.with_max_frames(max_frames);
    }

    let summary = pipeline.run()?;
    log::info!(
        "fruit_detect stopped: frames={} detections={} min_size={}px",
        summary.frames,
        summary.detections,
        summary.min_size_px
    );
    Ok(())
}
