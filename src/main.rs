use flipbook::animator::Animator;
use flipbook::cli::Args;
use flipbook::config::AnimatorConfig;
use flipbook::core::clock::{Clock, MonotonicClock};
use flipbook::core::event_bus::{EventBus, downcast_event};
use flipbook::core::events::{
    AssetFailedEvent, FrameChangedEvent, PlaybackEndedEvent, PlayingChangedEvent,
    PreloadFinishedEvent, PreloadStartedEvent, SpeedChangedEvent,
};
use flipbook::core::loader::FileLoader;
use flipbook::core::preloader::image_set;
use flipbook::core::workers::Workers;
use flipbook::hotkeys::{HotkeyHandler, PlayerAction};
use flipbook::inputs;
use flipbook::paths::{self, PathConfig};
use flipbook::widgets::{FileAnimator, FlipbookView, RepaintScheduler};

use anyhow::{Context, Result};
use clap::Parser;
use eframe::egui;
use log::{debug, info, trace, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Desktop host: one animator filling the window
struct FlipbookApp {
    animator: FileAnimator,
    view: FlipbookView,
    clock: MonotonicClock,
    event_bus: EventBus,
}

impl FlipbookApp {
    fn new(cc: &eframe::CreationContext<'_>, config: &AnimatorConfig, workers: Arc<Workers>) -> Self {
        let event_bus = EventBus::new();
        let clock = MonotonicClock::new();

        let mut hotkeys = HotkeyHandler::new();
        hotkeys.add_binding("Home", PlayerAction::First);
        hotkeys.add_binding("End", PlayerAction::Last);

        let mut animator = Animator::new(
            config,
            FileLoader::new(workers),
            RepaintScheduler::new(cc.egui_ctx.clone()),
        )
        .with_emitter(event_bus.emitter())
        .with_hotkeys(hotkeys);
        animator.mount(clock.now_ms());

        Self {
            animator,
            view: FlipbookView::new(),
            clock,
            event_bus,
        }
    }

    /// Drain the event queue. Events only feed the log here.
    fn handle_events(&mut self) {
        for event in self.event_bus.poll() {
            if let Some(e) = downcast_event::<FrameChangedEvent>(&event) {
                trace!("Frame {} -> {}", e.old_index + 1, e.new_index + 1);
            } else if let Some(e) = downcast_event::<PlaybackEndedEvent>(&event) {
                info!("Playback reached the last frame ({})", e.index + 1);
            } else if let Some(e) = downcast_event::<PlayingChangedEvent>(&event) {
                debug!("Playing: {}", e.0);
            } else if let Some(e) = downcast_event::<SpeedChangedEvent>(&event) {
                debug!("Speed: {}x", e.0);
            } else if let Some(e) = downcast_event::<PreloadStartedEvent>(&event) {
                info!("Preloading {} frame(s)", e.total);
            } else if let Some(e) = downcast_event::<AssetFailedEvent>(&event) {
                debug!("Failed frame {}: {}", e.url, e.reason);
            } else if let Some(e) = downcast_event::<PreloadFinishedEvent>(&event) {
                info!("Preload finished: {} loaded, {} failed", e.loaded, e.failed);
            }
        }
    }

    /// Files dropped on the window replace the sequence.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<String> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.as_ref())
                .map(|p| p.to_string_lossy().into_owned())
                .collect()
        });
        if dropped.is_empty() {
            return;
        }
        match inputs::expand_inputs(&dropped) {
            Ok(mut frames) => {
                frames.sort();
                info!("Dropped {} file(s) -> {} frame(s)", dropped.len(), frames.len());
                self.animator.set_images(image_set(frames), self.clock.now_ms());
            }
            Err(e) => warn!("Ignoring dropped files: {:#}", e),
        }
    }
}

impl eframe::App for FlipbookApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);

        let now = self.clock.now_ms();
        egui::CentralPanel::default().show(ctx, |ui| {
            self.view.show(ui, &mut self.animator, now);
        });

        self.handle_events();
    }
}

fn init_logging(args: &Args, path_config: &PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path: PathBuf = log_path_opt
            .clone()
            .unwrap_or_else(|| paths::data_file(paths::LOG_FILE, path_config));

        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file {}", log_path.display()))?;

        // Without -v a log file still gets debug output
        let file_level = log_level.max(log::LevelFilter::Debug);
        env_logger::Builder::new()
            .filter_level(file_level)
            .filter_module("egui", log::LevelFilter::Info) // Suppress egui DEBUG spam
            .filter_module("eframe", log::LevelFilter::Info)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), file_level);
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .filter_module("egui", log::LevelFilter::Info)
            .filter_module("eframe", log::LevelFilter::Info)
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

/// File config (if any), then positional inputs, then flag overrides.
fn build_config(args: &Args) -> Result<AnimatorConfig> {
    let mut config = match &args.config_file {
        Some(path) => AnimatorConfig::from_json_file(path)
            .with_context(|| format!("Loading animator config {}", path.display()))?,
        None => AnimatorConfig::default(),
    };

    let frames = inputs::expand_inputs(&args.inputs)?;
    if !frames.is_empty() {
        config.image_urls = image_set(frames);
    }
    args.apply_overrides(&mut config);
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = paths::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {:#}", e);
    }

    init_logging(&args, &path_config)?;

    info!("Flipbook starting...");
    debug!("Command-line args: {:?}", args);
    info!(
        "Config path: {}",
        paths::config_file(paths::CONFIG_FILE, &path_config).display()
    );

    let config = build_config(&args)?;
    if config.image_urls.is_empty() {
        // Nothing to play: show usage, the window shows the error state
        use clap::CommandFactory;
        let _ = Args::command().print_help();
        println!("\n");
    } else {
        info!("{} frame(s) at {} fps", config.image_urls.len(), config.frame_rate);
    }

    let threads = args.workers.unwrap_or_else(Workers::default_threads).max(1);
    let workers = Arc::new(Workers::new(threads));

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(format!("Flipbook v{}", env!("CARGO_PKG_VERSION")))
            .with_resizable(true)
            .with_drag_and_drop(true),
        persist_window: true,
        persistence_path: Some(paths::config_file(paths::CONFIG_FILE, &path_config)),
        ..Default::default()
    };

    eframe::run_native(
        "Flipbook",
        native_options,
        Box::new(move |cc| Ok(Box::new(FlipbookApp::new(cc, &config, workers)))),
    )
    .map_err(|e| anyhow::anyhow!("Window error: {}", e))?;

    info!("Flipbook exited");
    Ok(())
}
