use crate::config::AnimatorConfig;
use clap::Parser;
use std::path::PathBuf;

// Build version with decoder info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Decode: image 0.25 (png, jpeg, tiff, tga, gif, bmp, webp)\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Image sequence flipbook
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Frames to play: files, directories or glob patterns ("shots/*.png"), in order
    #[arg(value_name = "FILE|GLOB")]
    pub inputs: Vec<String>,

    /// Load animator settings from a JSON file (CLI flags override it)
    #[arg(short = 'C', long = "config", value_name = "JSON")]
    pub config_file: Option<PathBuf>,

    /// Frames per second at 1x speed (default: 30)
    #[arg(short = 'r', long = "fps", value_name = "FPS")]
    pub fps: Option<f32>,

    /// Enable looping (default: 1)
    #[arg(short = 'o', long = "loop", value_name = "0|1")]
    pub loop_playback: Option<u8>,

    /// Stop at the last frame instead of wrapping (same as --loop 0)
    #[arg(long = "no-loop", conflicts_with = "loop_playback")]
    pub no_loop: bool,

    /// Speed multipliers offered as buttons, comma separated (default: 0.5,1,2)
    #[arg(short = 's', long = "speeds", value_name = "LIST", value_delimiter = ',')]
    pub speeds: Option<Vec<f32>>,

    /// Show the file name of the current frame
    #[arg(long = "show-filename")]
    pub show_filename: bool,

    /// Start playing as soon as one frame is loaded
    #[arg(long = "start-while-loading")]
    pub start_while_loading: bool,

    /// Give up on frames that have not loaded after this many milliseconds
    #[arg(long = "load-timeout", value_name = "MS")]
    pub load_timeout_ms: Option<f64>,

    /// Decoder threads (default: 3/4 of the CPU cores)
    #[arg(short = 'w', long = "workers", value_name = "N")]
    pub workers: Option<usize>,

    /// Enable debug logging to file (default: flipbook.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

impl Args {
    /// Loop setting requested on the command line, if any.
    pub fn loop_enabled(&self) -> Option<bool> {
        if self.no_loop {
            return Some(false);
        }
        self.loop_playback.map(|v| v != 0)
    }

    /// Apply command-line overrides on top of a (file or default) config.
    /// Image inputs are resolved separately.
    pub fn apply_overrides(&self, config: &mut AnimatorConfig) {
        if let Some(fps) = self.fps {
            config.frame_rate = fps;
        }
        if let Some(enabled) = self.loop_enabled() {
            config.loop_enabled = enabled;
        }
        if let Some(speeds) = &self.speeds {
            config.playback_speeds = speeds.clone();
        }
        if self.show_filename {
            config.show_filename = true;
        }
        if self.start_while_loading {
            config.start_while_loading = true;
        }
        if self.load_timeout_ms.is_some() {
            config.load_timeout_ms = self.load_timeout_ms;
        }
    }
}
