use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Application directory name under the platform config/data roots
const APP_DIR: &str = "flipbook";

/// eframe storage file (window state)
pub const CONFIG_FILE: &str = "flipbook.json";

/// Default log file for `--log` without a value
pub const LOG_FILE: &str = "flipbook.log";

/// Which platform root a file belongs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirKind {
    /// Settings (`~/.config/flipbook` on Linux)
    Config,
    /// Logs (`~/.local/share/flipbook` on Linux)
    Data,
}

impl DirKind {
    fn platform_root(self) -> Option<PathBuf> {
        match self {
            DirKind::Config => dirs_next::config_dir(),
            DirKind::Data => dirs_next::data_dir(),
        }
    }
}

/// Where flipbook keeps its files. An explicit directory (CLI or
/// `FLIPBOOK_CONFIG_DIR`) holds both settings and logs.
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// `--config-dir` wins over `FLIPBOOK_CONFIG_DIR`.
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| {
            std::env::var("FLIPBOOK_CONFIG_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        });

        Self { config_dir }
    }

    /// Directory for `kind`: explicit dir, else the working directory when
    /// it already holds flipbook files, else the platform root.
    pub fn dir(&self, kind: DirKind) -> PathBuf {
        if let Some(dir) = &self.config_dir {
            return dir.clone();
        }
        if let Ok(cwd) = std::env::current_dir() {
            if has_local_config_files(&cwd) {
                return cwd;
            }
        }
        kind.platform_root()
            .map(|root| root.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    config.dir(DirKind::Config).join(name)
}

pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    config.dir(DirKind::Data).join(name)
}

/// Create the settings and log directories if missing.
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    for kind in [DirKind::Config, DirKind::Data] {
        let dir = config.dir(kind);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {:?} directory: {}", kind, dir.display()))?;
    }
    Ok(())
}

fn has_local_config_files(dir: &Path) -> bool {
    [CONFIG_FILE, LOG_FILE].iter().any(|f| dir.join(f).exists())
}
