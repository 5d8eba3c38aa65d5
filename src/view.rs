//! Declarative render model of the animator.
//!
//! The animator never draws. It describes what should be on screen as a
//! [`Surface`] and the egui widget paints it. Keeping this as plain data
//! makes the rendering contract testable without a UI context.

/// Top-level state of the component surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    /// Invalid configuration. Nothing loads or animates.
    ConfigError { message: String },
    /// Waiting for assets.
    Loading {
        loaded: usize,
        total: usize,
        percent: u32,
        failed: usize,
    },
    /// Loading finished and not a single asset loaded.
    Failed { total: usize, failed_urls: Vec<String> },
    /// Playable.
    Ready(ReadyView),
}

impl Surface {
    pub fn is_ready(&self) -> bool {
        matches!(self, Surface::Ready(_))
    }

    pub fn ready(&self) -> Option<&ReadyView> {
        match self {
            Surface::Ready(view) => Some(view),
            _ => None,
        }
    }

    /// Headline text for the non-ready states.
    pub fn message(&self) -> Option<String> {
        match self {
            Surface::ConfigError { message } => Some(format!("Error: {}", message)),
            Surface::Loading { loaded, total, percent, .. } => {
                Some(format!("Loading images... ({}/{}) {}%", loaded, total, percent))
            }
            Surface::Failed { failed_urls, .. } => Some(format!(
                "Error: Could not load any images. Failed URLs: {}",
                failed_urls.join(", ")
            )),
            Surface::Ready(_) => None,
        }
    }

    /// Advisory line shown under the loading message.
    pub fn loading_warning(&self) -> Option<String> {
        match self {
            Surface::Loading { failed, .. } if *failed > 0 => {
                Some(format!("{} image(s) failed to load.", failed))
            }
            _ => None,
        }
    }
}

/// What is displayed in the frame area.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameView {
    Image {
        index: usize,
        url: String,
        /// Accessible description, carries the 1-based frame number
        alt: String,
    },
    /// No identifier for the clamped index.
    Unavailable { index: usize, message: String },
}

impl FrameView {
    pub fn index(&self) -> usize {
        match self {
            FrameView::Image { index, .. } | FrameView::Unavailable { index, .. } => *index,
        }
    }

    /// 1-based number as shown to users.
    pub fn frame_number(&self) -> usize {
        self.index() + 1
    }
}

/// One button of the control strip.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlView {
    pub label: String,
    pub aria_label: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeedControlView {
    pub speed: f32,
    pub label: String,
    pub aria_label: String,
    pub pressed: bool,
}

/// Everything shown once frames are playable.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyView {
    pub frame: FrameView,
    /// `Some` when filenames are enabled
    pub filename: Option<String>,
    pub previous: ControlView,
    pub play_pause: ControlView,
    pub next: ControlView,
    pub speeds: Vec<SpeedControlView>,
    pub is_playing: bool,
    /// Failed-asset alert, advisory only
    pub warning: Option<String>,
}

/// Trailing path segment of an identifier.
pub fn file_name(url: &str) -> &str {
    url.rsplit(['/', '\\']).next().unwrap_or(url)
}

/// `0.5` -> `"0.5x"`, `2.0` -> `"2x"`.
pub fn speed_label(speed: f32) -> String {
    format!("{}x", speed)
}

pub fn alt_text(index: usize) -> String {
    format!("Image sequence frame {}", index + 1)
}

pub fn failure_warning(error_count: usize) -> Option<String> {
    (error_count > 0).then(|| {
        format!(
            "Warning: {} image(s) failed to load and will be skipped.",
            error_count
        )
    })
}

pub(crate) fn previous_control(enabled: bool) -> ControlView {
    ControlView {
        label: "Prev".into(),
        aria_label: "Previous Frame".into(),
        enabled,
    }
}

pub(crate) fn next_control(enabled: bool) -> ControlView {
    ControlView {
        label: "Next".into(),
        aria_label: "Next Frame".into(),
        enabled,
    }
}

pub(crate) fn play_pause_control(is_playing: bool, enabled: bool) -> ControlView {
    if is_playing {
        ControlView {
            label: "Pause".into(),
            aria_label: "Pause Animation".into(),
            enabled,
        }
    } else {
        ControlView {
            label: "Play".into(),
            aria_label: "Play Animation".into(),
            enabled,
        }
    }
}

pub(crate) fn speed_controls(speeds: &[f32], current: f32) -> Vec<SpeedControlView> {
    speeds
        .iter()
        .map(|&speed| SpeedControlView {
            speed,
            label: speed_label(speed),
            aria_label: format!("Set speed to {}", speed_label(speed)),
            pressed: speed == current,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("https://cdn.example.com/shoe/image1.jpg"), "image1.jpg");
        assert_eq!(file_name("image1.jpg"), "image1.jpg");
        assert_eq!(file_name("dir/"), "");
    }

    #[test]
    fn test_speed_labels() {
        assert_eq!(speed_label(0.5), "0.5x");
        assert_eq!(speed_label(1.0), "1x");
        assert_eq!(speed_label(2.0), "2x");
        let controls = speed_controls(&[0.5, 1.0, 2.0], 1.0);
        assert_eq!(controls.iter().filter(|c| c.pressed).count(), 1);
        assert_eq!(controls[0].aria_label, "Set speed to 0.5x");
    }

    #[test]
    fn test_messages() {
        let loading = Surface::Loading { loaded: 1, total: 4, percent: 25, failed: 2 };
        assert_eq!(loading.message().unwrap(), "Loading images... (1/4) 25%");
        assert_eq!(loading.loading_warning().unwrap(), "2 image(s) failed to load.");

        let failed = Surface::Failed {
            total: 2,
            failed_urls: vec!["a.png".into(), "b.png".into()],
        };
        assert!(failed.message().unwrap().ends_with("a.png, b.png"));
        assert_eq!(failure_warning(0), None);
    }
}
