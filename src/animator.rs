//! The flipbook component: config + preloader + player + key bindings.
//!
//! Hosts drive it with three calls:
//! - [`Animator::update`] once per display refresh (drains load outcomes,
//!   syncs the player, fires at most one due tick)
//! - [`Animator::dispatch`] / [`Animator::handle_key`] for user input
//! - [`Animator::surface`] to get the render model
//!
//! Failures never cross this boundary as panics or errors: invalid config,
//! per-asset failures and "nothing loaded" all show up in the [`Surface`].

use crate::config::{AnimatorConfig, ValidConfig};
use crate::core::clock::TickScheduler;
use crate::core::event_bus::{Event, EventEmitter};
use crate::core::events::{AssetFailedEvent, PreloadFinishedEvent, PreloadStartedEvent};
use crate::core::loader::AssetLoader;
use crate::core::player::{Phase, Player, PlaybackParams};
use crate::core::preloader::{ImageSet, PreloadEvent, PreloadStatus, Preloader};
use crate::hotkeys::{HotkeyHandler, PlayerAction};
use crate::view::{self, FrameView, ReadyView, Surface};
use log::{debug, info};

pub struct Animator<L: AssetLoader, S: TickScheduler> {
    props: AnimatorConfig,
    config: Result<ValidConfig, String>,
    preloader: Preloader<L>,
    player: Player<S>,
    hotkeys: HotkeyHandler,
    emitter: Option<EventEmitter>,
    mounted: bool,
    finish_reported: bool,
}

impl<L: AssetLoader, S: TickScheduler> Animator<L, S> {
    /// Validate `config` and build the component. Nothing loads until
    /// [`Animator::mount`].
    pub fn new(config: &AnimatorConfig, loader: L, scheduler: S) -> Self {
        let validated = config.validate().map_err(|e| e.to_string());
        let (params, speeds, timeout) = match &validated {
            Ok(valid) => (valid.params, valid.speeds.clone(), valid.load_timeout_ms),
            Err(_) => (PlaybackParams::default(), Vec::new(), None),
        };
        Self {
            props: config.clone(),
            config: validated,
            preloader: Preloader::new(loader).with_timeout(timeout),
            player: Player::new(params, speeds, scheduler),
            hotkeys: HotkeyHandler::new(),
            emitter: None,
            mounted: false,
            finish_reported: false,
        }
    }

    /// Publish notifications (frame changes, failures, ...) through `emitter`.
    pub fn with_emitter(mut self, emitter: EventEmitter) -> Self {
        self.player.set_emitter(emitter.clone());
        self.emitter = Some(emitter);
        self
    }

    pub fn with_hotkeys(mut self, hotkeys: HotkeyHandler) -> Self {
        self.hotkeys = hotkeys;
        self
    }

    /// Start preloading. A component with an invalid config mounts into its
    /// error state and does nothing. Mounting again after
    /// [`Animator::unmount`] starts over from the first frame.
    pub fn mount(&mut self, now_ms: f64) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.player.remount();
        match &self.config {
            Ok(valid) => {
                let images = valid.images.clone();
                self.start_preload(images, now_ms);
            }
            Err(message) => info!("Animator mounted in error state: {}", message),
        }
    }

    /// Swap the image set. Restarts preloading (and playback state) only when
    /// `images` is a different set by identity. An empty set puts the
    /// component in its configuration error state.
    pub fn set_images(&mut self, images: ImageSet, now_ms: f64) {
        self.props.image_urls = images.clone();
        let revalidated = match &mut self.config {
            Ok(valid) if !images.is_empty() => {
                valid.images = images.clone();
                None
            }
            _ => Some(self.props.validate()),
        };

        match revalidated {
            None => {}
            Some(Ok(valid)) => {
                // Recovered from the error state
                self.player.reconfigure(valid.params, valid.speeds.clone());
                self.preloader.set_timeout(valid.load_timeout_ms);
                self.config = Ok(valid);
            }
            Some(Err(e)) => {
                self.preloader.detach();
                self.player.reset();
                self.config = Err(e.to_string());
                return;
            }
        }
        if self.mounted {
            self.start_preload(images, now_ms);
        }
    }

    fn start_preload(&mut self, images: ImageSet, now_ms: f64) {
        if self.preloader.start(images, now_ms) {
            self.player.reset();
            self.finish_reported = false;
            self.emit(PreloadStartedEvent {
                total: self.preloader.status().total,
            });
            self.sync_player();
        }
    }

    /// One host refresh. Returns true when anything visible may have changed.
    pub fn update(&mut self, now_ms: f64) -> bool {
        if !self.mounted {
            return false;
        }
        let mut settled = self.preloader.pump();
        settled.extend(self.preloader.expire(now_ms));
        for event in &settled {
            if let PreloadEvent::LoadFailed { url, error, .. } = event {
                self.emit(AssetFailedEvent {
                    url: url.clone(),
                    reason: error.to_string(),
                });
            }
        }
        let status = self.preloader.status();
        let finished = PreloadFinishedEvent {
            loaded: status.loaded_count,
            failed: status.error_count,
        };
        if !settled.is_empty() && !status.is_loading && !self.finish_reported {
            self.finish_reported = true;
            self.emit(finished);
        }
        self.sync_player();

        let before = self.player.current_index();
        if let Some(handle) = self.player.scheduler_mut().take_due() {
            self.player.on_tick(handle, now_ms);
        }
        !settled.is_empty() || self.player.current_index() != before
    }

    fn sync_player(&mut self) {
        let status = self.preloader.status();
        self.player.sync_assets(status.loaded_count, status.is_loading);
    }

    /// Apply a user action. Returns false when it was a no-op.
    pub fn dispatch(&mut self, action: PlayerAction) -> bool {
        if !self.mounted || self.config.is_err() {
            return false;
        }
        debug!("Animator action {:?}", action);
        match action {
            PlayerAction::TogglePlayPause => self.player.toggle_play_pause(),
            PlayerAction::Previous => self.player.previous(),
            PlayerAction::Next => self.player.next(),
            PlayerAction::SetSpeed(speed) => self.player.set_speed(speed),
            PlayerAction::First => self.player.seek(0),
            PlayerAction::Last => self.player.seek(self.player.loaded_count().saturating_sub(1)),
        }
    }

    /// Key press inside the focus region. Returns the bound action when the
    /// key was handled; the host must then suppress its default handling.
    /// Keys are not handled until frames are playable.
    pub fn handle_key(&mut self, key: &str) -> Option<PlayerAction> {
        if !self.player.is_ready() {
            return None;
        }
        let action = self.hotkeys.handle_key(key)?;
        self.dispatch(action);
        Some(action)
    }

    /// Tear down: late load outcomes and pending ticks are dropped for good.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.preloader.detach();
        self.player.unmount();
        self.mounted = false;
        info!("Animator unmounted");
    }

    // === Queries ===

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn config(&self) -> Result<&ValidConfig, &str> {
        self.config.as_ref().map_err(String::as_str)
    }

    pub fn status(&self) -> &PreloadStatus {
        self.preloader.status()
    }

    pub fn preloader(&self) -> &Preloader<L> {
        &self.preloader
    }

    pub fn player(&self) -> &Player<S> {
        &self.player
    }

    pub fn hotkeys(&self) -> &HotkeyHandler {
        &self.hotkeys
    }

    pub fn phase(&self) -> Phase {
        self.player.phase()
    }

    /// Identifier of the displayed frame once playable.
    pub fn current_url(&self) -> Option<&str> {
        if !self.player.is_ready() {
            return None;
        }
        let valid = self.config.as_ref().ok()?;
        valid.images.get(self.player.current_index()).map(String::as_str)
    }

    /// Decoded asset of the displayed frame, if that identifier loaded.
    pub fn current_asset(&self) -> Option<&L::Asset> {
        if !self.player.is_ready() {
            return None;
        }
        self.preloader.asset(self.player.current_index())
    }

    /// Render model for the current state.
    pub fn surface(&self) -> Surface {
        let valid = match &self.config {
            Ok(valid) => valid,
            Err(message) => {
                return Surface::ConfigError {
                    message: message.clone(),
                };
            }
        };
        let status = self.preloader.status();

        if !self.player.is_ready() {
            if status.all_failed() {
                return Surface::Failed {
                    total: status.total,
                    failed_urls: status.failed_urls.clone(),
                };
            }
            return Surface::Loading {
                loaded: status.loaded_count,
                total: status.total,
                percent: status.percent(),
                failed: status.error_count,
            };
        }

        let index = self.player.current_index();
        let url = valid.images.get(index);
        let frame = match url {
            Some(url) => FrameView::Image {
                index,
                url: url.clone(),
                alt: view::alt_text(index),
            },
            None => FrameView::Unavailable {
                index,
                message: format!("Frame {} unavailable.", index + 1),
            },
        };
        let filename = match (valid.show_filename, url) {
            (true, Some(url)) => Some(view::file_name(url).to_string()),
            _ => None,
        };
        let is_playing = self.player.is_playing();

        Surface::Ready(ReadyView {
            frame,
            filename,
            previous: view::previous_control(self.player.can_step_back()),
            play_pause: view::play_pause_control(is_playing, true),
            next: view::next_control(self.player.can_step_forward()),
            speeds: view::speed_controls(self.player.speeds(), self.player.speed()),
            is_playing,
            warning: view::failure_warning(status.error_count),
        })
    }

    fn emit<E: Event + Clone>(&self, event: E) {
        if let Some(emitter) = &self.emitter {
            emitter.emit(event);
        }
    }
}

impl<L: AssetLoader, S: TickScheduler> Drop for Animator<L, S> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualScheduler;
    use crate::core::loader::ManualLoader;
    use crate::core::preloader::image_set;

    type TestAnimator = Animator<ManualLoader<()>, ManualScheduler>;

    fn mounted(urls: &[&str]) -> TestAnimator {
        let config = AnimatorConfig::new(image_set(urls.iter().copied()));
        let mut animator = Animator::new(&config, ManualLoader::new(), ManualScheduler::new());
        animator.mount(0.0);
        animator
    }

    #[test]
    fn test_config_error_surface() {
        let mut animator: TestAnimator =
            Animator::new(&AnimatorConfig::default(), ManualLoader::new(), ManualScheduler::new());
        animator.mount(0.0);
        assert_eq!(
            animator.surface(),
            Surface::ConfigError {
                message: "No image URLs provided.".into()
            }
        );
        assert_eq!(animator.preloader().loader().pending_count(), 0);
        assert!(!animator.dispatch(PlayerAction::TogglePlayPause));
    }

    #[test]
    fn test_loading_then_ready() {
        let mut animator = mounted(&["a.png", "b.png"]);
        assert!(matches!(animator.surface(), Surface::Loading { loaded: 0, total: 2, .. }));

        animator.preloader().loader().succeed(0);
        animator.update(0.0);
        assert!(matches!(animator.surface(), Surface::Loading { loaded: 1, percent: 50, .. }));

        animator.preloader().loader().succeed(1);
        animator.update(0.0);
        let surface = animator.surface();
        let ready = surface.ready().unwrap();
        assert_eq!(ready.frame.frame_number(), 1);
        assert_eq!(ready.play_pause.label, "Pause");
        assert!(!ready.previous.enabled);
        assert!(ready.next.enabled);
        assert_eq!(ready.filename, None);
    }

    #[test]
    fn test_keys_ignored_while_loading() {
        let mut animator = mounted(&["a.png"]);
        assert_eq!(animator.handle_key("ArrowRight"), None);
        animator.preloader().loader().succeed(0);
        animator.update(0.0);
        assert_eq!(animator.handle_key(" "), Some(PlayerAction::TogglePlayPause));
        assert_eq!(animator.handle_key("q"), None);
    }

    #[test]
    fn test_set_images_restarts_on_new_identity() {
        let mut animator = mounted(&["a.png"]);
        animator.preloader().loader().succeed(0);
        animator.update(0.0);
        assert!(animator.surface().is_ready());

        let same = animator.config().unwrap().images.clone();
        animator.set_images(same, 0.0);
        assert!(animator.surface().is_ready());

        animator.set_images(image_set(["c.png", "d.png"]), 0.0);
        assert!(matches!(animator.surface(), Surface::Loading { total: 2, .. }));
        assert_eq!(animator.preloader().run(), 2);
    }

    #[test]
    fn test_empty_images_is_config_error() {
        let mut animator = mounted(&["a.png"]);
        animator.set_images(image_set(Vec::<String>::new()), 0.0);
        assert!(matches!(animator.surface(), Surface::ConfigError { .. }));

        animator.set_images(image_set(["b.png"]), 0.0);
        assert!(matches!(animator.surface(), Surface::Loading { total: 1, .. }));
    }
}
