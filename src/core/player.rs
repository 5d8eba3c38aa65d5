//! Frame scheduler and playback state machine.
//!
//! **Architecture**: Player does NOT own the images or the preloader. The
//! animator feeds it preload progress through [`Player::sync_assets`] and due
//! ticks through [`Player::on_tick`]; the player only decides which index
//! is displayed and whether it moves.
//!
//! # States
//!
//! - `AwaitingAssets`: nothing loaded yet, or still loading (unless
//!   `start_while_loading` lets already-loaded frames play). No ticks.
//! - `Playing`: one tick is always pending with the [`TickScheduler`].
//! - `Paused`: no tick pending.
//!
//! # Timing Model
//!
//! Interval-based: each frame lasts `1000 / (fps * speed)` ms. The first
//! tick of a playing session records a baseline. A tick advances at most
//! one frame; the baseline moves by whole intervals (`now - elapsed % interval`)
//! so lateness does not accumulate as drift.
//!
//! # Teardown
//!
//! Whenever a dependency of the schedule changes (preload progress, loop,
//! playing flag, speed) the pending tick is cancelled and the baseline is
//! unset; a new session is started if the player should be playing.
//! Unmounting cancels the pending tick; a remount starts from fresh state.
//! Ticks with a handle other than the pending one are ignored, so a
//! cancelled tick can never mutate state.

use crate::core::clock::{TickHandle, TickScheduler};
use crate::core::event_bus::EventEmitter;
use crate::core::events::{FrameChangedEvent, PlaybackEndedEvent, PlayingChangedEvent, SpeedChangedEvent};
use log::{debug, info, trace};

/// Frame rate used when none (or an invalid one) is configured.
pub const DEFAULT_FRAME_RATE: f32 = 30.0;

/// Speed multipliers offered when none are configured.
pub const DEFAULT_PLAYBACK_SPEEDS: &[f32] = &[0.5, 1.0, 2.0];

/// Current frame, playing flag and speed. All transitions are pure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub current_frame_index: usize,
    pub is_playing: bool,
    pub speed: f32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_frame_index: 0,
            is_playing: true,
            speed: 1.0,
        }
    }
}

impl PlaybackState {
    /// Index clamped to the loaded range. 0 when nothing loaded.
    pub fn clamped_index(&self, loaded: usize) -> usize {
        self.current_frame_index.min(loaded.saturating_sub(1))
    }

    /// One automatic step: next frame, wrap to 0 when looping, otherwise stay.
    pub fn advanced(self, loaded: usize, loop_enabled: bool) -> Self {
        if loaded == 0 {
            return self;
        }
        let current = self.clamped_index(loaded);
        let next = current + 1;
        let index = if next < loaded {
            next
        } else if loop_enabled {
            0
        } else {
            current
        };
        Self {
            current_frame_index: index,
            ..self
        }
    }

    /// Manual step back; pauses.
    pub fn stepped_back(self, loaded: usize) -> Self {
        Self {
            current_frame_index: self.clamped_index(loaded).saturating_sub(1),
            is_playing: false,
            ..self
        }
    }

    /// Manual step forward, bounded by the last loaded frame; pauses.
    pub fn stepped_forward(self, loaded: usize) -> Self {
        Self {
            current_frame_index: (self.clamped_index(loaded) + 1).min(loaded.saturating_sub(1)),
            is_playing: false,
            ..self
        }
    }

    pub fn toggled(self) -> Self {
        Self {
            is_playing: !self.is_playing,
            ..self
        }
    }

    pub fn with_speed(self, speed: f32) -> Self {
        Self { speed, ..self }
    }
}

/// Where the player is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingAssets,
    Playing,
    Paused,
}

/// Fixed animation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackParams {
    pub frame_rate: f32,
    pub loop_enabled: bool,
    /// Animate loaded frames before every identifier has settled.
    pub start_while_loading: bool,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            loop_enabled: true,
            start_while_loading: false,
        }
    }
}

/// Playback state manager driven by host ticks.
pub struct Player<S: TickScheduler> {
    state: PlaybackState,
    params: PlaybackParams,
    speeds: Vec<f32>,
    loaded_count: usize,
    is_loading: bool,
    /// Baseline of the current playing session (host timestamp, ms)
    baseline: Option<f64>,
    pending: Option<TickHandle>,
    scheduler: S,
    end_reported: bool,
    mounted: bool,
    emitter: Option<EventEmitter>,
}

impl<S: TickScheduler> Player<S> {
    pub fn new(params: PlaybackParams, speeds: Vec<f32>, scheduler: S) -> Self {
        info!(
            "Player initialized ({} fps, loop: {}, speeds: {:?})",
            params.frame_rate, params.loop_enabled, speeds
        );
        Self {
            state: PlaybackState::default(),
            params,
            speeds,
            loaded_count: 0,
            is_loading: true,
            baseline: None,
            pending: None,
            scheduler,
            end_reported: false,
            mounted: true,
            emitter: None,
        }
    }

    /// Publish playback notifications through `emitter`.
    pub fn set_emitter(&mut self, emitter: EventEmitter) {
        self.emitter = Some(emitter);
    }

    // === Accessors ===

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn params(&self) -> PlaybackParams {
        self.params
    }

    pub fn speeds(&self) -> &[f32] {
        &self.speeds
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded_count
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn speed(&self) -> f32 {
        self.state.speed
    }

    /// Displayed index, clamped to what has loaded.
    pub fn current_index(&self) -> usize {
        self.state.clamped_index(self.loaded_count)
    }

    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }

    pub fn pending_tick(&self) -> Option<TickHandle> {
        self.pending
    }

    pub fn phase(&self) -> Phase {
        let waiting = self.loaded_count == 0 || (self.is_loading && !self.params.start_while_loading);
        if waiting {
            Phase::AwaitingAssets
        } else if self.state.is_playing {
            Phase::Playing
        } else {
            Phase::Paused
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase() != Phase::AwaitingAssets
    }

    /// Frame duration in ms at the current speed.
    pub fn interval_ms(&self) -> f64 {
        1000.0 / (self.params.frame_rate as f64 * self.state.speed as f64)
    }

    /// Non-looping playback is parked on the last loaded frame.
    pub fn is_at_end(&self) -> bool {
        !self.params.loop_enabled
            && self.loaded_count > 0
            && self.current_index() == self.loaded_count - 1
    }

    pub fn can_step_back(&self) -> bool {
        self.is_ready() && self.current_index() > 0
    }

    pub fn can_step_forward(&self) -> bool {
        self.is_ready() && self.current_index() + 1 < self.loaded_count
    }

    // === Inputs ===

    /// Feed preload progress. Restarts the schedule when it changed.
    pub fn sync_assets(&mut self, loaded_count: usize, is_loading: bool) {
        if !self.mounted || (loaded_count == self.loaded_count && is_loading == self.is_loading) {
            return;
        }
        debug!(
            "Player assets: {} loaded, loading: {} -> {:?}",
            loaded_count, is_loading, self.phase()
        );
        self.loaded_count = loaded_count;
        self.is_loading = is_loading;
        self.restart();
    }

    /// Advance on a due tick. Returns the new index if it changed.
    pub fn on_tick(&mut self, handle: TickHandle, now_ms: f64) -> Option<usize> {
        if !self.mounted || self.pending != Some(handle) {
            trace!("Ignoring stale tick {:?}", handle);
            return None;
        }
        self.pending = None;
        if self.phase() != Phase::Playing {
            return None;
        }

        let baseline = *self.baseline.get_or_insert(now_ms);
        let elapsed = now_ms - baseline;
        let interval = self.interval_ms();
        let mut changed = None;

        if elapsed >= interval {
            self.baseline = Some(now_ms - elapsed % interval);
            let old = self.current_index();
            self.state = self.state.advanced(self.loaded_count, self.params.loop_enabled);
            let new = self.current_index();
            if new != old {
                trace!("Frame {} -> {}", old, new);
                self.end_reported = false;
                self.emit(FrameChangedEvent { old_index: old, new_index: new });
                changed = Some(new);
            } else if !self.params.loop_enabled && !self.end_reported {
                debug!("Reached last frame {}, holding", new);
                self.end_reported = true;
                self.emit(PlaybackEndedEvent { index: new });
            }
        }

        self.pending = Some(self.scheduler.schedule());
        changed
    }

    /// Step one frame back and pause. Returns false when nothing happened.
    pub fn previous(&mut self) -> bool {
        if !self.mounted || !self.can_step_back() {
            return false;
        }
        let old = self.current_index();
        self.apply_manual(self.state.stepped_back(self.loaded_count), old);
        true
    }

    /// Step one frame forward and pause. Returns false when nothing happened.
    pub fn next(&mut self) -> bool {
        if !self.mounted || !self.can_step_forward() {
            return false;
        }
        let old = self.current_index();
        self.apply_manual(self.state.stepped_forward(self.loaded_count), old);
        true
    }

    /// Jump to `index` (clamped) and pause.
    pub fn seek(&mut self, index: usize) -> bool {
        if !self.mounted || !self.is_ready() {
            return false;
        }
        let old = self.current_index();
        let target = index.min(self.loaded_count - 1);
        let next = PlaybackState {
            current_frame_index: target,
            is_playing: false,
            ..self.state
        };
        self.apply_manual(next, old);
        true
    }

    pub fn toggle_play_pause(&mut self) -> bool {
        if !self.mounted || !self.is_ready() {
            return false;
        }
        self.state = self.state.toggled();
        debug!("Playback {}", if self.state.is_playing { "resumed" } else { "paused" });
        self.emit(PlayingChangedEvent(self.state.is_playing));
        self.restart();
        true
    }

    /// Switch speed if `speed` is one of the allowed values.
    pub fn set_speed(&mut self, speed: f32) -> bool {
        if !self.mounted || !self.speeds.contains(&speed) {
            trace!("Rejected speed {}", speed);
            return false;
        }
        if self.state.speed == speed {
            return true;
        }
        self.state = self.state.with_speed(speed);
        debug!("Speed set to {}x", speed);
        self.emit(SpeedChangedEvent(speed));
        self.restart();
        true
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        if !self.mounted || self.params.loop_enabled == enabled {
            return;
        }
        self.params.loop_enabled = enabled;
        self.end_reported = false;
        self.restart();
    }

    /// Replace animation parameters and allowed speeds, keeping the frame.
    pub fn reconfigure(&mut self, params: PlaybackParams, speeds: Vec<f32>) {
        if !self.mounted {
            return;
        }
        self.params = params;
        self.speeds = speeds;
        self.end_reported = false;
        self.restart();
    }

    /// Fresh playback state for a new image set: first frame, playing, 1x.
    pub fn reset(&mut self) {
        if !self.mounted {
            return;
        }
        self.teardown();
        self.state = PlaybackState::default();
        self.loaded_count = 0;
        self.is_loading = true;
        self.end_reported = false;
    }

    /// Cancel everything. Later calls are no-ops until [`Player::remount`].
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.teardown();
        self.mounted = false;
        info!("Player unmounted");
    }

    /// Bring an unmounted player back with fresh state, waiting for assets.
    pub fn remount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.reset();
        info!("Player remounted");
    }

    // === Internals ===

    fn apply_manual(&mut self, next: PlaybackState, old_index: usize) {
        let was_playing = self.state.is_playing;
        self.state = next;
        let new_index = self.current_index();
        if new_index != old_index {
            self.end_reported = false;
            self.emit(FrameChangedEvent { old_index, new_index });
        }
        if was_playing {
            self.emit(PlayingChangedEvent(false));
            self.restart();
        }
    }

    fn teardown(&mut self) {
        if let Some(handle) = self.pending.take() {
            trace!("Cancelling tick {:?}", handle);
            self.scheduler.cancel(handle);
        }
        self.baseline = None;
    }

    fn restart(&mut self) {
        self.teardown();
        if self.phase() == Phase::Playing {
            self.pending = Some(self.scheduler.schedule());
        }
    }

    fn emit<E: crate::core::event_bus::Event + Clone>(&self, event: E) {
        if let Some(emitter) = &self.emitter {
            emitter.emit(event);
        }
    }
}

impl<S: TickScheduler> Drop for Player<S> {
    fn drop(&mut self) {
        self.unmount();
    }
}
