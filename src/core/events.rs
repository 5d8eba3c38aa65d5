//! Notifications published by the animator.

// === Playback ===

/// Displayed frame changed (by a tick or by navigation).
#[derive(Clone, Debug, PartialEq)]
pub struct FrameChangedEvent {
    pub old_index: usize,
    pub new_index: usize,
}

/// Non-looping playback reached the last loaded frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackEndedEvent {
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayingChangedEvent(pub bool);

#[derive(Clone, Debug, PartialEq)]
pub struct SpeedChangedEvent(pub f32);

// === Preload ===

#[derive(Clone, Debug, PartialEq)]
pub struct PreloadStartedEvent {
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssetFailedEvent {
    pub url: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PreloadFinishedEvent {
    pub loaded: usize,
    pub failed: usize,
}
