//! Core engine modules - loading, preloading, playback, events, workers
//!
//! These modules form the flipbook engine, independent of UI.

pub mod clock;
pub mod event_bus;
pub mod events;
pub mod loader;
pub mod player;
pub mod preloader;
pub mod workers;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, ManualScheduler, MonotonicClock, TickHandle, TickScheduler};
pub use event_bus::EventBus;
pub use loader::{AssetLoader, DecodedImage, FileLoader, LoadError, ManualLoader};
pub use player::{Phase, PlaybackParams, PlaybackState, Player};
pub use preloader::{ImageSet, PreloadEvent, PreloadStatus, Preloader, image_set};
pub use workers::Workers;
