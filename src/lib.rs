//! Flipbook - image sequence animator library
//!
//! Re-exports all modules for use by binary targets.

// Core engine (loader, preloader, player, events, workers)
pub mod core;

// Component and app modules
pub mod animator;
pub mod cli;
pub mod config;
pub mod hotkeys;
pub mod inputs;
pub mod paths;
pub mod view;
pub mod widgets;

// Re-export commonly used types
pub use animator::Animator;
pub use config::{AnimatorConfig, ConfigError, ValidConfig};
pub use crate::core::event_bus::{BoxedEvent, EventBus, EventEmitter, downcast_event};
pub use crate::core::player::Player;
pub use crate::core::preloader::{ImageSet, Preloader, image_set};
pub use hotkeys::{HotkeyHandler, PlayerAction};
pub use view::Surface;
