//! egui widgets.

pub mod animator_ui;

pub use animator_ui::{FileAnimator, FlipbookView, RepaintScheduler};
