//! egui painting of the animator surface.
//!
//! Everything here is presentation: the animator decides, this module draws
//! its [`Surface`] and turns clicks and focused key presses into
//! [`PlayerAction`]s.

use crate::animator::Animator;
use crate::config::PresentationStyle;
use crate::core::clock::{ManualScheduler, TickHandle, TickScheduler};
use crate::core::loader::{DecodedImage, FileLoader, RunId};
use crate::hotkeys::PlayerAction;
use crate::view::{ControlView, FrameView, ReadyView, Surface};
use eframe::egui;
use std::collections::HashMap;
use std::time::Duration;

const WARNING_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 165, 0);
const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(220, 50, 50);

/// Poll interval while waiting for load outcomes.
const LOADING_REPAINT: Duration = Duration::from_millis(30);

/// Scheduler that turns every requested tick into a repaint request.
pub struct RepaintScheduler {
    ctx: egui::Context,
    ticks: ManualScheduler,
}

impl RepaintScheduler {
    pub fn new(ctx: egui::Context) -> Self {
        Self {
            ctx,
            ticks: ManualScheduler::new(),
        }
    }
}

impl TickScheduler for RepaintScheduler {
    fn schedule(&mut self) -> TickHandle {
        let handle = self.ticks.schedule();
        self.ctx.request_repaint();
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        self.ticks.cancel(handle);
    }

    fn take_due(&mut self) -> Option<TickHandle> {
        self.ticks.take_due()
    }

    fn pending(&self) -> usize {
        self.ticks.pending()
    }
}

/// The animator type the desktop host embeds.
pub type FileAnimator = Animator<FileLoader, RepaintScheduler>;

/// Texture cache and focus handling for one animator.
#[derive(Default)]
pub struct FlipbookView {
    textures: HashMap<usize, egui::TextureHandle>,
    run: RunId,
}

impl FlipbookView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the animator, draw it and apply user input.
    pub fn show(&mut self, ui: &mut egui::Ui, animator: &mut FileAnimator, now_ms: f64) -> egui::Response {
        animator.update(now_ms);

        let (salt, style) = match animator.config() {
            Ok(valid) => (valid.class_name.clone(), valid.style.clone()),
            Err(_) => (None, PresentationStyle::default()),
        };

        if animator.preloader().run() != self.run {
            self.textures.clear();
            self.run = animator.preloader().run();
        }

        let mut frame = egui::Frame::group(ui.style());
        if let Some([r, g, b, a]) = style.background {
            frame = frame.fill(egui::Color32::from_rgba_unmultiplied(r, g, b, a));
        }

        let mut actions = Vec::new();
        let surface = animator.surface();

        // The whole container is the focus region. Its sense is registered
        // before the controls, so button clicks stay with the buttons.
        let region = egui::UiBuilder::new()
            .id_salt(("flipbook", salt))
            .sense(egui::Sense::click());
        let response = ui
            .scope_builder(region, |ui| {
                frame.show(ui, |ui| match &surface {
                    Surface::Ready(view) => {
                        let texture = self.texture_for(ui.ctx(), view, animator);
                        draw_ready(ui, view, texture.as_ref(), style.max_width, &mut actions);
                    }
                    other => {
                        draw_waiting(ui, other);
                        ui.ctx().request_repaint_after(LOADING_REPAINT);
                    }
                });
            })
            .response;

        if response.clicked() {
            response.request_focus();
        }
        if animator.player().is_ready() && response.has_focus() {
            // Arrows go to us instead of moving focus
            ui.memory_mut(|m| {
                m.set_focus_lock_filter(
                    response.id,
                    egui::EventFilter {
                        horizontal_arrows: true,
                        vertical_arrows: false,
                        tab: false,
                        escape: false,
                    },
                )
            });
            actions.extend(ui.input_mut(|input| animator.hotkeys().consume(input)));
        }

        for action in actions {
            animator.dispatch(action);
        }
        response
    }

    fn texture_for(
        &mut self,
        ctx: &egui::Context,
        view: &ReadyView,
        animator: &FileAnimator,
    ) -> Option<egui::TextureHandle> {
        let FrameView::Image { index, url, .. } = &view.frame else {
            return None;
        };
        if let Some(texture) = self.textures.get(index) {
            return Some(texture.clone());
        }
        let image: &DecodedImage = animator.preloader().asset(*index)?;
        let color = egui::ColorImage::from_rgba_unmultiplied(image.size(), &image.rgba);
        let texture = ctx.load_texture(url.clone(), color, egui::TextureOptions::LINEAR);
        self.textures.insert(*index, texture.clone());
        Some(texture)
    }
}

fn draw_waiting(ui: &mut egui::Ui, surface: &Surface) {
    ui.vertical_centered(|ui| {
        let color = match surface {
            Surface::Loading { .. } => ui.visuals().text_color(),
            _ => ERROR_COLOR,
        };
        if let Some(message) = surface.message() {
            ui.colored_label(color, message);
        }
        if let Surface::Loading { .. } = surface {
            ui.spinner();
        }
        if let Some(warning) = surface.loading_warning() {
            ui.colored_label(WARNING_COLOR, warning);
        }
    });
}

fn draw_ready(
    ui: &mut egui::Ui,
    view: &ReadyView,
    texture: Option<&egui::TextureHandle>,
    max_width: Option<f32>,
    actions: &mut Vec<PlayerAction>,
) {
    let width = max_width
        .map(|w| w.min(ui.available_width()))
        .unwrap_or_else(|| ui.available_width());

    match (&view.frame, texture) {
        (FrameView::Image { alt, .. }, Some(texture)) => {
            ui.add(
                egui::Image::new(texture)
                    .max_width(width)
                    .maintain_aspect_ratio(true),
            )
            .on_hover_text(alt);
        }
        (FrameView::Image { index, .. }, None) => {
            ui.colored_label(WARNING_COLOR, format!("Frame {} unavailable.", index + 1));
        }
        (FrameView::Unavailable { message, .. }, _) => {
            ui.colored_label(WARNING_COLOR, message);
        }
    }

    ui.separator();
    ui.horizontal_wrapped(|ui| {
        if control(ui, &view.previous) {
            actions.push(PlayerAction::Previous);
        }
        if control(ui, &view.play_pause) {
            actions.push(PlayerAction::TogglePlayPause);
        }
        if control(ui, &view.next) {
            actions.push(PlayerAction::Next);
        }

        ui.add_space(16.0);
        ui.label("Speed:");
        for speed in &view.speeds {
            let response = ui
                .selectable_label(speed.pressed, &speed.label)
                .on_hover_text(&speed.aria_label);
            if response.clicked() && !speed.pressed {
                actions.push(PlayerAction::SetSpeed(speed.speed));
            }
        }
    });

    if let Some(warning) = &view.warning {
        ui.colored_label(WARNING_COLOR, warning);
    }
    if let Some(name) = &view.filename {
        ui.label(format!("Filename: {}", name));
    }
}

fn control(ui: &mut egui::Ui, control: &ControlView) -> bool {
    ui.add_enabled(control.enabled, egui::Button::new(&control.label))
        .on_hover_text(&control.aria_label)
        .clicked()
}
