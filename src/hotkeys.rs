//! Keyboard shortcuts for the animator's focus region.
//!
//! Keys are matched by name ("Space", "K", "ArrowLeft", ...) with an optional
//! `Ctrl+`/`Shift+`/`Alt+` prefix. Web-style names (`" "`, `"k"`) are
//! normalized, so both egui key names and DOM `KeyboardEvent.key` values work.
//! In DOM values case carries Shift: `"K"` is Shift+k.

use eframe::egui;
use std::collections::HashMap;

/// Something the user asked the animator to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerAction {
    TogglePlayPause,
    Previous,
    Next,
    SetSpeed(f32),
    First,
    Last,
}

/// Key name -> action bindings.
#[derive(Debug, Clone)]
pub struct HotkeyHandler {
    bindings: HashMap<String, PlayerAction>,
}

impl Default for HotkeyHandler {
    fn default() -> Self {
        let mut handler = Self::empty();
        handler.setup_default_bindings();
        handler
    }
}

impl HotkeyHandler {
    /// Handler with the default bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler without any bindings.
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Space/K toggle, ArrowLeft/J previous, ArrowRight/L next.
    pub fn setup_default_bindings(&mut self) {
        use PlayerAction::*;

        self.add_binding("Space", TogglePlayPause);
        self.add_binding("K", TogglePlayPause);
        self.add_binding("ArrowLeft", Previous);
        self.add_binding("J", Previous);
        self.add_binding("ArrowRight", Next);
        self.add_binding("L", Next);
    }

    pub fn add_binding(&mut self, key: &str, action: PlayerAction) {
        self.bindings.insert(normalize_key(key), action);
    }

    pub fn remove_binding(&mut self, key: &str) {
        self.bindings.remove(&normalize_key(key));
    }

    /// Action bound to a DOM-style `key` value. A single uppercase letter
    /// is a shifted press: `"K"` looks up `Shift+K`, `"k"` looks up `K`.
    pub fn handle_key(&self, key: &str) -> Option<PlayerAction> {
        let mut chars = key.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_uppercase() {
                return self.handle_key_with_modifiers(key, false, true, false);
            }
        }
        self.bindings.get(&normalize_key(key)).copied()
    }

    /// Action bound to `key` with the given modifiers held.
    pub fn handle_key_with_modifiers(
        &self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
    ) -> Option<PlayerAction> {
        let mut combo = String::new();
        if ctrl {
            combo.push_str("Ctrl+");
        }
        if shift {
            combo.push_str("Shift+");
        }
        if alt {
            combo.push_str("Alt+");
        }
        combo.push_str(&normalize_key(key));
        self.bindings.get(&combo).copied()
    }

    /// Take bound key presses out of egui's input so nothing else (focus
    /// navigation, scrolling, buttons) reacts to them. Returns the actions
    /// in press order. Releases of bound keys are swallowed too.
    pub fn consume(&self, input: &mut egui::InputState) -> Vec<PlayerAction> {
        let mut actions = Vec::new();
        input.events.retain(|event| {
            let egui::Event::Key { key, pressed, modifiers, .. } = event else {
                return true;
            };
            let name = format!("{:?}", key);
            let bound = self.handle_key_with_modifiers(&name, modifiers.ctrl, modifiers.shift, modifiers.alt);
            match bound {
                Some(action) => {
                    if *pressed {
                        actions.push(action);
                    }
                    false
                }
                None => true,
            }
        });
        actions
    }
}

/// Canonical key name: `" "` -> `Space`, single letters uppercased,
/// modifier prefixes kept.
pub fn normalize_key(key: &str) -> String {
    let (prefix, name) = match key.rfind('+') {
        Some(pos) if pos + 1 < key.len() => key.split_at(pos + 1),
        _ => ("", key),
    };
    let name = match name {
        " " | "Spacebar" => "Space".to_string(),
        n if n.chars().count() == 1 => n.to_uppercase(),
        n => n.to_string(),
    };
    format!("{}{}", prefix, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let handler = HotkeyHandler::new();
        assert_eq!(handler.handle_key(" "), Some(PlayerAction::TogglePlayPause));
        assert_eq!(handler.handle_key("k"), Some(PlayerAction::TogglePlayPause));
        assert_eq!(handler.handle_key("ArrowLeft"), Some(PlayerAction::Previous));
        assert_eq!(handler.handle_key("j"), Some(PlayerAction::Previous));
        assert_eq!(handler.handle_key("ArrowRight"), Some(PlayerAction::Next));
        assert_eq!(handler.handle_key("l"), Some(PlayerAction::Next));
        assert_eq!(handler.handle_key("x"), None);
        assert_eq!(handler.handle_key("Enter"), None);
    }

    #[test]
    fn test_shifted_letters_are_not_plain_bindings() {
        let mut handler = HotkeyHandler::new();
        assert_eq!(handler.handle_key("K"), None);
        assert_eq!(handler.handle_key("J"), None);
        assert_eq!(handler.handle_key("L"), None);

        handler.add_binding("Shift+L", PlayerAction::Last);
        assert_eq!(handler.handle_key("L"), Some(PlayerAction::Last));
        assert_eq!(handler.handle_key("l"), Some(PlayerAction::Next));
    }

    #[test]
    fn test_modifiers_do_not_match_plain_bindings() {
        let handler = HotkeyHandler::new();
        assert_eq!(handler.handle_key_with_modifiers("K", true, false, false), None);
        assert_eq!(
            handler.handle_key_with_modifiers("K", false, false, false),
            Some(PlayerAction::TogglePlayPause)
        );
    }

    #[test]
    fn test_custom_binding() {
        let mut handler = HotkeyHandler::empty();
        handler.add_binding("Shift+2", PlayerAction::SetSpeed(2.0));
        assert_eq!(
            handler.handle_key_with_modifiers("2", false, true, false),
            Some(PlayerAction::SetSpeed(2.0))
        );
        handler.remove_binding("Shift+2");
        assert_eq!(handler.handle_key_with_modifiers("2", false, true, false), None);
    }

    #[test]
    fn test_consume_removes_bound_keys() {
        let handler = HotkeyHandler::new();
        let mut input = egui::InputState::default();
        let press = |key| egui::Event::Key {
            key,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers: egui::Modifiers::NONE,
        };
        input.events = vec![
            press(egui::Key::ArrowRight),
            press(egui::Key::A),
            press(egui::Key::Space),
        ];

        let actions = handler.consume(&mut input);
        assert_eq!(actions, vec![PlayerAction::Next, PlayerAction::TogglePlayPause]);
        assert_eq!(input.events.len(), 1);
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key(" "), "Space");
        assert_eq!(normalize_key("k"), "K");
        assert_eq!(normalize_key("Ctrl+k"), "Ctrl+K");
        assert_eq!(normalize_key("+"), "+");
        assert_eq!(normalize_key("ArrowLeft"), "ArrowLeft");
    }
}
