//! Keyboard and mouse input: held-key tracking plus one-shot key actions

use glowtown_core::{CameraMovement, EffectSelector, ProgramState};
use std::collections::HashSet;
use winit::keyboard::KeyCode;

/// Multiplier applied to exposure per Q/E press
pub const EXPOSURE_STEP: f32 = 1.1;

/// Tracks held keys and accumulated mouse motion for one frame
#[derive(Default)]
pub struct InputState {
    keys_down: HashSet<KeyCode>,
    /// Raw accumulated mouse delta
    raw_mouse_delta: (f64, f64),
    /// Accumulated scroll in lines, positive away from the user
    scroll_delta: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_key_down(&mut self, key: KeyCode) {
        self.keys_down.insert(key);
    }

    pub fn process_key_up(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    pub fn process_mouse_raw_delta(&mut self, dx: f64, dy: f64) {
        self.raw_mouse_delta.0 += dx;
        self.raw_mouse_delta.1 += dy;
    }

    pub fn process_scroll(&mut self, lines: f32) {
        self.scroll_delta += lines;
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Camera movements for the WASD keys currently held
    pub fn movements(&self) -> Vec<CameraMovement> {
        [
            (KeyCode::KeyW, CameraMovement::Forward),
            (KeyCode::KeyS, CameraMovement::Backward),
            (KeyCode::KeyA, CameraMovement::Left),
            (KeyCode::KeyD, CameraMovement::Right),
        ]
        .into_iter()
        .filter(|(key, _)| self.is_key_down(*key))
        .map(|(_, movement)| movement)
        .collect()
    }

    pub fn mouse_delta(&self) -> (f64, f64) {
        self.raw_mouse_delta
    }

    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }

    /// Release every key, e.g. when the window loses focus
    pub fn clear_keys(&mut self) {
        self.keys_down.clear();
    }

    /// Call at end of frame to clear per-frame state
    pub fn end_frame(&mut self) {
        self.raw_mouse_delta = (0.0, 0.0);
        self.scroll_delta = 0.0;
    }
}

/// One-shot key bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    ToggleUi,
    ToggleHdr,
    ToggleBloom,
    ExposureDown,
    ExposureUp,
    SelectEffect(EffectSelector),
    ToggleWireframe,
}

pub fn action_for_key(key: KeyCode) -> Option<Action> {
    let action = match key {
        KeyCode::Escape => Action::Quit,
        KeyCode::F1 => Action::ToggleUi,
        KeyCode::F2 => Action::ToggleWireframe,
        KeyCode::KeyH => Action::ToggleHdr,
        KeyCode::KeyB => Action::ToggleBloom,
        KeyCode::KeyQ => Action::ExposureDown,
        KeyCode::KeyE => Action::ExposureUp,
        KeyCode::Digit1 => Action::SelectEffect(EffectSelector::None),
        KeyCode::Digit2 => Action::SelectEffect(EffectSelector::Blur),
        KeyCode::Digit3 => Action::SelectEffect(EffectSelector::Tint),
        _ => return None,
    };
    Some(action)
}

/// Apply a state-changing action. `Quit` is left to the caller.
pub fn apply_action(state: &mut ProgramState, action: Action) {
    if action == Action::ToggleUi {
        state.toggle_ui();
        return;
    }
    let post = &mut state.post;
    match action {
        Action::Quit | Action::ToggleUi => {}
        Action::ToggleHdr => post.hdr_enabled = !post.hdr_enabled,
        Action::ToggleBloom => post.bloom_enabled = !post.bloom_enabled,
        Action::ExposureDown => post.scale_exposure(1.0 / EXPOSURE_STEP),
        Action::ExposureUp => post.scale_exposure(EXPOSURE_STEP),
        Action::SelectEffect(effect) => post.effect = effect,
        Action::ToggleWireframe => post.polygon_mode = post.polygon_mode.toggled(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowtown_core::PolygonMode;

    #[test]
    fn held_keys_map_to_movements() {
        let mut input = InputState::new();
        input.process_key_down(KeyCode::KeyW);
        input.process_key_down(KeyCode::KeyD);
        input.process_key_down(KeyCode::KeyX);
        assert_eq!(
            input.movements(),
            vec![CameraMovement::Forward, CameraMovement::Right]
        );

        input.process_key_up(KeyCode::KeyW);
        assert_eq!(input.movements(), vec![CameraMovement::Right]);
    }

    #[test]
    fn mouse_motion_accumulates_until_end_of_frame() {
        let mut input = InputState::new();
        input.process_mouse_raw_delta(2.0, -1.0);
        input.process_mouse_raw_delta(3.0, -1.0);
        input.process_scroll(1.0);
        assert_eq!(input.mouse_delta(), (5.0, -2.0));
        assert_eq!(input.scroll_delta(), 1.0);

        input.end_frame();
        assert_eq!(input.mouse_delta(), (0.0, 0.0));
        assert_eq!(input.scroll_delta(), 0.0);
    }

    #[test]
    fn key_bindings() {
        assert_eq!(action_for_key(KeyCode::Escape), Some(Action::Quit));
        assert_eq!(action_for_key(KeyCode::F1), Some(Action::ToggleUi));
        assert_eq!(
            action_for_key(KeyCode::Digit2),
            Some(Action::SelectEffect(EffectSelector::Blur))
        );
        assert_eq!(action_for_key(KeyCode::KeyW), None);
    }

    #[test]
    fn actions_edit_program_state() {
        let mut state = ProgramState::default();
        let hdr = state.post.hdr_enabled;

        apply_action(&mut state, Action::ToggleHdr);
        assert_eq!(state.post.hdr_enabled, !hdr);

        apply_action(&mut state, Action::ExposureUp);
        assert!((state.post.exposure - EXPOSURE_STEP).abs() < 1e-6);
        apply_action(&mut state, Action::ExposureDown);
        assert!((state.post.exposure - 1.0).abs() < 1e-5);

        apply_action(&mut state, Action::SelectEffect(EffectSelector::Tint));
        assert_eq!(state.post.effect, EffectSelector::Tint);

        apply_action(&mut state, Action::ToggleWireframe);
        assert_eq!(state.post.polygon_mode, PolygonMode::Line);
    }

    #[test]
    fn toggling_ui_releases_mouse_look() {
        let mut state = ProgramState::default();
        assert!(!state.ui_enabled);
        assert!(state.mouse_look);

        apply_action(&mut state, Action::ToggleUi);
        assert!(state.ui_enabled);
        assert!(!state.mouse_look);
    }
}
