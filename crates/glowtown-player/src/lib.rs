//! Glowtown Player - interactive viewer for the HDR bloom scene
//!
//! This crate provides the `GlowtownApp` application handler along with the
//! input mapping, frame clock and egui parameter windows it drives.

mod app;
pub mod clock;
pub mod input;
mod ui;

pub use app::GlowtownApp;
pub use clock::FrameClock;
pub use input::{action_for_key, apply_action, Action, InputState};
