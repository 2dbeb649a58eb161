//! UI panels

mod joints;

pub use joints::JointPanel;

use crate::app_state::AppState;

/// A side panel of the viewer window.
pub trait Panel {
    fn name(&self) -> &str;
    fn ui(&mut self, ui: &mut egui::Ui, state: &mut AppState);
}
