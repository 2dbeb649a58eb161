//! Joint slider panel

use viewer_core::JointAngles;

use crate::app_state::AppState;
use crate::panels::Panel;

/// Degree sliders for every joint of the loaded robot.
pub struct JointPanel;

impl JointPanel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JointPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel for JointPanel {
    fn name(&self) -> &str {
        "Joints"
    }

    fn ui(&mut self, ui: &mut egui::Ui, state: &mut AppState) {
        let mut infos = state.joint_store.lock();

        if infos.is_empty() {
            ui.weak("No robot loaded");
            return;
        }

        ui.heading("Joints");
        ui.separator();

        let mut changed = false;
        for info in infos.iter_mut() {
            ui.label(&info.name);
            let slider = egui::Slider::new(&mut info.degree, info.lower..=info.upper).suffix("°");
            if ui.add(slider).changed() {
                changed = true;
            }
        }

        ui.separator();
        if ui.button("Reset pose").clicked() {
            for info in infos.iter_mut() {
                info.degree = 0.max(info.lower).min(info.upper);
            }
            changed = true;
        }

        if changed {
            let angles = JointAngles::from_infos(&infos);
            drop(infos);
            if let Err(e) = state.controller.apply_joint_angles(&angles) {
                tracing::error!(error = %e, "failed to apply joint angles");
                state.status = e.to_string();
            }
        }
    }
}
