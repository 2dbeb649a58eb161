//! Shared application state

use std::sync::Arc;

use parking_lot::Mutex;

use viewer_core::{JointInfo, ViewerController};
use viewer_renderer::Renderer;

/// Renderer handle shared between the controller and the viewport.
pub type SharedRenderer = Arc<Mutex<Renderer>>;

/// Joint-info store the controller publishes into; panels read and edit it.
pub type JointInfoStore = Arc<Mutex<Vec<JointInfo>>>;

pub struct AppState {
    pub controller: ViewerController<SharedRenderer>,
    pub joint_store: JointInfoStore,
    /// Last load/actuation status shown in the top bar.
    pub status: String,
}
