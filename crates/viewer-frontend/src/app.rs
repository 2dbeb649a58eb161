//! Viewer application shell

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;

use parking_lot::Mutex;
use tracing::{error, info};

use viewer_core::{FileMap, JointAngles, LoadOutcome, RobotLoader, RobotSource, ViewerController};
use viewer_renderer::Renderer;

use crate::app_state::{AppState, JointInfoStore, SharedRenderer};
use crate::config::ViewerConfig;
use crate::panels::{JointPanel, Panel};
use crate::viewport::ViewportState;

pub struct ViewerApp {
    state: AppState,
    viewport: ViewportState,
    joint_panel: JointPanel,
    load_tx: mpsc::Sender<LoadOutcome>,
    load_rx: mpsc::Receiver<LoadOutcome>,
    loads_in_flight: usize,
}

impl ViewerApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config = ViewerConfig::load();

        let render_state = cc
            .wgpu_render_state
            .as_ref()
            .expect("the viewer requires the wgpu backend");
        let device = render_state.device.clone();
        let queue = render_state.queue.clone();

        let mut renderer = Renderer::new(
            device.clone(),
            queue.clone(),
            render_state.target_format,
            800,
            600,
        );
        let fov_y = config.camera.fov_degrees.to_radians();
        renderer.set_clear_color(config.background);
        {
            let camera = renderer.camera_mut();
            camera.fov_y = fov_y;
            camera.near = config.camera.near_plane;
            camera.far = config.camera.far_plane;
        }
        let shared: SharedRenderer = Arc::new(Mutex::new(renderer));

        let mut controller = match config.pose_seed {
            Some(seed) => ViewerController::with_seed(Arc::clone(&shared), seed),
            None => ViewerController::new(Arc::clone(&shared)),
        };
        controller.set_fov_y(fov_y);

        let joint_store: JointInfoStore = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&joint_store);
        controller.set_observer(Box::new(move |infos| {
            *store.lock() = infos.to_vec();
        }));

        let (load_tx, load_rx) = mpsc::channel();

        let mut app = Self {
            state: AppState {
                controller,
                joint_store,
                status: "No robot loaded".to_string(),
            },
            viewport: ViewportState::new(shared, device, queue),
            joint_panel: JointPanel::new(),
            load_tx,
            load_rx,
            loads_in_flight: 0,
        };

        if let Some(path) = &config.default_urdf {
            app.spawn_load(RobotSource::Path(path.clone()), None);
        }

        app
    }

    /// Kick off a load on a worker thread. The outcome arrives stamped with
    /// the generation taken here; the controller discards it if a newer load
    /// was requested in the meantime.
    fn spawn_load(&mut self, source: RobotSource, uploaded: Option<FileMap>) {
        let label = match &source {
            RobotSource::Path(path) => path.display().to_string(),
            RobotSource::Url(url) => url.clone(),
            RobotSource::Literal(_) => "literal URDF".to_string(),
        };
        info!(source = %label, "starting robot load");
        self.state.status = format!("Loading {label}…");

        let generation = self.state.controller.begin_load();
        self.state.joint_store.lock().clear();

        let tx = self.load_tx.clone();
        std::thread::spawn(move || {
            let loader = RobotLoader::new();
            let result = loader.load(&source, uploaded.as_ref());
            let _ = tx.send(LoadOutcome { generation, result });
        });
        self.loads_in_flight += 1;
    }

    fn poll_loads(&mut self) {
        while let Ok(outcome) = self.load_rx.try_recv() {
            self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
            match self.state.controller.install(outcome) {
                Ok(true) => {
                    let name = self
                        .state
                        .controller
                        .robot_name()
                        .unwrap_or("robot")
                        .to_string();
                    self.state.status = format!("Loaded {name}");
                    // Pose the robot at the published initial angles.
                    let angles = JointAngles::from_infos(&self.state.joint_store.lock());
                    if let Err(e) = self.state.controller.apply_joint_angles(&angles) {
                        error!(error = %e, "failed to apply initial pose");
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    error!(error = %e, "robot load failed");
                    self.state.status = format!("Load failed: {e}");
                }
            }
        }
    }

    fn open_urdf(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("URDF", &["urdf", "URDF", "xml"])
            .pick_file()
        {
            self.spawn_load(RobotSource::Path(path), None);
        }
    }

    /// Pick a URDF plus the mesh files it references; the meshes override
    /// the loader's on-disk fetch for this load, keyed by file name.
    fn open_urdf_with_meshes(&mut self) {
        let Some(urdf) = rfd::FileDialog::new()
            .add_filter("URDF", &["urdf", "URDF", "xml"])
            .pick_file()
        else {
            return;
        };
        let Some(mesh_paths) = rfd::FileDialog::new()
            .add_filter("Meshes", &["stl", "dae", "obj"])
            .pick_files()
        else {
            return;
        };

        match read_file_map(&mesh_paths) {
            Ok(files) => self.spawn_load(RobotSource::Path(urdf), Some(files)),
            Err(e) => {
                error!(error = %e, "failed to read mesh files");
                self.state.status = format!("Failed to read meshes: {e}");
            }
        }
    }

    fn viewport_ui(&mut self, ui: &mut egui::Ui, frame: &eframe::Frame) {
        let available = ui.available_size();
        let (rect, response) =
            ui.allocate_exact_size(available, egui::Sense::click_and_drag());
        let width = rect.width().max(1.0) as u32;
        let height = rect.height().max(1.0) as u32;

        let Some(render_state) = frame.wgpu_render_state() else {
            return;
        };
        let texture_id = {
            let mut egui_renderer = render_state.renderer.write();
            self.viewport.ensure_texture(width, height, &mut egui_renderer)
        };

        if response.dragged() {
            let delta = response.drag_delta();
            let mut renderer = self.viewport.renderer().lock();
            renderer
                .camera_mut()
                .orbit(delta.x * 0.01, delta.y * 0.01);
        }
        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                self.viewport
                    .renderer()
                    .lock()
                    .camera_mut()
                    .zoom((-scroll * 0.002).exp());
            }
        }

        self.viewport.render();
        ui.painter().image(
            texture_id,
            rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        self.poll_loads();

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Open URDF…").clicked() {
                    self.open_urdf();
                }
                if ui.button("Open URDF + meshes…").clicked() {
                    self.open_urdf_with_meshes();
                }
                if ui.button("Reset view").clicked() {
                    self.state.controller.refresh_framing();
                }
                ui.separator();
                if self.loads_in_flight > 0 {
                    ui.spinner();
                }
                ui.label(&self.state.status);
            });
        });

        egui::SidePanel::right("joint_panel")
            .default_width(280.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.joint_panel.ui(ui, &mut self.state);
                });
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                self.viewport_ui(ui, frame);
            });

        // Continuous render loop, independent of loading.
        ctx.request_repaint();
    }
}

fn read_file_map(paths: &[PathBuf]) -> std::io::Result<FileMap> {
    let mut files = FileMap::new();
    for path in paths {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        files.insert(name, std::fs::read(path)?);
    }
    Ok(files)
}
