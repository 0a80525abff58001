//! The viewer context
//!
//! Owns the scene, camera, controls, parameter panel, simplification driver
//! and model loader. All state changes happen on the caller's thread; only
//! OBJ parsing runs in the background.

use crate::background::{clears_background, BackgroundImage};
use crate::camera::Camera;
use crate::cinematic::CinematicView;
use crate::config::ViewerConfig;
use crate::controls::{OrbitControls, TransformControls, TransformMode};
use crate::download::{DownloadFile, DownloadSink};
use crate::loader::{LoadMode, LoadOutcome, ModelLoader};
use crate::panel::ParameterPanel;
use crate::render::{RenderBackend, RenderFrame};
use crate::scene::{ObjectContent, Scene};
use crate::{ViewerError, ViewerResult};
use meshlod_core::{Model, Point3f, TorusKnot, Vector3f};
use meshlod_io::{export_meshes, ExportFormat, NamedGeometry};
use meshlod_simplification::{SimplificationDriver, SimplificationParameters, SimplificationReport};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Built-in knot shown by [`Viewer::load_model_for_simplification_test`]
pub const TEST_KNOT: TorusKnot = TorusKnot {
    radius: 5.0,
    tube: 2.5,
    tubular_segments: 124,
    radial_segments: 32,
    p: 2,
    q: 3,
};

/// What the scene currently shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Nothing loaded yet
    Empty,
    /// Model as loaded, translate controls, panel hidden
    Plain,
    /// Destination geometries as wireframe, rotate controls, panel shown
    Simplify,
}

pub struct Viewer<B: RenderBackend, S: DownloadSink> {
    config: ViewerConfig,
    backend: B,
    sink: S,
    scene: Scene,
    camera: Camera,
    cinematic: CinematicView,
    transform_controls: TransformControls,
    orbit_controls: OrbitControls,
    panel: ParameterPanel,
    params: SimplificationParameters,
    driver: SimplificationDriver,
    loader: ModelLoader,
    mode: DisplayMode,
    render_loop_started: bool,
    last_report: Option<SimplificationReport>,
}

impl<B: RenderBackend, S: DownloadSink> Viewer<B, S> {
    /// Create the scene, hidden parameter panel and default parameters.
    ///
    /// A missing initial background is logged and skipped.
    pub fn register(config: ViewerConfig, mut backend: B, sink: S) -> ViewerResult<Self> {
        config.validate()?;
        backend.resize(config.width, config.height)?;

        let mut viewer = Self {
            scene: Scene::new(&config),
            camera: Camera::from_config(&config.camera, config.aspect()),
            cinematic: CinematicView::new(&config.cinematic),
            transform_controls: TransformControls::new(),
            orbit_controls: OrbitControls::new(),
            panel: ParameterPanel::new(),
            params: config.parameters.clamped(),
            driver: SimplificationDriver::default(),
            loader: ModelLoader::new(),
            mode: DisplayMode::Empty,
            render_loop_started: false,
            last_report: None,
            config,
            backend,
            sink,
        };

        if let Some(name) = viewer.config.background.initial.clone() {
            if let Err(e) = viewer.change_background(&name) {
                warn!(background = %name, error = %e, "initial background unavailable");
            }
        }
        info!(width = viewer.config.width, height = viewer.config.height, "viewer registered");
        Ok(viewer)
    }

    /// Begin ticking. Only one render loop may exist.
    pub fn start_render_loop(&mut self) -> ViewerResult<()> {
        if self.render_loop_started {
            return Err(ViewerError::RenderLoopAlreadyStarted);
        }
        self.render_loop_started = true;
        info!("render loop started");
        Ok(())
    }

    pub fn is_render_loop_started(&self) -> bool {
        self.render_loop_started
    }

    /// One display refresh on the cinematic clock. Returns false before the
    /// render loop has started.
    pub fn tick(&mut self) -> ViewerResult<bool> {
        if !self.render_loop_started {
            return Ok(false);
        }
        self.apply_completed_loads();
        self.cinematic.update(&mut self.camera);
        self.render()?;
        Ok(true)
    }

    /// One display refresh with the cinematic policy evaluated at `elapsed`
    /// seconds
    pub fn tick_at(&mut self, elapsed: f32) -> ViewerResult<bool> {
        if !self.render_loop_started {
            return Ok(false);
        }
        self.apply_completed_loads();
        self.cinematic.apply_at(&mut self.camera, elapsed);
        self.render()?;
        Ok(true)
    }

    fn render(&mut self) -> ViewerResult<()> {
        let frame = RenderFrame {
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(),
            camera_position: self.camera.position,
            clear_color: self.scene.clear_color,
            background: self.scene.background(),
            lighting: &self.scene.lighting,
            meshes: self.scene.render_meshes(),
            panel_visible: self.panel.is_visible(),
        };
        self.backend.render(&frame)
    }

    /// Load an OBJ model for plain display. Returns the load generation.
    pub fn load_model(&mut self, bytes: &[u8]) -> ViewerResult<u64> {
        info!(bytes = bytes.len(), "loading model");
        self.loader.request(bytes.to_vec(), LoadMode::Plain)
    }

    /// Show the built-in torus knot under simplification. The bytes are
    /// ignored.
    pub fn load_model_for_simplification_test(&mut self, _bytes: &[u8]) -> ViewerResult<u64> {
        info!("loading simplification test knot");
        let knot = NamedGeometry::new("torus_knot", TEST_KNOT.build());
        let outcome = self.loader.resolve_now(LoadMode::Simplify, vec![knot]);
        let generation = outcome.generation;
        self.apply_outcome(outcome)?;
        Ok(generation)
    }

    /// Load an OBJ model and simplify each of its sub-meshes
    pub fn load_model_for_simplification(&mut self, bytes: &[u8]) -> ViewerResult<u64> {
        info!(bytes = bytes.len(), "loading model for simplification");
        self.loader.request(bytes.to_vec(), LoadMode::Simplify)
    }

    pub fn has_pending_load(&self) -> bool {
        self.loader.is_pending()
    }

    /// Block until the pending load is applied. Returns `Ok(false)` when
    /// nothing was pending or the wait timed out, and the load error when
    /// the newest load failed (the scene is left untouched).
    pub fn wait_for_pending_load(&mut self, timeout: Duration) -> ViewerResult<bool> {
        match self.loader.wait(timeout)? {
            Some(outcome) => self.apply_outcome(outcome).map(|()| true),
            None => Ok(false),
        }
    }

    fn apply_completed_loads(&mut self) {
        if let Some(outcome) = self.loader.poll() {
            // Already logged; the previous display stays
            let _ = self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: LoadOutcome) -> ViewerResult<()> {
        let LoadOutcome {
            generation,
            mode,
            result,
        } = outcome;
        let meshes = result.map_err(|e| {
            error!(generation, error = %e, "model load failed");
            e
        })?;

        match mode {
            LoadMode::Plain => {
                let id = self.scene.replace_root("model", ObjectContent::Meshes(meshes));
                self.transform_controls.attach(id);
                self.transform_controls.set_mode(TransformMode::Translate);
                self.panel.set_visible(false);
                self.last_report = None;
                self.mode = DisplayMode::Plain;
            }
            LoadMode::Simplify => {
                let mut model = Model::from_geometries(meshes.into_iter().map(|m| (m.name, m.geometry)))
                    .map_err(|e| {
                        error!(generation, error = %e, "model rejected for simplification");
                        ViewerError::from(e)
                    })?;
                let report = self.driver.simplify(&mut model, &self.params).map_err(|e| {
                    error!(generation, error = %e, "initial simplification failed");
                    ViewerError::from(e)
                })?;
                let id = self
                    .scene
                    .replace_root("simplified", ObjectContent::Simplification(model));
                self.transform_controls.attach(id);
                self.transform_controls.set_mode(TransformMode::Rotate);
                self.panel.set_visible(true);
                self.last_report = Some(report);
                self.mode = DisplayMode::Simplify;
            }
        }
        self.orbit_controls.sync_with(&self.transform_controls);
        info!(
            generation,
            mode = ?self.mode,
            triangles = self.scene.root().map_or(0, |o| o.triangle_count()),
            "model applied"
        );
        Ok(())
    }

    /// Replace the scene background. `""` or `"none"` clears it; a missing
    /// or undecodable image leaves the current background in place.
    pub fn change_background(&mut self, name: &str) -> ViewerResult<()> {
        if clears_background(name) {
            self.scene.set_background(None);
            debug!("background cleared");
            return Ok(());
        }
        let path = self.config.background.path_for(name);
        match BackgroundImage::load(name, &path) {
            Ok(image) => {
                info!(background = name, "background changed");
                self.scene.set_background(Some(image));
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "background not loaded");
                Err(e)
            }
        }
    }

    /// Toggle the cinematic camera. The orbit centre is taken from the
    /// displayed objects now and kept until the next toggle.
    pub fn set_cinematic_view(&mut self, enabled: bool) {
        let bounds = self.scene.bounding_box();
        let center = if bounds.is_empty() {
            Point3f::origin()
        } else {
            bounds.center()
        };
        self.cinematic.set_enabled(enabled, center);
        info!(enabled, "cinematic view");
    }

    /// Export the displayed scene as `<file_name><file_type>`. Unknown file
    /// types deliver nothing and return `Ok(false)`.
    pub fn download_model(&mut self, file_name: &str, file_type: &str) -> ViewerResult<bool> {
        let Some(format) = ExportFormat::from_extension(file_type) else {
            debug!(file_type, "unsupported export type ignored");
            return Ok(false);
        };
        let payload = export_meshes(&self.scene.export_meshes(), format, &self.config.export)?;
        let file_name = format!("{}{}", file_name, format.extension());
        info!(file = %file_name, bytes = payload.len(), "download ready");
        self.sink.deliver(DownloadFile::new(file_name, payload))?;
        Ok(true)
    }

    pub fn parameters(&self) -> &SimplificationParameters {
        &self.params
    }

    /// Replace the parameters; in simplify mode every pair is recomputed
    pub fn set_parameters(&mut self, params: SimplificationParameters) -> ViewerResult<()> {
        self.params = params.clamped();
        self.resimplify()
    }

    /// Edit the parameters in place, then recompute as [`Self::set_parameters`]
    pub fn update_parameters<F>(&mut self, update: F) -> ViewerResult<()>
    where
        F: FnOnce(&mut SimplificationParameters),
    {
        let mut params = self.params;
        update(&mut params);
        self.set_parameters(params)
    }

    /// Draw the parameter panel and recompute on change. Returns whether
    /// anything changed.
    pub fn show_panel(&mut self, ctx: &egui::Context) -> ViewerResult<bool> {
        let changed = self.panel.show(ctx, &mut self.params);
        self.after_panel(changed)
    }

    /// Draw the parameter controls into a host-owned `ui`, regardless of
    /// panel visibility. Recomputes the model when a value changed.
    pub fn panel_ui(&mut self, ui: &mut egui::Ui) -> ViewerResult<bool> {
        let changed = self.panel.ui(ui, &mut self.params);
        self.after_panel(changed)
    }

    fn after_panel(&mut self, changed: bool) -> ViewerResult<bool> {
        if !changed {
            return Ok(false);
        }
        debug!(params = ?self.params, "panel changed parameters");
        self.resimplify()?;
        Ok(true)
    }

    fn resimplify(&mut self) -> ViewerResult<()> {
        if self.mode != DisplayMode::Simplify {
            return Ok(());
        }
        let Some(model) = self.scene.root_mut().and_then(|o| o.model_mut()) else {
            return Ok(());
        };
        let report = self.driver.simplify(model, &self.params)?;
        debug!(
            count = report.total_count(),
            source_count = report.total_source_count(),
            error = report.max_error(),
            "model simplified"
        );
        self.last_report = Some(report);
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> ViewerResult<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.config.width = width;
        self.config.height = height;
        self.camera.set_viewport(width, height);
        self.backend.resize(width, height)
    }

    /// Start dragging the attached object
    pub fn begin_drag(&mut self) -> bool {
        let started = self.transform_controls.begin_drag();
        self.orbit_controls.sync_with(&self.transform_controls);
        started
    }

    /// Move or rotate the attached object by one drag step
    pub fn drag(&mut self, delta: Vector3f) {
        let Some(id) = self.transform_controls.attached() else {
            return;
        };
        if let Some(object) = self.scene.object_mut(id) {
            self.transform_controls.apply_drag(&mut object.transform, &delta);
        }
    }

    pub fn end_drag(&mut self) {
        self.transform_controls.end_drag();
        self.orbit_controls.sync_with(&self.transform_controls);
    }

    /// Orbit the camera by a mouse movement in pixels
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) -> bool {
        self.orbit_controls.orbit(&mut self.camera, delta_x, delta_y)
    }

    pub fn zoom(&mut self, scroll: f32) -> bool {
        self.orbit_controls.zoom(&mut self.camera, scroll)
    }

    /// Tear the viewer down, cancelling any in-flight load
    pub fn dispose(mut self) -> (B, S) {
        self.loader.cancel_pending();
        self.scene.clear();
        self.transform_controls.detach();
        info!("viewer disposed");
        (self.backend, self.sink)
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn cinematic(&self) -> &CinematicView {
        &self.cinematic
    }

    pub fn transform_controls(&self) -> &TransformControls {
        &self.transform_controls
    }

    pub fn orbit_controls(&self) -> &OrbitControls {
        &self.orbit_controls
    }

    pub fn panel(&self) -> &ParameterPanel {
        &self.panel
    }

    /// Report of the latest recomputation in simplify mode
    pub fn last_report(&self) -> Option<&SimplificationReport> {
        self.last_report.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::MemorySink;
    use crate::render::HeadlessBackend;

    fn viewer() -> Viewer<HeadlessBackend, MemorySink> {
        Viewer::register(ViewerConfig::headless(), HeadlessBackend::default(), MemorySink::new()).unwrap()
    }

    #[test]
    fn test_register_starts_empty() {
        let viewer = viewer();
        assert_eq!(viewer.mode(), DisplayMode::Empty);
        assert!(!viewer.panel().is_visible());
        assert_eq!(viewer.backend().size(), (1200, 800));
        assert_eq!(*viewer.parameters(), SimplificationParameters::default());
    }

    #[test]
    fn test_missing_initial_background_is_not_fatal() {
        let mut config = ViewerConfig::default();
        config.background.resource_root = "/nonexistent".into();
        let viewer = Viewer::register(config, HeadlessBackend::default(), MemorySink::new()).unwrap();
        assert!(viewer.scene().background().is_none());
    }

    #[test]
    fn test_tick_before_start_does_nothing() {
        let mut viewer = viewer();
        assert!(!viewer.tick().unwrap());
        assert_eq!(viewer.backend().frames(), 0);
    }

    #[test]
    fn test_simplification_test_knot() {
        let mut viewer = viewer();
        viewer.load_model_for_simplification_test(&[]).unwrap();
        assert_eq!(viewer.mode(), DisplayMode::Simplify);
        assert!(viewer.panel().is_visible());
        assert_eq!(viewer.transform_controls().mode(), TransformMode::Rotate);

        let report = viewer.last_report().unwrap();
        assert_eq!(report.pairs.len(), 1);
        assert_eq!(report.pairs[0].source_count, 124 * 32 * 6);
    }

    #[test]
    fn test_parameter_change_resimplifies() {
        let mut viewer = viewer();
        viewer.load_model_for_simplification_test(&[]).unwrap();
        let full = viewer.last_report().unwrap().total_count();

        viewer
            .update_parameters(|p| {
                p.set_ratio(0.25);
                p.set_error(0.25);
            })
            .unwrap();
        let reduced = viewer.last_report().unwrap().total_count();
        assert!(reduced < full);
        assert_eq!(viewer.scene().root().unwrap().triangle_count() * 3, reduced);
    }

    #[test]
    fn test_drag_moves_attached_object() {
        let mut viewer = viewer();
        viewer
            .load_model(b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n")
            .unwrap();
        viewer.wait_for_pending_load(Duration::from_secs(10)).unwrap();

        assert!(viewer.begin_drag());
        assert!(!viewer.orbit_controls().is_enabled());
        viewer.drag(Vector3f::new(0.0, 2.0, 0.0));
        viewer.end_drag();
        assert!(viewer.orbit_controls().is_enabled());

        let root = viewer.scene().root().unwrap();
        assert_eq!(root.transform.translation, Vector3f::new(0.0, 2.0, 0.0));
    }
}
