//! Object manipulation and camera orbit controls

use crate::camera::Camera;
use crate::scene::ObjectId;
use meshlod_core::{ObjectTransform, Vector3f};

/// What a transform drag does to the attached object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMode {
    Translate,
    Rotate,
}

/// Gizmo-style controls bound to at most one scene object
#[derive(Debug, Clone)]
pub struct TransformControls {
    attached: Option<ObjectId>,
    mode: TransformMode,
    dragging: bool,
}

impl Default for TransformControls {
    fn default() -> Self {
        Self {
            attached: None,
            mode: TransformMode::Translate,
            dragging: false,
        }
    }
}

impl TransformControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to `id`, releasing any previous object
    pub fn attach(&mut self, id: ObjectId) {
        self.detach();
        self.attached = Some(id);
    }

    pub fn detach(&mut self) {
        self.attached = None;
        self.dragging = false;
    }

    pub fn attached(&self) -> Option<ObjectId> {
        self.attached
    }

    pub fn mode(&self) -> TransformMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TransformMode) {
        self.mode = mode;
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Start a drag. Returns false when nothing is attached.
    pub fn begin_drag(&mut self) -> bool {
        self.dragging = self.attached.is_some();
        self.dragging
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    /// Apply one drag step: a world offset in translate mode, an axis-angle
    /// vector in rotate mode
    pub fn apply_drag(&self, transform: &mut ObjectTransform, delta: &Vector3f) {
        if !self.dragging {
            return;
        }
        match self.mode {
            TransformMode::Translate => transform.translate(delta),
            TransformMode::Rotate => transform.rotate(delta),
        }
    }
}

/// Mouse orbit and wheel zoom around the camera target
#[derive(Debug, Clone)]
pub struct OrbitControls {
    enabled: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            enabled: true,
            rotate_speed: 0.01,
            zoom_speed: 0.1,
        }
    }
}

impl OrbitControls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Orbiting is suspended while a transform drag is in progress
    pub fn sync_with(&mut self, transform: &TransformControls) {
        self.enabled = !transform.is_dragging();
    }

    /// Orbit by a mouse movement in pixels
    pub fn orbit(&self, camera: &mut Camera, delta_x: f32, delta_y: f32) -> bool {
        if !self.enabled {
            return false;
        }
        camera.orbit(delta_x * self.rotate_speed, delta_y * self.rotate_speed);
        true
    }

    /// Zoom by wheel lines; positive moves closer
    pub fn zoom(&self, camera: &mut Camera, scroll: f32) -> bool {
        if !self.enabled {
            return false;
        }
        camera.zoom(scroll * self.zoom_speed);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_attach_replaces_previous() {
        let mut controls = TransformControls::new();
        controls.attach(ObjectId(1));
        controls.attach(ObjectId(2));
        assert_eq!(controls.attached(), Some(ObjectId(2)));
        controls.detach();
        assert_eq!(controls.attached(), None);
    }

    #[test]
    fn test_drag_requires_attachment() {
        let mut controls = TransformControls::new();
        assert!(!controls.begin_drag());
        controls.attach(ObjectId(1));
        assert!(controls.begin_drag());

        let mut transform = ObjectTransform::identity();
        controls.apply_drag(&mut transform, &Vector3f::new(1.0, 0.0, 0.0));
        assert_relative_eq!(transform.translation, Vector3f::new(1.0, 0.0, 0.0));

        controls.end_drag();
        controls.apply_drag(&mut transform, &Vector3f::new(1.0, 0.0, 0.0));
        assert_relative_eq!(transform.translation, Vector3f::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_rotate_mode() {
        let mut controls = TransformControls::new();
        controls.attach(ObjectId(1));
        controls.set_mode(TransformMode::Rotate);
        controls.begin_drag();
        let mut transform = ObjectTransform::identity();
        controls.apply_drag(&mut transform, &Vector3f::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));
        assert_relative_eq!(transform.translation, Vector3f::zeros());
        assert_relative_eq!(transform.rotation.angle(), std::f32::consts::FRAC_PI_2, epsilon = 1e-5);
    }

    #[test]
    fn test_orbit_disabled_while_dragging() {
        let mut transform = TransformControls::new();
        transform.attach(ObjectId(1));
        transform.begin_drag();

        let mut orbit = OrbitControls::new();
        orbit.sync_with(&transform);
        let mut camera = Camera::default();
        let before = camera.position;
        assert!(!orbit.orbit(&mut camera, 50.0, 0.0));
        assert_eq!(camera.position, before);

        transform.end_drag();
        orbit.sync_with(&transform);
        assert!(orbit.orbit(&mut camera, 50.0, 0.0));
        assert_ne!(camera.position, before);
    }
}
