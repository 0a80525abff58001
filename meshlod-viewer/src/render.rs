//! Rendering seam
//!
//! The viewer builds a [`RenderFrame`] every tick and hands it to a
//! [`RenderBackend`]. Window and GPU ownership stay with the host.

use crate::background::BackgroundImage;
use crate::config::LightingConfig;
use crate::scene::Material;
use crate::ViewerResult;
use meshlod_core::{BufferGeometry, Matrix4, Point3f};

/// One drawable geometry with its world transform
#[derive(Debug, Clone)]
pub struct RenderMesh<'a> {
    pub name: &'a str,
    pub geometry: &'a BufferGeometry,
    pub model_matrix: Matrix4<f32>,
    pub material: Material,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone)]
pub struct RenderFrame<'a> {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    pub camera_position: Point3f,
    /// 0xRRGGBB, used when there is no background image
    pub clear_color: u32,
    pub background: Option<&'a BackgroundImage>,
    pub lighting: &'a LightingConfig,
    pub meshes: Vec<RenderMesh<'a>>,
    pub panel_visible: bool,
}

impl RenderFrame<'_> {
    /// Triangles inside the draw ranges of all meshes
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.geometry.triangle_count()).sum()
    }
}

/// Rendering engine driven by the viewer
pub trait RenderBackend {
    fn resize(&mut self, width: u32, height: u32) -> ViewerResult<()>;

    fn render(&mut self, frame: &RenderFrame<'_>) -> ViewerResult<()>;
}

/// Summary of the last rendered frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStats {
    pub mesh_count: usize,
    pub triangle_count: usize,
    pub wireframe_count: usize,
    pub has_background: bool,
    pub panel_visible: bool,
    pub camera_position: Point3f,
}

/// Backend that draws nothing and records frame statistics
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    width: u32,
    height: u32,
    frames: u64,
    last_frame: Option<FrameStats>,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_frame(&self) -> Option<&FrameStats> {
        self.last_frame.as_ref()
    }
}

impl RenderBackend for HeadlessBackend {
    fn resize(&mut self, width: u32, height: u32) -> ViewerResult<()> {
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn render(&mut self, frame: &RenderFrame<'_>) -> ViewerResult<()> {
        self.frames += 1;
        self.last_frame = Some(FrameStats {
            mesh_count: frame.meshes.len(),
            triangle_count: frame.triangle_count(),
            wireframe_count: frame
                .meshes
                .iter()
                .filter(|m| m.material == Material::Wireframe)
                .count(),
            has_background: frame.background.is_some(),
            panel_visible: frame.panel_visible,
            camera_position: frame.camera_position,
        });
        Ok(())
    }
}
