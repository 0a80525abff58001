//! Scene graph of the viewer
//!
//! The scene holds at most one root object, replaced wholesale on every
//! successful load. A root either carries meshes as loaded (plain display) or
//! a simplification model whose destination geometries are displayed.

use crate::background::BackgroundImage;
use crate::config::{LightingConfig, ViewerConfig};
use crate::render::RenderMesh;
use meshlod_core::{Aabb, BufferGeometry, Model, ObjectTransform};
use meshlod_io::NamedGeometry;

/// Identity of a scene object, unique for the lifetime of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Material {
    /// Lit surface
    Shaded,
    /// Unlit edges
    Wireframe,
}

#[derive(Debug, Clone)]
pub enum ObjectContent {
    Meshes(Vec<NamedGeometry>),
    Simplification(Model),
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    id: ObjectId,
    name: String,
    pub transform: ObjectTransform,
    content: ObjectContent,
}

impl SceneObject {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &ObjectContent {
        &self.content
    }

    pub fn model(&self) -> Option<&Model> {
        match &self.content {
            ObjectContent::Simplification(model) => Some(model),
            ObjectContent::Meshes(_) => None,
        }
    }

    pub fn model_mut(&mut self) -> Option<&mut Model> {
        match &mut self.content {
            ObjectContent::Simplification(model) => Some(model),
            ObjectContent::Meshes(_) => None,
        }
    }

    pub fn material(&self) -> Material {
        match self.content {
            ObjectContent::Meshes(_) => Material::Shaded,
            ObjectContent::Simplification(_) => Material::Wireframe,
        }
    }

    /// Displayed geometries in object space
    pub fn geometries(&self) -> Vec<(&str, &BufferGeometry)> {
        match &self.content {
            ObjectContent::Meshes(meshes) => meshes
                .iter()
                .map(|m| (m.name.as_str(), &m.geometry))
                .collect(),
            ObjectContent::Simplification(model) => model
                .pairs()
                .iter()
                .map(|p| (p.name(), p.destination()))
                .collect(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.geometries().iter().map(|(_, g)| g.triangle_count()).sum()
    }

    /// World-space bounds of all displayed geometries
    pub fn bounding_box(&self) -> Aabb {
        self.geometries()
            .iter()
            .fold(Aabb::empty(), |acc, (_, g)| acc.union(&g.bounding_box()))
            .transformed(&self.transform)
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    root: Option<SceneObject>,
    next_id: u64,
    background: Option<BackgroundImage>,
    pub lighting: LightingConfig,
    pub clear_color: u32,
}

impl Scene {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            root: None,
            next_id: 1,
            background: None,
            lighting: config.lighting,
            clear_color: config.clear_color,
        }
    }

    /// Tear down the current root and install a new one
    pub fn replace_root(&mut self, name: impl Into<String>, content: ObjectContent) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.root = Some(SceneObject {
            id,
            name: name.into(),
            transform: ObjectTransform::identity(),
            content,
        });
        id
    }

    pub fn clear(&mut self) {
        self.root = None;
    }

    pub fn root(&self) -> Option<&SceneObject> {
        self.root.as_ref()
    }

    pub fn root_mut(&mut self) -> Option<&mut SceneObject> {
        self.root.as_mut()
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.root.as_ref().filter(|o| o.id == id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.root.as_mut().filter(|o| o.id == id)
    }

    pub fn object_count(&self) -> usize {
        usize::from(self.root.is_some())
    }

    pub fn bounding_box(&self) -> Aabb {
        self.root
            .as_ref()
            .map_or_else(Aabb::empty, SceneObject::bounding_box)
    }

    pub fn background(&self) -> Option<&BackgroundImage> {
        self.background.as_ref()
    }

    pub fn set_background(&mut self, background: Option<BackgroundImage>) {
        self.background = background;
    }

    pub fn render_meshes(&self) -> Vec<RenderMesh<'_>> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        let model_matrix = root.transform.to_matrix();
        let material = root.material();
        root.geometries()
            .into_iter()
            .map(|(name, geometry)| RenderMesh {
                name,
                geometry,
                model_matrix,
                material,
            })
            .collect()
    }

    /// Displayed geometries moved into world space, for the exporters
    pub fn export_meshes(&self) -> Vec<NamedGeometry> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        root.geometries()
            .into_iter()
            .map(|(name, geometry)| NamedGeometry::new(name, geometry.transformed(&root.transform)))
            .collect()
    }
}
