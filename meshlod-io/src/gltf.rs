//! glTF 2.0 export as a single JSON document with an embedded buffer

use crate::{IoError, IoResult, NamedGeometry};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use meshlod_core::flatten_points;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const TRIANGLES: u32 = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gltf {
    pub asset: Asset,
    pub scene: usize,
    pub scenes: Vec<Scene>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<Mesh>,
    pub accessors: Vec<Accessor>,
    #[serde(rename = "bufferViews")]
    pub buffer_views: Vec<BufferView>,
    pub buffers: Vec<Buffer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub version: String,
    pub generator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub mesh: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Primitive {
    pub attributes: BTreeMap<String, usize>,
    pub indices: usize,
    pub mode: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    pub buffer_view: usize,
    pub component_type: u32,
    pub count: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub target: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub uri: String,
    pub byte_length: usize,
}

/// Accumulates the binary buffer, views and accessors
struct Builder {
    data: Vec<u8>,
    views: Vec<BufferView>,
    accessors: Vec<Accessor>,
}

impl Builder {
    fn push_view(&mut self, bytes: &[u8], target: u32) -> usize {
        let byte_offset = self.data.len();
        self.data.extend_from_slice(bytes);
        self.views.push(BufferView {
            buffer: 0,
            byte_offset,
            byte_length: bytes.len(),
            target,
        });
        self.views.len() - 1
    }

    fn push_floats(&mut self, values: &[f32], width: usize, kind: &str, bounds: bool) -> usize {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let view = self.push_view(&bytes, ARRAY_BUFFER);
        let (min, max) = if bounds {
            let mut min = vec![f32::INFINITY; width];
            let mut max = vec![f32::NEG_INFINITY; width];
            for chunk in values.chunks_exact(width) {
                for (i, &v) in chunk.iter().enumerate() {
                    min[i] = min[i].min(v);
                    max[i] = max[i].max(v);
                }
            }
            (Some(min), Some(max))
        } else {
            (None, None)
        };
        self.accessors.push(Accessor {
            buffer_view: view,
            component_type: FLOAT,
            count: values.len() / width,
            kind: kind.to_string(),
            min,
            max,
        });
        self.accessors.len() - 1
    }

    fn push_indices(&mut self, indices: &[u32]) -> usize {
        let bytes: Vec<u8> = indices.iter().flat_map(|v| v.to_le_bytes()).collect();
        let view = self.push_view(&bytes, ELEMENT_ARRAY_BUFFER);
        self.accessors.push(Accessor {
            buffer_view: view,
            component_type: UNSIGNED_INT,
            count: indices.len(),
            kind: "SCALAR".to_string(),
            min: None,
            max: None,
        });
        self.accessors.len() - 1
    }
}

pub struct GltfWriter;

impl GltfWriter {
    /// One node and mesh per geometry, drawn triangles only. Empty meshes
    /// are skipped since glTF accessors must not be empty.
    pub fn build(meshes: &[NamedGeometry]) -> Gltf {
        let mut builder = Builder {
            data: Vec::new(),
            views: Vec::new(),
            accessors: Vec::new(),
        };
        let mut nodes = Vec::new();
        let mut out_meshes = Vec::new();

        for mesh in meshes {
            let g = &mesh.geometry;
            let indices: Vec<u32> = g.triangles().into_iter().flatten().collect();
            if g.positions.is_empty() || indices.is_empty() {
                continue;
            }

            let mut attributes = BTreeMap::new();
            let positions = flatten_points(&g.positions);
            attributes.insert("POSITION".to_string(), builder.push_floats(&positions, 3, "VEC3", true));
            if let Some(normals) = &g.normals {
                let values: Vec<f32> = normals.iter().flat_map(|n| [n.x, n.y, n.z]).collect();
                attributes.insert("NORMAL".to_string(), builder.push_floats(&values, 3, "VEC3", false));
            }
            if let Some(uvs) = &g.uvs {
                let values: Vec<f32> = uvs.iter().flatten().copied().collect();
                attributes.insert("TEXCOORD_0".to_string(), builder.push_floats(&values, 2, "VEC2", false));
            }
            let indices = builder.push_indices(&indices);

            out_meshes.push(Mesh {
                name: mesh.name.clone(),
                primitives: vec![Primitive {
                    attributes,
                    indices,
                    mode: TRIANGLES,
                }],
            });
            nodes.push(Node {
                name: mesh.name.clone(),
                mesh: out_meshes.len() - 1,
            });
        }

        let buffers = if builder.data.is_empty() {
            Vec::new()
        } else {
            vec![Buffer {
                uri: format!("data:application/octet-stream;base64,{}", STANDARD.encode(&builder.data)),
                byte_length: builder.data.len(),
            }]
        };

        Gltf {
            asset: Asset {
                version: "2.0".to_string(),
                generator: concat!("meshlod ", env!("CARGO_PKG_VERSION")).to_string(),
            },
            scene: 0,
            scenes: vec![Scene {
                nodes: (0..nodes.len()).collect(),
            }],
            nodes,
            meshes: out_meshes,
            accessors: builder.accessors,
            buffer_views: builder.views,
            buffers,
        }
    }

    pub fn to_json_string(meshes: &[NamedGeometry]) -> IoResult<String> {
        serde_json::to_string_pretty(&Self::build(meshes)).map_err(|e| IoError::write(e.to_string()))
    }
}
