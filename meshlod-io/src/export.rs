//! Export format selection and dispatch

use crate::gltf::GltfWriter;
use crate::obj::ObjWriter;
use crate::stl::StlWriter;
use crate::{IoResult, NamedGeometry};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Formats the scene can be exported to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Stereolithography, ASCII or binary
    Stl,
    /// Wavefront OBJ text
    Obj,
    /// glTF 2.0 JSON with an embedded buffer
    Gltf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Stl, ExportFormat::Obj, ExportFormat::Gltf];

    /// Map a file extension (with or without the leading dot, any case)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "stl" => Some(Self::Stl),
            "obj" => Some(Self::Obj),
            "gltf" => Some(Self::Gltf),
            _ => None,
        }
    }

    /// Extension including the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Stl => ".stl",
            Self::Obj => ".obj",
            Self::Gltf => ".gltf",
        }
    }

}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Options for exporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Write STL in the binary layout instead of ASCII
    pub stl_binary: bool,
}

impl ExportOptions {
    pub fn binary_stl() -> Self {
        Self { stl_binary: true }
    }
}

/// Serialized scene, ready to hand to a download sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportPayload {
    Text(String),
    Binary(Vec<u8>),
}

impl ExportPayload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }
}

/// Serialize `meshes` (already in world space) as `format`
pub fn export_meshes(
    meshes: &[NamedGeometry],
    format: ExportFormat,
    options: &ExportOptions,
) -> IoResult<ExportPayload> {
    let payload = match format {
        ExportFormat::Stl if options.stl_binary => ExportPayload::Binary(StlWriter::to_binary(meshes)?),
        ExportFormat::Stl => ExportPayload::Text(StlWriter::to_ascii_string(meshes)?),
        ExportFormat::Obj => ExportPayload::Text(ObjWriter::write_string(meshes)?),
        ExportFormat::Gltf => ExportPayload::Text(GltfWriter::to_json_string(meshes)?),
    };
    info!(
        format = %format,
        meshes = meshes.len(),
        bytes = payload.len(),
        "exported scene"
    );
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlod_core::{BufferGeometry, Point3f};

    fn meshes() -> Vec<NamedGeometry> {
        vec![NamedGeometry::new(
            "tri",
            BufferGeometry::from_positions(vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ]),
        )]
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(ExportFormat::from_extension(".stl"), Some(ExportFormat::Stl));
        assert_eq!(ExportFormat::from_extension("OBJ"), Some(ExportFormat::Obj));
        assert_eq!(ExportFormat::from_extension(".glTF"), Some(ExportFormat::Gltf));
        assert_eq!(ExportFormat::from_extension(".fbx"), None);
        assert_eq!(ExportFormat::from_extension(""), None);
        for format in ExportFormat::ALL {
            assert_eq!(ExportFormat::from_extension(format.extension()), Some(format));
        }
    }

    #[test]
    fn test_payload_kinds() {
        let m = meshes();
        let ascii = export_meshes(&m, ExportFormat::Stl, &ExportOptions::default()).unwrap();
        assert!(!ascii.is_binary());
        let binary = export_meshes(&m, ExportFormat::Stl, &ExportOptions::binary_stl()).unwrap();
        assert!(binary.is_binary());
        assert_eq!(binary.len(), 134);
        let obj = export_meshes(&m, ExportFormat::Obj, &ExportOptions::default()).unwrap();
        assert!(obj.as_bytes().starts_with(b"o tri\n"));
        let gltf = export_meshes(&m, ExportFormat::Gltf, &ExportOptions::default()).unwrap();
        assert!(serde_json::from_slice::<serde_json::Value>(gltf.as_bytes()).is_ok());
    }
}
