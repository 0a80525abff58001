//! I/O for meshlod
//!
//! Reads Wavefront OBJ into per-object triangle soup and exports geometry
//! as STL, OBJ or glTF.

pub mod error;
pub mod export;
pub mod gltf;
pub mod obj;
pub mod stl;

pub use error::*;
pub use export::{export_meshes, ExportFormat, ExportOptions, ExportPayload};
pub use gltf::GltfWriter;
pub use obj::{ObjReader, ObjWriter};
pub use stl::StlWriter;

use meshlod_core::BufferGeometry;
use std::path::Path;

/// A geometry with the name it carries in a file
#[derive(Debug, Clone, PartialEq)]
pub struct NamedGeometry {
    pub name: String,
    pub geometry: BufferGeometry,
}

impl NamedGeometry {
    pub fn new(name: impl Into<String>, geometry: BufferGeometry) -> Self {
        Self {
            name: name.into(),
            geometry,
        }
    }
}

/// Auto-detect format from the extension and read sub-mesh geometries
pub fn read_meshes<P: AsRef<Path>>(path: P) -> IoResult<Vec<NamedGeometry>> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()).map(str::to_lowercase).as_deref() {
        Some("obj") => ObjReader::read_path(path),
        _ => Err(IoError::InvalidFormat {
            format: format!("Unsupported mesh format: {:?}", path.extension()),
        }),
    }
}

/// Write geometries to `path`, picking the format from its extension
pub fn write_meshes<P: AsRef<Path>>(
    meshes: &[NamedGeometry],
    path: P,
    options: &ExportOptions,
) -> IoResult<()> {
    let path = path.as_ref();
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or_default();
    let format = ExportFormat::from_extension(ext).ok_or_else(|| IoError::InvalidFormat {
        format: format!("Unsupported export format: {:?}", path.extension()),
    })?;
    let payload = export_meshes(meshes, format, options)?;
    std::fs::write(path, payload.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshlod_core::Point3f;

    #[test]
    fn test_file_round_trip_through_obj() {
        let dir = std::env::temp_dir().join(format!("meshlod-io-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tri.obj");

        let meshes = vec![NamedGeometry::new(
            "tri",
            BufferGeometry::from_positions(vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ]),
        )];
        write_meshes(&meshes, &path, &ExportOptions::default()).unwrap();
        let loaded = read_meshes(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "tri");
        assert_eq!(loaded[0].geometry.positions, meshes[0].geometry.positions);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unknown_extensions_are_rejected() {
        assert!(matches!(read_meshes("model.fbx"), Err(IoError::InvalidFormat { .. })));
        assert!(write_meshes(&[], "model.fbx", &ExportOptions::default()).is_err());
    }
}
