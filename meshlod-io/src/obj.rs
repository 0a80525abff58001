//! OBJ format support
//!
//! Reading splits the file into one sub-mesh per `o` / `g` statement and
//! produces non-indexed triangle soup, fan-triangulating polygons. Writing
//! emits one `o` block per mesh with shared, offset vertex numbering.

use crate::{IoError, IoResult, NamedGeometry};
use meshlod_core::{BufferGeometry, Point3f, Uv, Vector3f};
use obj::{IndexTuple, LoadConfig, ObjData, SimplePolygon};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::debug;

/// Name the `obj` crate gives to objects and groups that were never named
const UNNAMED: &str = "default";

pub struct ObjReader;
pub struct ObjWriter;

fn named(name: &str) -> Option<&str> {
    let name = name.trim();
    (!name.is_empty() && name != UNNAMED).then_some(name)
}

impl ObjReader {
    /// Parse OBJ text into sub-mesh geometries, in file order
    pub fn read_bytes(bytes: &[u8]) -> IoResult<Vec<NamedGeometry>> {
        Self::read(BufReader::new(bytes))
    }

    pub fn read_path<P: AsRef<Path>>(path: P) -> IoResult<Vec<NamedGeometry>> {
        let file = std::fs::File::open(path)?;
        Self::read(BufReader::new(file))
    }

    pub fn read<R: BufRead>(reader: R) -> IoResult<Vec<NamedGeometry>> {
        // Exporters add their own statements (`lod`, `vp`, ...); skip them
        let data = ObjData::load_buf_with_config(reader, LoadConfig { strict: false })
            .map_err(|e| IoError::parse(e.to_string()))?;
        let meshes = Self::split(&data)?;
        debug!(
            positions = data.position.len(),
            objects = data.objects.len(),
            meshes = meshes.len(),
            "parsed OBJ"
        );
        Ok(meshes)
    }

    /// One sub-mesh per object / group. A `usemtl` inside a group continues
    /// that group rather than starting a new part.
    fn split(data: &ObjData) -> IoResult<Vec<NamedGeometry>> {
        let mut parts: Vec<(String, Vec<&SimplePolygon>)> = Vec::new();
        for object in &data.objects {
            let mut current: Option<(String, Vec<&SimplePolygon>)> = None;
            for group in &object.groups {
                if group.index > 0 {
                    if let Some((_, polys)) = current.as_mut() {
                        polys.extend(group.polys.iter());
                        continue;
                    }
                }
                parts.extend(current.take());
                let name = named(&group.name)
                    .or_else(|| named(&object.name))
                    .map(str::to_string)
                    .unwrap_or_default();
                current = Some((name, group.polys.iter().collect()));
            }
            parts.extend(current);
        }

        let mut meshes = Vec::new();
        for (name, polys) in parts {
            if let Some(geometry) = Self::triangulate(data, &polys)? {
                let name = if name.is_empty() {
                    format!("mesh_{}", meshes.len())
                } else {
                    name
                };
                meshes.push(NamedGeometry::new(name, geometry));
            }
        }
        Ok(meshes)
    }

    /// De-indexed triangle soup of `polygons`, or `None` when nothing has
    /// three corners
    fn triangulate(data: &ObjData, polygons: &[&SimplePolygon]) -> IoResult<Option<BufferGeometry>> {
        let faces: Vec<&[IndexTuple]> = polygons
            .iter()
            .map(|p| p.0.as_slice())
            .filter(|c| c.len() >= 3)
            .collect();
        if faces.is_empty() {
            return Ok(None);
        }

        let has_uvs = faces.iter().flat_map(|f| f.iter()).all(|c| c.1.is_some());
        let has_normals = faces.iter().flat_map(|f| f.iter()).all(|c| c.2.is_some());

        let mut positions = Vec::new();
        let mut uvs: Vec<Uv> = Vec::new();
        let mut normals: Vec<Vector3f> = Vec::new();

        for face in &faces {
            for k in 1..face.len() - 1 {
                for &IndexTuple(p, t, n) in [&face[0], &face[k], &face[k + 1]] {
                    let &[x, y, z] = data
                        .position
                        .get(p)
                        .ok_or_else(|| IoError::parse(format!("position index {} out of range", p + 1)))?;
                    positions.push(Point3f::new(x, y, z));

                    if has_uvs {
                        let t = t.unwrap_or_default();
                        let &uv = data
                            .texture
                            .get(t)
                            .ok_or_else(|| IoError::parse(format!("uv index {} out of range", t + 1)))?;
                        uvs.push(uv);
                    }
                    if has_normals {
                        let n = n.unwrap_or_default();
                        let &[x, y, z] = data
                            .normal
                            .get(n)
                            .ok_or_else(|| IoError::parse(format!("normal index {} out of range", n + 1)))?;
                        normals.push(Vector3f::new(x, y, z));
                    }
                }
            }
        }

        let mut geometry = BufferGeometry::from_positions(positions);
        if has_uvs {
            geometry = geometry.with_uvs(uvs);
        }
        if has_normals {
            geometry = geometry.with_normals(normals);
        }
        Ok(Some(geometry))
    }
}

impl ObjWriter {
    /// Write the drawn triangles of every mesh
    pub fn write<W: Write>(meshes: &[NamedGeometry], mut writer: W) -> IoResult<()> {
        let mut position_offset = 1usize;
        let mut uv_offset = 1usize;
        let mut normal_offset = 1usize;

        for mesh in meshes {
            let g = &mesh.geometry;
            writeln!(writer, "o {}", mesh.name)?;
            for p in &g.positions {
                writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
            }
            if let Some(uvs) = &g.uvs {
                for uv in uvs {
                    writeln!(writer, "vt {} {}", uv[0], uv[1])?;
                }
            }
            if let Some(normals) = &g.normals {
                for n in normals {
                    writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
                }
            }

            for tri in g.triangles() {
                write!(writer, "f")?;
                for v in tri {
                    let v = v as usize;
                    let p = v + position_offset;
                    match (&g.uvs, &g.normals) {
                        (Some(_), Some(_)) => write!(writer, " {}/{}/{}", p, v + uv_offset, v + normal_offset)?,
                        (Some(_), None) => write!(writer, " {}/{}", p, v + uv_offset)?,
                        (None, Some(_)) => write!(writer, " {}//{}", p, v + normal_offset)?,
                        (None, None) => write!(writer, " {}", p)?,
                    }
                }
                writeln!(writer)?;
            }

            position_offset += g.positions.len();
            uv_offset += g.uvs.as_ref().map_or(0, Vec::len);
            normal_offset += g.normals.as_ref().map_or(0, Vec::len);
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_string(meshes: &[NamedGeometry]) -> IoResult<String> {
        let mut buffer = Vec::new();
        Self::write(meshes, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| IoError::write(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TWO_OBJECTS: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0 0 1
o quad
f 1 2 3 4
o tri
f 1 2 5
";

    #[test]
    fn test_split_by_object_and_fan_triangulate() {
        let meshes = ObjReader::read_bytes(TWO_OBJECTS.as_bytes()).unwrap();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0].name, "quad");
        assert_eq!(meshes[1].name, "tri");

        let quad = &meshes[0].geometry;
        assert!(!quad.is_indexed());
        assert_eq!(quad.vertex_count(), 6);
        assert_eq!(quad.triangle_count(), 2);
        assert_relative_eq!(quad.positions[4], Point3f::new(1.0, 1.0, 0.0));
        assert!(quad.normals.is_none());
        assert!(quad.uvs.is_none());
    }

    #[test]
    fn test_groups_split_and_attributes() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
g first
f 1/1/1 2/2/1 3/3/1
g second
f 1//1 3//1 2//1
";
        let meshes = ObjReader::read_bytes(text.as_bytes()).unwrap();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0].name, "first");
        assert_eq!(meshes[1].name, "second");

        let first = &meshes[0].geometry;
        assert_eq!(first.uvs.as_ref().map(Vec::len), Some(3));
        assert_eq!(first.normals.as_ref().map(Vec::len), Some(3));
        assert_eq!(first.uvs.as_ref().unwrap()[1], [1.0, 0.0]);

        let second = &meshes[1].geometry;
        assert!(second.uvs.is_none());
        assert_eq!(second.normals.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn test_object_then_group_takes_group_name() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
o body
g left
f 1 2 3
g right
f 1 3 4
o lid
f 2 3 4
";
        let meshes = ObjReader::read_bytes(text.as_bytes()).unwrap();
        let names: Vec<&str> = meshes.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["left", "right", "lid"]);
    }

    #[test]
    fn test_material_change_does_not_split() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 0 0 1
o part
usemtl red
f 1 2 3
usemtl blue
f 1 3 4
";
        let meshes = ObjReader::read_bytes(text.as_bytes()).unwrap();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].name, "part");
        assert_eq!(meshes[0].geometry.triangle_count(), 2);
    }

    #[test]
    fn test_unknown_statements_are_skipped() {
        let meshes = ObjReader::read_bytes(b"v 0 0 0\nv 1 0 0\nv 0 1 0\nlod 1\nf 1 2 3\n").unwrap();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].geometry.triangle_count(), 1);
    }

    #[test]
    fn test_negative_indices_resolve_relative_to_end() {
        let meshes = ObjReader::read_bytes(b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n").unwrap();
        assert_relative_eq!(meshes[0].geometry.positions[1], Point3f::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_unnamed_geometry_gets_default_name() {
        let meshes = ObjReader::read_bytes(b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].name, "mesh_0");
    }

    #[test]
    fn test_out_of_range_index_is_an_error() {
        let result = ObjReader::read_bytes(b"v 0 0 0\nv 1 0 0\nf 1 2 7\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_file_has_no_meshes() {
        let meshes = ObjReader::read_bytes(b"# nothing here\n").unwrap();
        assert!(meshes.is_empty());
    }

    #[test]
    fn test_writer_offsets_vertices_per_object() {
        let meshes = ObjReader::read_bytes(TWO_OBJECTS.as_bytes()).unwrap();
        let text = ObjWriter::write_string(&meshes).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("o ")).count(), 2);
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 9);
        assert!(text.contains("f 1 2 3\n"));
        // Second object numbers its vertices after the first object's six
        assert!(text.contains("f 7 8 9\n"));

        let reread = ObjReader::read_bytes(text.as_bytes()).unwrap();
        assert_eq!(reread.len(), 2);
        assert_eq!(reread[0].geometry.triangle_count(), 2);
    }
}
