//! STL export, ASCII and binary

use crate::{IoError, IoResult, NamedGeometry};
use byteorder::{LittleEndian, WriteBytesExt};
use meshlod_core::{Point3f, Vector3f};
use std::io::Write;

pub struct StlWriter;

/// Drawn triangles of every mesh as corner positions
fn facets(meshes: &[NamedGeometry]) -> impl Iterator<Item = [Point3f; 3]> + '_ {
    meshes.iter().flat_map(|mesh| {
        let g = &mesh.geometry;
        g.triangles()
            .into_iter()
            .map(move |t| t.map(|i| g.positions[i as usize]))
    })
}

fn facet_normal(v: &[Point3f; 3]) -> Vector3f {
    let n = (v[1] - v[0]).cross(&(v[2] - v[0]));
    let len = n.norm();
    if len > f32::EPSILON {
        n / len
    } else {
        Vector3f::zeros()
    }
}

impl StlWriter {
    pub fn write_ascii<W: Write>(meshes: &[NamedGeometry], mut writer: W) -> IoResult<()> {
        writeln!(writer, "solid exported")?;
        for v in facets(meshes) {
            let n = facet_normal(&v);
            writeln!(writer, "\tfacet normal {} {} {}", n.x, n.y, n.z)?;
            writeln!(writer, "\t\touter loop")?;
            for p in &v {
                writeln!(writer, "\t\t\tvertex {} {} {}", p.x, p.y, p.z)?;
            }
            writeln!(writer, "\t\tendloop")?;
            writeln!(writer, "\tendfacet")?;
        }
        writeln!(writer, "endsolid exported")?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_binary<W: Write>(meshes: &[NamedGeometry], mut writer: W) -> IoResult<()> {
        let count = facets(meshes).count();
        let count = u32::try_from(count)
            .map_err(|_| IoError::write(format!("{} triangles exceed the STL limit", count)))?;

        writer.write_all(&[0u8; 80])?;
        writer.write_u32::<LittleEndian>(count)?;
        for v in facets(meshes) {
            let n = facet_normal(&v);
            for value in [n.x, n.y, n.z] {
                writer.write_f32::<LittleEndian>(value)?;
            }
            for p in &v {
                for value in [p.x, p.y, p.z] {
                    writer.write_f32::<LittleEndian>(value)?;
                }
            }
            writer.write_u16::<LittleEndian>(0)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_ascii_string(meshes: &[NamedGeometry]) -> IoResult<String> {
        let mut buffer = Vec::new();
        Self::write_ascii(meshes, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| IoError::write(e.to_string()))
    }

    pub fn to_binary(meshes: &[NamedGeometry]) -> IoResult<Vec<u8>> {
        let mut buffer = Vec::new();
        Self::write_binary(meshes, &mut buffer)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{LittleEndian, ReadBytesExt};
    use meshlod_core::{BufferGeometry, DrawRange};
    use std::io::Cursor;

    fn quad() -> NamedGeometry {
        NamedGeometry::new(
            "quad",
            BufferGeometry::indexed(
                vec![
                    Point3f::new(0.0, 0.0, 0.0),
                    Point3f::new(1.0, 0.0, 0.0),
                    Point3f::new(1.0, 1.0, 0.0),
                    Point3f::new(0.0, 1.0, 0.0),
                ],
                vec![0, 1, 2, 0, 2, 3],
            ),
        )
    }

    #[test]
    fn test_ascii_layout() {
        let text = StlWriter::to_ascii_string(&[quad()]).unwrap();
        assert!(text.starts_with("solid exported\n"));
        assert!(text.trim_end().ends_with("endsolid exported"));
        assert_eq!(text.matches("facet normal 0 0 1").count(), 2);
        assert_eq!(text.matches("vertex ").count(), 6);
    }

    #[test]
    fn test_binary_layout() {
        let bytes = StlWriter::to_binary(&[quad()]).unwrap();
        assert_eq!(bytes.len(), 80 + 4 + 2 * 50);
        let mut cursor = Cursor::new(&bytes[80..]);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 2);
        let normal: Vec<f32> = (0..3)
            .map(|_| cursor.read_f32::<LittleEndian>().unwrap())
            .collect();
        assert_eq!(normal, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_respects_draw_range() {
        let mut mesh = quad();
        mesh.geometry.draw_range = DrawRange::new(0, 3);
        let bytes = StlWriter::to_binary(&[mesh]).unwrap();
        assert_eq!(bytes.len(), 80 + 4 + 50);
    }
}
