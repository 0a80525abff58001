//! Procedural test geometry

use crate::geometry::BufferGeometry;
use crate::point::{Point3f, Vector3f};
use std::f32::consts::PI;

/// Parameters of a (p, q) torus knot tube
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorusKnot {
    pub radius: f32,
    pub tube: f32,
    pub tubular_segments: u32,
    pub radial_segments: u32,
    pub p: u32,
    pub q: u32,
}

impl Default for TorusKnot {
    fn default() -> Self {
        Self {
            radius: 1.0,
            tube: 0.4,
            tubular_segments: 64,
            radial_segments: 8,
            p: 2,
            q: 3,
        }
    }
}

impl TorusKnot {
    pub fn new(radius: f32, tube: f32, tubular_segments: u32, radial_segments: u32) -> Self {
        Self {
            radius,
            tube,
            tubular_segments: tubular_segments.max(3),
            radial_segments: radial_segments.max(3),
            ..Self::default()
        }
    }

    fn curve_point(&self, u: f32) -> Vector3f {
        let (p, q) = (self.p as f32, self.q as f32);
        let cu = u.cos();
        let su = u.sin();
        let qu_over_p = q / p * u;
        let cs = qu_over_p.cos();
        Vector3f::new(
            self.radius * (2.0 + cs) * 0.5 * cu,
            self.radius * (2.0 + cs) * su * 0.5,
            self.radius * qu_over_p.sin() * 0.5,
        )
    }

    /// Build an indexed tube geometry with smooth normals and uvs.
    ///
    /// The seam vertices are duplicated, so the tube has open borders along
    /// both seams even though it looks closed.
    pub fn build(&self) -> BufferGeometry {
        let tubular = self.tubular_segments;
        let radial = self.radial_segments;
        let vertex_count = ((tubular + 1) * (radial + 1)) as usize;

        let mut positions = Vec::with_capacity(vertex_count);
        let mut normals = Vec::with_capacity(vertex_count);
        let mut uvs = Vec::with_capacity(vertex_count);

        for i in 0..=tubular {
            let u = i as f32 / tubular as f32 * self.p as f32 * PI * 2.0;
            let p1 = self.curve_point(u);
            let p2 = self.curve_point(u + 0.01);

            // Frenet-like frame along the curve
            let t = p2 - p1;
            let n = p2 + p1;
            let b = t.cross(&n).normalize();
            let n = b.cross(&t).normalize();

            for j in 0..=radial {
                let v = j as f32 / radial as f32 * PI * 2.0;
                let cx = -self.tube * v.cos();
                let cy = self.tube * v.sin();

                let vertex = p1 + n * cx + b * cy;
                positions.push(Point3f::from(vertex));
                normals.push((vertex - p1).normalize());
                uvs.push([i as f32 / tubular as f32, j as f32 / radial as f32]);
            }
        }

        let mut index = Vec::with_capacity((tubular * radial * 6) as usize);
        for j in 1..=tubular {
            for i in 1..=radial {
                let a = (radial + 1) * (j - 1) + (i - 1);
                let b = (radial + 1) * j + (i - 1);
                let c = (radial + 1) * j + i;
                let d = (radial + 1) * (j - 1) + i;
                index.extend([a, b, d, b, c, d]);
            }
        }

        BufferGeometry::indexed(positions, index)
            .with_normals(normals)
            .with_uvs(uvs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_torus_knot_counts() {
        let g = TorusKnot::new(5.0, 2.5, 124, 32).build();
        assert_eq!(g.vertex_count(), 125 * 33);
        assert_eq!(g.triangle_count(), 124 * 32 * 2);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_torus_knot_normals_are_unit() {
        let g = TorusKnot::new(5.0, 2.5, 16, 8).build();
        for n in g.normals.as_ref().unwrap() {
            assert!((n.norm() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_segments_clamped() {
        let knot = TorusKnot::new(1.0, 0.5, 0, 1);
        assert_eq!(knot.tubular_segments, 3);
        assert_eq!(knot.radial_segments, 3);
    }
}
