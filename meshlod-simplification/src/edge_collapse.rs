//! Edge collapse simplification
//!
//! Iterative half-edge collapse driven by quadric error metrics (QEM).
//! Vertices never move: every collapse merges one vertex into a neighbour
//! that keeps its original position, so the reduced index buffer only ever
//! references vertices of the input. Errors are measured in units of the
//! mesh extent, which makes the error bound independent of model scale.

use crate::{IndexSimplifier, SimplifyOptions, SimplifyResult};
use meshlod_core::{Aabb, Error, Point3f, Result};
use nalgebra::{Matrix4, Vector3, Vector4};
use priority_queue::PriorityQueue;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Weight of the perpendicular planes added along open border edges
const BORDER_WEIGHT: f64 = 10.0;

// ============================================================
// Quadrics
// ============================================================

/// Area-weighted sum of squared plane distances
#[derive(Debug, Clone, Copy)]
struct Quadric {
    matrix: Matrix4<f64>,
    weight: f64,
}

impl Quadric {
    fn zero() -> Self {
        Self {
            matrix: Matrix4::zeros(),
            weight: 0.0,
        }
    }

    fn from_plane(plane: &Vector4<f64>, weight: f64) -> Self {
        let (a, b, c, d) = (plane[0], plane[1], plane[2], plane[3]);
        #[rustfmt::skip]
        let matrix = Matrix4::new(
            a * a, a * b, a * c, a * d,
            a * b, b * b, b * c, b * d,
            a * c, b * c, c * c, c * d,
            a * d, b * d, c * d, d * d,
        ) * weight;
        Self { matrix, weight }
    }

    fn add(&mut self, other: &Quadric) {
        self.matrix += other.matrix;
        self.weight += other.weight;
    }

    /// Weighted mean squared distance of `p` to the accumulated planes
    fn error(&self, p: &Vector3<f64>) -> f64 {
        if self.weight <= 0.0 {
            return 0.0;
        }
        let vh = Vector4::new(p.x, p.y, p.z, 1.0);
        let e = (vh.transpose() * self.matrix * vh)[0];
        e.abs() / self.weight
    }
}

/// Plane through `origin` with unit `normal`
fn plane(normal: &Vector3<f64>, origin: &Vector3<f64>) -> Vector4<f64> {
    Vector4::new(normal.x, normal.y, normal.z, -normal.dot(origin))
}

// ============================================================
// Vertex classification
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VertexKind {
    /// Every incident edge is shared by exactly two triangles
    Manifold,
    /// On a simple open border (exactly two border edges)
    Border,
    /// Never removed
    Locked,
}

// ============================================================
// Collapse candidates
// ============================================================

#[derive(Debug, Clone, Copy)]
struct Candidate {
    vertex: u32,
    target: u32,
    error: f64,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smallest error first, lowest vertex id on ties
        other
            .error
            .total_cmp(&self.error)
            .then_with(|| other.vertex.cmp(&self.vertex))
            .then_with(|| other.target.cmp(&self.target))
    }
}

/// Replacement of each index of a collapsed vertex by an index of its target
type WedgeMap = Vec<(u32, u32)>;

fn position_key(p: &Point3f) -> [u32; 3] {
    // +0.0 and -0.0 weld together
    let bits = |v: f32| if v == 0.0 { 0 } else { v.to_bits() };
    [bits(p.x), bits(p.y), bits(p.z)]
}

// ============================================================
// Working mesh
// ============================================================

/// Topology is built over positions: indices that share a position are
/// wedges of one vertex (they differ only in other attributes) and move
/// together.
struct CollapseMesh {
    /// Positions normalised into the unit cube of the mesh extent
    positions: Vec<Vector3<f64>>,
    /// Triangles over canonical vertices
    triangles: Vec<[u32; 3]>,
    /// Triangles over the input indices
    corners: Vec<[u32; 3]>,
    triangle_alive: Vec<bool>,
    /// Alive triangles around each canonical vertex
    vertex_triangles: Vec<Vec<u32>>,
    vertex_alive: Vec<bool>,
    kinds: Vec<VertexKind>,
    quadrics: Vec<Quadric>,
    alive_triangles: usize,
}

impl CollapseMesh {
    fn build(indices: &[u32], positions: &[Point3f], lock_border: bool) -> Self {
        let nv = positions.len();
        let bounds = Aabb::from_points(positions.iter());
        let extent = bounds.max_extent();
        let scale = if extent > 0.0 { 1.0 / extent as f64 } else { 1.0 };
        let origin = if bounds.is_empty() {
            Point3f::origin()
        } else {
            bounds.min
        };
        let normalized: Vec<Vector3<f64>> = positions
            .iter()
            .map(|p| (p - origin).cast::<f64>() * scale)
            .collect();

        let mut first_at: HashMap<[u32; 3], u32> = HashMap::with_capacity(nv);
        let canonical: Vec<u32> = positions
            .iter()
            .enumerate()
            .map(|(i, p)| *first_at.entry(position_key(p)).or_insert(i as u32))
            .collect();

        let corners: Vec<[u32; 3]> = indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect();
        let triangles: Vec<[u32; 3]> = corners
            .iter()
            .map(|c| c.map(|i| canonical[i as usize]))
            .collect();

        // Triangles that weld onto fewer than three positions have no area
        // and take no part in the topology.
        let triangle_alive: Vec<bool> = triangles
            .iter()
            .map(|t| t[0] != t[1] && t[1] != t[2] && t[0] != t[2])
            .collect();

        let mut vertex_triangles = vec![Vec::new(); nv];
        for (ti, tri) in triangles.iter().enumerate() {
            if triangle_alive[ti] {
                for &v in tri {
                    vertex_triangles[v as usize].push(ti as u32);
                }
            }
        }

        let mut mesh = CollapseMesh {
            positions: normalized,
            alive_triangles: triangle_alive.iter().filter(|&&a| a).count(),
            triangle_alive,
            triangles,
            corners,
            vertex_triangles,
            vertex_alive: vec![true; nv],
            kinds: vec![VertexKind::Manifold; nv],
            quadrics: vec![Quadric::zero(); nv],
        };
        mesh.classify(lock_border);
        mesh.initialize_quadrics();
        mesh
    }

    fn classify(&mut self, lock_border: bool) {
        let nv = self.positions.len();

        let mut edge_use: HashMap<(u32, u32), u32> = HashMap::with_capacity(self.triangles.len() * 3);
        for (tri, _) in self.triangles.iter().zip(&self.triangle_alive).filter(|(_, &a)| a) {
            for j in 0..3 {
                let (a, b) = (tri[j], tri[(j + 1) % 3]);
                *edge_use.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }

        let mut border_edges = vec![0u32; nv];
        let mut complex = vec![false; nv];
        for (&(a, b), &count) in &edge_use {
            if count == 1 {
                border_edges[a as usize] += 1;
                border_edges[b as usize] += 1;
            } else if count > 2 {
                complex[a as usize] = true;
                complex[b as usize] = true;
            }
        }

        for v in 0..nv {
            self.kinds[v] = if complex[v] {
                VertexKind::Locked
            } else {
                match border_edges[v] {
                    0 => VertexKind::Manifold,
                    2 if !lock_border => VertexKind::Border,
                    _ => VertexKind::Locked,
                }
            };
        }
    }

    fn triangle_normal(&self, tri: &[u32; 3]) -> Vector3<f64> {
        let p0 = self.positions[tri[0] as usize];
        let p1 = self.positions[tri[1] as usize];
        let p2 = self.positions[tri[2] as usize];
        (p1 - p0).cross(&(p2 - p0))
    }

    fn initialize_quadrics(&mut self) {
        for ti in 0..self.triangles.len() {
            if !self.triangle_alive[ti] {
                continue;
            }
            let tri = self.triangles[ti];
            let cross = self.triangle_normal(&tri);
            let area2 = cross.norm();
            if area2 <= f64::EPSILON {
                continue;
            }
            let normal = cross / area2;
            let p0 = self.positions[tri[0] as usize];
            let q = Quadric::from_plane(&plane(&normal, &p0), area2 * 0.5);
            for &v in &tri {
                self.quadrics[v as usize].add(&q);
            }

            // Border edges get a perpendicular plane so border vertices
            // resist being pulled off the outline.
            for j in 0..3 {
                let (a, b) = (tri[j], tri[(j + 1) % 3]);
                if self.shared_triangle_count(a, b) != 1 {
                    continue;
                }
                let pa = self.positions[a as usize];
                let pb = self.positions[b as usize];
                let edge = pb - pa;
                let length = edge.norm();
                if length <= f64::EPSILON {
                    continue;
                }
                let side = edge.cross(&normal);
                let side_len = side.norm();
                if side_len <= f64::EPSILON {
                    continue;
                }
                let q = Quadric::from_plane(&plane(&(side / side_len), &pa), length * BORDER_WEIGHT);
                self.quadrics[a as usize].add(&q);
                self.quadrics[b as usize].add(&q);
            }
        }
    }

    /// Alive triangles containing both `a` and `b`
    fn shared_triangle_count(&self, a: u32, b: u32) -> usize {
        self.vertex_triangles[a as usize]
            .iter()
            .filter(|&&t| self.triangles[t as usize].contains(&b))
            .count()
    }

    /// Sorted, de-duplicated neighbours of `v`
    fn neighbors(&self, v: u32) -> Vec<u32> {
        let mut out: Vec<u32> = self.vertex_triangles[v as usize]
            .iter()
            .flat_map(|&t| self.triangles[t as usize])
            .filter(|&w| w != v)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Link condition: the common neighbours of `u` and `v` must be exactly
    /// the apices of the triangles sharing the edge (2 interior, 1 border).
    fn check_link_condition(&self, u: u32, v: u32, shared: usize) -> bool {
        let nu = self.neighbors(u);
        let nv = self.neighbors(v);
        let common = nu.iter().filter(|w| nv.binary_search(w).is_ok()).count();
        common == shared
    }

    /// Reject collapses that flip or flatten a surviving triangle
    fn flips_triangles(&self, u: u32, v: u32) -> bool {
        let pv = self.positions[v as usize];
        for &t in &self.vertex_triangles[u as usize] {
            let tri = self.triangles[t as usize];
            if tri.contains(&v) {
                continue;
            }
            let before = self.triangle_normal(&tri);
            let corners = tri.map(|w| {
                if w == u {
                    pv
                } else {
                    self.positions[w as usize]
                }
            });
            let after = (corners[1] - corners[0]).cross(&(corners[2] - corners[0]));
            let after_len = after.norm();
            if after_len <= f64::EPSILON {
                return true;
            }
            if before.dot(&after) <= 0.0 {
                return true;
            }
        }
        false
    }

    /// A rewired triangle must not coincide with one already around `v`
    fn duplicates_triangles(&self, u: u32, v: u32) -> bool {
        let sorted = |mut t: [u32; 3]| {
            t.sort_unstable();
            t
        };
        let existing: Vec<[u32; 3]> = self.vertex_triangles[v as usize]
            .iter()
            .map(|&t| sorted(self.triangles[t as usize]))
            .collect();
        self.vertex_triangles[u as usize].iter().any(|&t| {
            let tri = self.triangles[t as usize];
            !tri.contains(&v) && existing.contains(&sorted(tri.map(|w| if w == u { v } else { w })))
        })
    }

    /// Pair every wedge of `u` with the wedge of `v` it shares a triangle
    /// with. Fails when a wedge of `u` has no partner or more than one,
    /// which is the case when the edge crosses an attribute seam.
    fn wedge_map(&self, u: u32, v: u32) -> Option<WedgeMap> {
        let corner_of = |t: usize, w: u32| -> Option<u32> {
            let pos = self.triangles[t].iter().position(|&x| x == w)?;
            Some(self.corners[t][pos])
        };

        let mut pairs = WedgeMap::new();
        for &t in &self.vertex_triangles[u as usize] {
            let t = t as usize;
            if let Some(wv) = corner_of(t, v) {
                pairs.push((corner_of(t, u)?, wv));
            }
        }
        pairs.sort_unstable();
        pairs.dedup();
        if pairs.windows(2).any(|w| w[0].0 == w[1].0) {
            return None;
        }

        let covered = self.vertex_triangles[u as usize].iter().all(|&t| {
            corner_of(t as usize, u)
                .map_or(false, |wu| pairs.binary_search_by_key(&wu, |p| p.0).is_ok())
        });
        covered.then_some(pairs)
    }

    /// Cheapest valid collapse of `u` into one of its neighbours
    fn best_candidate(&self, u: u32) -> Option<Candidate> {
        if !self.vertex_alive[u as usize] || self.kinds[u as usize] == VertexKind::Locked {
            return None;
        }

        let mut options: Vec<Candidate> = self
            .neighbors(u)
            .into_iter()
            .map(|v| Candidate {
                vertex: u,
                target: v,
                error: self.quadrics[u as usize].error(&self.positions[v as usize]),
            })
            .collect();
        options.sort_by(|a, b| a.error.total_cmp(&b.error).then(a.target.cmp(&b.target)));

        options.into_iter().find(|c| self.can_collapse(c.vertex, c.target))
    }

    fn can_collapse(&self, u: u32, v: u32) -> bool {
        let shared = self.shared_triangle_count(u, v);
        if shared == 0 || shared > 2 {
            return false;
        }
        if self.kinds[u as usize] == VertexKind::Border {
            // Border vertices only slide along the border
            if shared != 1 || self.kinds[v as usize] == VertexKind::Manifold {
                return false;
            }
        }
        self.check_link_condition(u, v, shared)
            && !self.flips_triangles(u, v)
            && !self.duplicates_triangles(u, v)
            && self.wedge_map(u, v).is_some()
    }

    /// Merge `u` into `v`. Triangles containing both die; the rest of `u`'s
    /// triangles are rewired to `v`, each corner to its partner wedge.
    fn collapse(&mut self, u: u32, v: u32, wedges: &[(u32, u32)]) {
        let around_u = std::mem::take(&mut self.vertex_triangles[u as usize]);
        for t in around_u {
            let ti = t as usize;
            if !self.triangle_alive[ti] {
                continue;
            }
            if self.triangles[ti].contains(&v) {
                self.triangle_alive[ti] = false;
                self.alive_triangles -= 1;
                for w in self.triangles[ti] {
                    if w != u {
                        self.vertex_triangles[w as usize].retain(|&x| x != t);
                    }
                }
                continue;
            }
            for j in 0..3 {
                if self.triangles[ti][j] != u {
                    continue;
                }
                self.triangles[ti][j] = v;
                let wu = self.corners[ti][j];
                if let Ok(k) = wedges.binary_search_by_key(&wu, |p| p.0) {
                    self.corners[ti][j] = wedges[k].1;
                }
            }
            self.vertex_triangles[v as usize].push(t);
        }
        self.vertex_alive[u as usize] = false;
        let qu = self.quadrics[u as usize];
        self.quadrics[v as usize].add(&qu);
    }

    fn to_indices(&self) -> Vec<u32> {
        self.corners
            .iter()
            .zip(&self.triangle_alive)
            .filter(|(_, &alive)| alive)
            .flat_map(|(tri, _)| *tri)
            .collect()
    }
}

// ============================================================
// Edge Collapse Simplifier
// ============================================================

/// Edge collapse simplifier using quadric error metrics.
///
/// Collapses are taken cheapest first until the index count reaches the
/// target or the next collapse would exceed the error bound.
#[derive(Debug, Clone, Default)]
pub struct EdgeCollapseSimplifier;

impl EdgeCollapseSimplifier {
    pub fn new() -> Self {
        Self
    }
}

impl IndexSimplifier for EdgeCollapseSimplifier {
    fn simplify(
        &self,
        indices: &[u32],
        positions: &[Point3f],
        target_index_count: usize,
        target_error: f32,
        options: SimplifyOptions,
    ) -> Result<SimplifyResult> {
        if indices.len() % 3 != 0 {
            return Err(Error::InvalidGeometry(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(Error::InvalidGeometry(format!(
                "index {} out of range for {} vertices",
                bad,
                positions.len()
            )));
        }
        if !target_error.is_finite() || target_error < 0.0 {
            return Err(Error::InvalidData(format!(
                "target error must be a non-negative number, got {}",
                target_error
            )));
        }
        if target_index_count >= indices.len() {
            return Ok(SimplifyResult {
                indices: indices.to_vec(),
                error: 0.0,
            });
        }

        let mut mesh = CollapseMesh::build(
            indices,
            positions,
            options.contains(SimplifyOptions::LOCK_BORDER),
        );
        let error_limit = (target_error as f64) * (target_error as f64);

        let mut queue = PriorityQueue::new();
        for u in 0..positions.len() as u32 {
            if let Some(c) = mesh.best_candidate(u) {
                queue.push(u, c);
            }
        }

        let mut achieved = 0.0f64;
        while mesh.alive_triangles * 3 > target_index_count {
            let (u, queued) = match queue.pop() {
                Some(item) => item,
                None => break,
            };

            // Revalidate: neighbourhoods may have changed since queuing
            let fresh = match mesh.best_candidate(u) {
                Some(c) => c,
                None => continue,
            };
            if fresh != queued {
                queue.push(u, fresh);
                continue;
            }
            if fresh.error > error_limit {
                break;
            }

            let wedges = match mesh.wedge_map(u, fresh.target) {
                Some(w) => w,
                None => continue,
            };
            mesh.collapse(u, fresh.target, &wedges);
            achieved = achieved.max(fresh.error);

            let v = fresh.target;
            let mut affected = mesh.neighbors(v);
            affected.push(v);
            for w in affected {
                match mesh.best_candidate(w) {
                    Some(c) => {
                        queue.push(w, c);
                    }
                    None => {
                        queue.remove(&w);
                    }
                }
            }
        }

        Ok(SimplifyResult {
            indices: mesh.to_indices(),
            error: achieved.sqrt() as f32,
        })
    }
}
