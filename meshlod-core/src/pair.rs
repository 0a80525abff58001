//! Source/destination geometry pairs and the model that owns them

use crate::bounds::Aabb;
use crate::geometry::{BufferGeometry, DrawRange};
use crate::point::Point3f;
use crate::{Error, Result};

/// One sub-mesh under simplification.
///
/// The source geometry never changes after construction. The destination
/// shares the source vertices and owns a rewritable index buffer whose first
/// `draw_count` entries are displayed.
#[derive(Debug, Clone)]
pub struct GeometryPair {
    index: usize,
    name: String,
    source: BufferGeometry,
    destination: BufferGeometry,
    draw_count: usize,
}

impl GeometryPair {
    /// Register `source` as sub-mesh `index`. The source must already carry a
    /// valid index buffer.
    pub fn new(index: usize, name: impl Into<String>, source: BufferGeometry) -> Result<Self> {
        let name = name.into();
        if source.index.is_none() {
            return Err(Error::InvalidGeometry(format!(
                "sub-mesh {} ({}) has no index buffer",
                index, name
            )));
        }
        if source.positions.is_empty() {
            return Err(Error::InvalidGeometry(format!(
                "sub-mesh {} ({}) has no position attribute",
                index, name
            )));
        }
        source.validate()?;

        let mut source = source;
        source.draw_range = DrawRange::ALL;
        let destination = source.clone();
        let draw_count = source.index.as_ref().map_or(0, Vec::len);

        Ok(Self {
            index,
            name,
            source,
            destination,
            draw_count,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &BufferGeometry {
        &self.source
    }

    pub fn source_indices(&self) -> &[u32] {
        self.source.index.as_deref().unwrap_or(&[])
    }

    pub fn source_positions(&self) -> &[Point3f] {
        &self.source.positions
    }

    /// Geometry to display: source vertices, reduced index buffer and a
    /// draw range limited to `draw_count`
    pub fn destination(&self) -> &BufferGeometry {
        &self.destination
    }

    pub fn destination_indices(&self) -> &[u32] {
        self.destination.index.as_deref().unwrap_or(&[])
    }

    pub fn draw_count(&self) -> usize {
        self.draw_count
    }

    pub fn source_triangle_count(&self) -> usize {
        self.source_indices().len() / 3
    }

    pub fn destination_triangle_count(&self) -> usize {
        self.draw_count / 3
    }

    /// Replace the destination index buffer with `indices`.
    ///
    /// The whole buffer is written before the draw count changes, and the
    /// draw count never exceeds the written length.
    pub fn apply_reduction(&mut self, indices: &[u32]) -> Result<()> {
        if indices.len() % 3 != 0 {
            return Err(Error::InvalidData(format!(
                "reduced index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if indices.len() > self.source_indices().len() {
            return Err(Error::InvalidData(format!(
                "reduced index count {} exceeds source count {}",
                indices.len(),
                self.source_indices().len()
            )));
        }
        let vertex_count = self.source.positions.len();
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(Error::InvalidData(format!(
                "reduced index {} out of range for {} vertices",
                bad, vertex_count
            )));
        }

        let dst = self.destination.index.get_or_insert_with(Vec::new);
        dst.clear();
        dst.extend_from_slice(indices);

        self.draw_count = indices.len();
        self.destination.draw_range = DrawRange::new(0, self.draw_count);
        Ok(())
    }
}

/// Ordered sub-meshes of one loaded file, in discovery order
#[derive(Debug, Clone, Default)]
pub struct Model {
    pairs: Vec<GeometryPair>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model from named sub-mesh geometries. Geometries without an
    /// index buffer are indexed by merging duplicate vertices first.
    pub fn from_geometries<I, S>(geometries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, BufferGeometry)>,
        S: Into<String>,
    {
        let pairs = geometries
            .into_iter()
            .enumerate()
            .map(|(i, (name, geometry))| GeometryPair::new(i, name, geometry.into_indexed()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { pairs })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[GeometryPair] {
        &self.pairs
    }

    pub fn pairs_mut(&mut self) -> &mut [GeometryPair] {
        &mut self.pairs
    }

    /// Bounds of every source vertex
    pub fn bounding_box(&self) -> Aabb {
        self.pairs
            .iter()
            .fold(Aabb::empty(), |acc, p| acc.union(&p.source.bounding_box()))
    }

    pub fn source_triangle_count(&self) -> usize {
        self.pairs.iter().map(GeometryPair::source_triangle_count).sum()
    }

    pub fn destination_triangle_count(&self) -> usize {
        self.pairs
            .iter()
            .map(GeometryPair::destination_triangle_count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> BufferGeometry {
        BufferGeometry::indexed(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn test_pair_starts_with_full_destination() {
        let pair = GeometryPair::new(0, "quad", quad()).unwrap();
        assert_eq!(pair.draw_count(), 6);
        assert_eq!(pair.destination_indices(), pair.source_indices());
        assert_eq!(pair.destination().triangle_count(), 2);
    }

    #[test]
    fn test_pair_rejects_unindexed_source() {
        let soup = BufferGeometry::from_positions(vec![Point3f::origin(); 3]);
        assert!(matches!(
            GeometryPair::new(0, "soup", soup),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_pair_rejects_empty_positions() {
        let empty = BufferGeometry::indexed(Vec::new(), Vec::new());
        assert!(GeometryPair::new(0, "empty", empty).is_err());
    }

    #[test]
    fn test_apply_reduction_updates_draw_count() {
        let mut pair = GeometryPair::new(0, "quad", quad()).unwrap();
        pair.apply_reduction(&[0, 1, 2]).unwrap();
        assert_eq!(pair.draw_count(), 3);
        assert_eq!(pair.destination_indices(), &[0, 1, 2]);
        assert_eq!(pair.destination().triangle_count(), 1);
        // Source is untouched.
        assert_eq!(pair.source_indices().len(), 6);
    }

    #[test]
    fn test_apply_reduction_rejects_invalid_buffers() {
        let mut pair = GeometryPair::new(0, "quad", quad()).unwrap();
        assert!(pair.apply_reduction(&[0, 1]).is_err());
        assert!(pair.apply_reduction(&[0, 1, 9]).is_err());
        assert!(pair.apply_reduction(&[0, 1, 2, 0, 2, 3, 0, 1, 2]).is_err());
        // A rejected write leaves the previous state intact.
        assert_eq!(pair.draw_count(), 6);
    }

    #[test]
    fn test_model_indexes_soup_in_discovery_order() {
        let soup = BufferGeometry::from_positions(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
        ]);
        let model = Model::from_geometries(vec![("a", quad()), ("b", soup)]).unwrap();
        assert_eq!(model.len(), 2);
        assert_eq!(model.pairs()[0].name(), "a");
        assert_eq!(model.pairs()[1].name(), "b");
        assert_eq!(model.pairs()[1].index(), 1);
        assert!(model.pairs()[1].source().is_indexed());
        assert_eq!(model.source_triangle_count(), 3);
        assert_eq!(model.destination_triangle_count(), 3);
    }
}
