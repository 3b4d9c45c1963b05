//! Voxelized model space.
//!
//! The inversion only talks to the model space through the [`Mesh`] trait:
//! cell geometry by index, point-to-cell lookup and neighbor search.
//! [`PrismMesh`] is the regular grid of right rectangular prisms used in
//! practice.

use std::collections::HashSet;
use std::fmt;

use glam::DVec3;

use crate::error::{HarvestError, Result};
use crate::types::CellId;

/// A right rectangular prism. Coordinates are x -> North, y -> East and
/// z -> Down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prism {
    pub x1: f64,
    pub x2: f64,
    pub y1: f64,
    pub y2: f64,
    pub z1: f64,
    pub z2: f64,
}

impl Prism {
    pub fn new(x1: f64, x2: f64, y1: f64, y2: f64, z1: f64, z2: f64) -> Self {
        Self {
            x1,
            x2,
            y1,
            y2,
            z1,
            z2,
        }
    }

    /// The `(x1, y1, z1)` corner. Seed distances are measured between corners.
    #[inline]
    pub fn corner(&self) -> DVec3 {
        DVec3::new(self.x1, self.y1, self.z1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Face neighbors as `(di, dj, dk)`: above, below, front, back, left, right.
const FACE_OFFSETS: [(isize, isize, isize); 6] = [
    (0, 0, -1),
    (0, 0, 1),
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
];

/// Edge and vertex neighbors, appended after the face neighbors when a full
/// neighborhood is requested.
const DIAGONAL_OFFSETS: [(isize, isize, isize); 20] = [
    (1, 1, 0),
    (1, -1, 0),
    (-1, 1, 0),
    (-1, -1, 0),
    (0, 1, -1),
    (0, -1, -1),
    (1, 0, -1),
    (-1, 0, -1),
    (1, 1, -1),
    (1, -1, -1),
    (-1, 1, -1),
    (-1, -1, -1),
    (0, 1, 1),
    (0, -1, 1),
    (1, 0, 1),
    (-1, 0, 1),
    (1, 1, 1),
    (1, -1, 1),
    (-1, 1, 1),
    (-1, -1, 1),
];

/// Read access to a voxelized model space.
///
/// Cells are addressed by the linear index `i + j*nx + k*nx*ny`, where
/// `i, j, k` are the x, y and z grid coordinates.
pub trait Mesh: fmt::Debug {
    /// Number of cells along each axis, as `(nz, ny, nx)`.
    fn shape(&self) -> (usize, usize, usize);

    /// Cell size along each axis, as `(dz, dy, dx)`.
    fn dims(&self) -> (f64, f64, f64);

    /// `[x1, x2, y1, y2, z1, z2]` of the whole mesh.
    fn bounds(&self) -> [f64; 6];

    /// Geometry of a cell, or `None` if the index is out of range or the
    /// cell is masked. Masked cells can never be claimed.
    fn cell(&self, index: CellId) -> Option<Prism>;

    /// Sorted cell boundaries along `axis` (one more than the number of cells).
    fn axis_boundaries(&self, axis: Axis) -> Vec<f64>;

    fn size(&self) -> usize {
        let (nz, ny, nx) = self.shape();
        nz * ny * nx
    }

    /// Finds the cell containing `point` by bisecting the axis boundaries.
    ///
    /// A point on a face shared by two cells belongs to the lower one.
    /// Returns `None` outside the mesh bounds or on a masked cell.
    fn locate(&self, point: DVec3) -> Option<CellId> {
        let [x1, x2, y1, y2, z1, z2] = self.bounds();
        let inside = (x1..=x2).contains(&point.x)
            && (y1..=y2).contains(&point.y)
            && (z1..=z2).contains(&point.z);
        if !inside {
            return None;
        }
        let (_, ny, nx) = self.shape();
        let i = bisect(&self.axis_boundaries(Axis::X), point.x);
        let j = bisect(&self.axis_boundaries(Axis::Y), point.y);
        let k = bisect(&self.axis_boundaries(Axis::Z), point.z);
        let index = i + j * nx + k * nx * ny;
        self.cell(index).map(|_| index)
    }

    /// Indices of the cells sharing a face with `index`, plus the ones on
    /// the diagonals if `full` is set. Cells outside the grid and masked
    /// cells are left out.
    fn neighbors(&self, index: CellId, full: bool) -> Vec<CellId> {
        let (nz, ny, nx) = self.shape();
        if index >= nz * ny * nx {
            return Vec::new();
        }
        let i = (index % nx) as isize;
        let j = ((index / nx) % ny) as isize;
        let k = (index / (nx * ny)) as isize;

        let diagonals: &[(isize, isize, isize)] = if full { &DIAGONAL_OFFSETS } else { &[] };
        FACE_OFFSETS
            .iter()
            .chain(diagonals)
            .filter_map(|&(di, dj, dk)| {
                let (ni, nj, nk) = (i + di, j + dj, k + dk);
                let in_grid = (0..nx as isize).contains(&ni)
                    && (0..ny as isize).contains(&nj)
                    && (0..nz as isize).contains(&nk);
                if !in_grid {
                    return None;
                }
                let n = ni as usize + nj as usize * nx + nk as usize * nx * ny;
                self.cell(n).map(|_| n)
            })
            .collect()
    }
}

/// Index of the cell whose interval along one axis holds `value`.
fn bisect(boundaries: &[f64], value: f64) -> usize {
    let cells = boundaries.len().saturating_sub(1);
    boundaries
        .partition_point(|&b| b < value)
        .saturating_sub(1)
        .min(cells.saturating_sub(1))
}

/// A regular grid of right rectangular prisms, with optional masking.
#[derive(Clone, Debug)]
pub struct PrismMesh {
    bounds: [f64; 6],
    shape: (usize, usize, usize),
    mask: HashSet<CellId>,
}

impl PrismMesh {
    /// Creates a mesh filling `bounds = [x1, x2, y1, y2, z1, z2]` with
    /// `shape = (nz, ny, nx)` cells.
    pub fn new(bounds: [f64; 6], shape: (usize, usize, usize)) -> Result<Self> {
        let (nz, ny, nx) = shape;
        if nz == 0 || ny == 0 || nx == 0 {
            return Err(HarvestError::InvalidMesh(format!(
                "shape {shape:?} has an empty dimension"
            )));
        }
        let [x1, x2, y1, y2, z1, z2] = bounds;
        if !(x1 < x2 && y1 < y2 && z1 < z2) {
            return Err(HarvestError::InvalidMesh(format!(
                "bounds {bounds:?} are not increasing"
            )));
        }
        Ok(Self {
            bounds,
            shape,
            mask: HashSet::new(),
        })
    }

    /// Marks cells as absent from the model space.
    pub fn mask(&mut self, indices: impl IntoIterator<Item = CellId>) {
        self.mask.extend(indices);
    }

    pub fn is_masked(&self, index: CellId) -> bool {
        self.mask.contains(&index)
    }
}

impl Mesh for PrismMesh {
    fn shape(&self) -> (usize, usize, usize) {
        self.shape
    }

    fn dims(&self) -> (f64, f64, f64) {
        let [x1, x2, y1, y2, z1, z2] = self.bounds;
        let (nz, ny, nx) = self.shape;
        (
            (z2 - z1) / nz as f64,
            (y2 - y1) / ny as f64,
            (x2 - x1) / nx as f64,
        )
    }

    fn bounds(&self) -> [f64; 6] {
        self.bounds
    }

    fn cell(&self, index: CellId) -> Option<Prism> {
        if index >= self.size() || self.mask.contains(&index) {
            return None;
        }
        let (_, ny, nx) = self.shape;
        let (dz, dy, dx) = self.dims();
        let [x1, _, y1, _, z1, _] = self.bounds;
        let i = (index % nx) as f64;
        let j = ((index / nx) % ny) as f64;
        let k = (index / (nx * ny)) as f64;
        Some(Prism::new(
            x1 + i * dx,
            x1 + (i + 1.0) * dx,
            y1 + j * dy,
            y1 + (j + 1.0) * dy,
            z1 + k * dz,
            z1 + (k + 1.0) * dz,
        ))
    }

    fn axis_boundaries(&self, axis: Axis) -> Vec<f64> {
        let [x1, x2, y1, y2, z1, z2] = self.bounds;
        let (nz, ny, nx) = self.shape;
        let (lo, hi, n) = match axis {
            Axis::X => (x1, x2, nx),
            Axis::Y => (y1, y2, ny),
            Axis::Z => (z1, z2, nz),
        };
        let step = (hi - lo) / n as f64;
        let mut boundaries: Vec<f64> = (0..n).map(|c| lo + c as f64 * step).collect();
        boundaries.push(hi);
        boundaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube() -> PrismMesh {
        // 2 x 3 x 4 cells of 1 x 2 x 0.5 units.
        PrismMesh::new([0.0, 4.0, 0.0, 6.0, 0.0, 1.0], (2, 3, 4)).unwrap()
    }

    #[test]
    fn new_rejects_empty_shapes_and_inverted_bounds() {
        assert!(matches!(
            PrismMesh::new([0.0, 1.0, 0.0, 1.0, 0.0, 1.0], (0, 1, 1)),
            Err(HarvestError::InvalidMesh(_))
        ));
        assert!(matches!(
            PrismMesh::new([1.0, 0.0, 0.0, 1.0, 0.0, 1.0], (1, 1, 1)),
            Err(HarvestError::InvalidMesh(_))
        ));
    }

    #[test]
    fn shape_dims_and_size() {
        let mesh = cube();
        assert_eq!(mesh.shape(), (2, 3, 4));
        assert_eq!(mesh.size(), 24);
        let (dz, dy, dx) = mesh.dims();
        assert_relative_eq!(dz, 0.5);
        assert_relative_eq!(dy, 2.0);
        assert_relative_eq!(dx, 1.0);
    }

    #[test]
    fn cell_follows_linear_index_layout() {
        let mesh = cube();
        // i = 1, j = 2, k = 1
        let index = 1 + 2 * 4 + 4 * 3;
        let prism = mesh.cell(index).unwrap();
        assert_eq!(prism, Prism::new(1.0, 2.0, 4.0, 6.0, 0.5, 1.0));
        assert_eq!(prism.corner(), DVec3::new(1.0, 4.0, 0.5));
        assert!(mesh.cell(24).is_none());
    }

    #[test]
    fn masked_cells_are_absent() {
        let mut mesh = cube();
        mesh.mask([5]);
        assert!(mesh.is_masked(5));
        assert!(mesh.cell(5).is_none());
        assert!(mesh.cell(4).is_some());
    }

    #[test]
    fn axis_boundaries_are_sorted_and_end_on_the_bounds() {
        let mesh = cube();
        assert_eq!(mesh.axis_boundaries(Axis::X), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(mesh.axis_boundaries(Axis::Y), vec![0.0, 2.0, 4.0, 6.0]);
        assert_eq!(mesh.axis_boundaries(Axis::Z), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn locate_finds_the_enclosing_cell() {
        let mesh = cube();
        assert_eq!(mesh.locate(DVec3::new(0.5, 1.0, 0.25)), Some(0));
        assert_eq!(mesh.locate(DVec3::new(3.5, 5.0, 0.75)), Some(23));
        // Interior faces belong to the lower cell, mesh edges to the edge cell.
        assert_eq!(mesh.locate(DVec3::new(1.0, 1.0, 0.25)), Some(0));
        assert_eq!(mesh.locate(DVec3::new(0.0, 0.0, 0.0)), Some(0));
        assert_eq!(mesh.locate(DVec3::new(4.0, 6.0, 1.0)), Some(23));
    }

    #[test]
    fn locate_rejects_outside_and_masked_points() {
        let mut mesh = cube();
        assert_eq!(mesh.locate(DVec3::new(-0.1, 1.0, 0.25)), None);
        assert_eq!(mesh.locate(DVec3::new(0.5, 1.0, 1.5)), None);
        mesh.mask([0]);
        assert_eq!(mesh.locate(DVec3::new(0.5, 1.0, 0.25)), None);
    }

    #[test]
    fn face_neighbors_in_the_middle_of_the_grid() {
        let mesh = PrismMesh::new([0.0, 3.0, 0.0, 3.0, 0.0, 3.0], (3, 3, 3)).unwrap();
        // Center cell: above, below, front, back, left, right.
        assert_eq!(mesh.neighbors(13, false), vec![4, 22, 14, 12, 16, 10]);
        assert_eq!(mesh.neighbors(13, true).len(), 26);
    }

    #[test]
    fn neighbors_stay_inside_the_grid_and_skip_masked_cells() {
        let mut mesh = PrismMesh::new([0.0, 2.0, 0.0, 2.0, 0.0, 2.0], (2, 2, 2)).unwrap();
        assert_eq!(mesh.neighbors(0, false), vec![4, 1, 2]);
        assert_eq!(mesh.neighbors(0, true).len(), 7);
        mesh.mask([1]);
        assert_eq!(mesh.neighbors(0, false), vec![4, 2]);
        assert!(mesh.neighbors(8, false).is_empty());
    }
}
