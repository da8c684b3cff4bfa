use std::collections::HashMap;

use crate::point::PointStore;
use crate::voxel_grid::VoxelGrid;

/// One cell of a `DemLayer`: the running average Z of its active points,
/// their count, and the sample MSE of Z against that average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemCell {
    pub ix: i64,
    pub iy: i64,
    pub avg_z: f64,
    pub count: u32,
    pub mse: Option<f64>,
}

/// A sparse per-cell average-elevation surface built from the active points of
/// a `PointStore` over a `VoxelGrid`. Cells with zero active points are never
/// materialised — the map only ever holds occupied cells (spec.md §3).
pub struct DemLayer {
    cells: HashMap<(i64, i64), DemCell>,
    pub mse_data: Option<f64>,
}

impl DemLayer {
    /// Builds the layer in two passes over `store`'s active points, per
    /// spec.md §4.2: the mean must be fully known before the squared
    /// deviations that depend on it can be accumulated.
    pub fn build(store: &PointStore, grid: &VoxelGrid) -> DemLayer {
        let mut cells: HashMap<(i64, i64), DemCell> = HashMap::new();

        // Pass 1: running mean of Z per cell.
        for p in store.iter_active() {
            if let Some(key) = grid.cell_of(p.x, p.y) {
                let cell = cells.entry(key).or_insert(DemCell {
                    ix: key.0,
                    iy: key.1,
                    avg_z: 0.0,
                    count: 0,
                    mse: None,
                });
                cell.avg_z = (cell.avg_z * cell.count as f64 + p.z) / (cell.count as f64 + 1.0);
                cell.count += 1;
            }
        }

        // Pass 2: accumulate squared deviation against the now-final mean.
        let mut vv: HashMap<(i64, i64), f64> = HashMap::new();
        for p in store.iter_active() {
            if let Some(key) = grid.cell_of(p.x, p.y) {
                if let Some(cell) = cells.get(&key) {
                    let d = p.z - cell.avg_z;
                    *vv.entry(key).or_insert(0.0) += d * d;
                }
            }
        }
        for (key, cell) in cells.iter_mut() {
            if cell.count >= 2 {
                let v = *vv.get(key).unwrap_or(&0.0);
                cell.mse = Some((v / (cell.count as f64 - 1.0)).sqrt());
            } else {
                cell.mse = None;
            }
        }

        let mse_data = weighted_rms(cells.values().filter_map(|c| {
            if c.count >= 2 {
                c.mse.map(|m| (m, c.count as f64 - 1.0))
            } else {
                None
            }
        }));

        DemLayer { cells, mse_data }
    }

    pub fn get(&self, ix: i64, iy: i64) -> Option<&DemCell> {
        self.cells.get(&(ix, iy))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DemCell> {
        self.cells.values()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Degree-of-freedom-weighted RMS: `sqrt(sum(mse_c^2 * r_c) / sum(r_c))` over
/// `(mse, r)` pairs with `r > 0`. Shared by `DemLayer` and `BiLayer`
/// aggregate-MSE computation (spec.md §4.2/§4.3).
pub fn weighted_rms(values: impl Iterator<Item = (f64, f64)>) -> Option<f64> {
    let mut num = 0.0;
    let mut den = 0.0;
    for (mse, r) in values {
        if r > 0.0 {
            num += mse * mse * r;
            den += r;
        }
    }
    if den > 0.0 {
        Some((num / den).sqrt())
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::point::{Point, PointStore};

    fn store_with(points: Vec<(f64, f64, f64)>) -> PointStore {
        let pts: Vec<Point> = points
            .into_iter()
            .enumerate()
            .map(|(i, (x, y, z))| Point::new(i as u64 + 1, x, y, z, 0, 0, 0))
            .collect();
        PointStore::new(pts)
    }

    #[test]
    fn test_single_point_cell_has_no_mse() {
        let store = store_with(vec![(0.5, 0.5, 3.0)]);
        let grid = VoxelGrid::new(store.metrics(), 1.0, 0.0, 0.0);
        let dem = DemLayer::build(&store, &grid);
        let cell = dem.get(0, 0).unwrap();
        assert_eq!(cell.count, 1);
        assert_eq!(cell.avg_z, 3.0);
        assert_eq!(cell.mse, None);
        assert_eq!(dem.mse_data, None);
    }

    #[test]
    fn test_two_point_cell_mean_and_mse() {
        let store = store_with(vec![(0.1, 0.1, 2.0), (0.9, 0.9, 4.0)]);
        let grid = VoxelGrid::new(store.metrics(), 1.0, 0.0, 0.0);
        let dem = DemLayer::build(&store, &grid);
        let cell = dem.get(0, 0).unwrap();
        assert_eq!(cell.count, 2);
        assert!((cell.avg_z - 3.0).abs() < 1e-9);
        // variance = ((2-3)^2 + (4-3)^2) / (2-1) = 2, mse = sqrt(2)
        assert!((cell.mse.unwrap() - 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_empty_store_yields_empty_layer() {
        let store = store_with(vec![]);
        // With no points, bounds are degenerate; guard by skipping grid
        // construction in callers. Here we only check the layer API handles
        // a grid with no occupied cells gracefully.
        let grid = VoxelGrid {
            step: 1.0,
            dx: 0.0,
            dy: 0.0,
            min_x: 0.0,
            max_x: 1.0,
            min_y: 0.0,
            max_y: 1.0,
            x_count: 1,
            y_count: 1,
        };
        let dem = DemLayer::build(&store, &grid);
        assert!(dem.is_empty());
        assert_eq!(dem.mse_data, None);
    }

    #[test]
    fn test_weighted_rms_empty_is_none() {
        assert_eq!(weighted_rms(std::iter::empty()), None);
    }
}
