use crate::bi_layer::BiLayer;
use crate::point::PointStore;
use crate::voxel_grid::VoxelGrid;

/// The two threshold policies a filter pass can apply against a `BiLayer`.
/// Both are one-sided: a point below the fitted surface is never rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdPolicy {
    /// Reject when `(z - z_interp) > max_v`.
    MaxV { max_v: f64 },
    /// Reject when `(z - z_interp) > k_value * median(cell.mse)`, where the
    /// median is fixed at construction time over the `BiLayer` passed to
    /// `Filter::apply`.
    Median { k_value: f64, median: f64 },
}

/// Applies a `ThresholdPolicy` against a `BiLayer`, staging rejections and
/// committing them to a `PointStore` atomically (spec.md §5: no partial
/// mutation is observable mid-pass).
pub struct Filter;

impl Filter {
    /// Evaluates every active point in `store` against `layer` under `policy`
    /// and applies the resulting rejections. Points whose cell is absent, or
    /// whose interpolation is `None`, or whose cell `mse` is `None`, are kept
    /// active regardless of policy (spec.md §4.4's keep-on-missing rule,
    /// deliberately reversing the original's reject-on-missing behaviour —
    /// see `DESIGN.md`). The cell-`mse`-null check is independent of whether
    /// interpolation itself succeeded: a cell can interpolate a height from
    /// its corners while still lacking enough base points of its own to have
    /// an aggregate `mse`.
    pub fn apply(store: &mut PointStore, grid: &VoxelGrid, layer: &BiLayer, policy: ThresholdPolicy) {
        let mut reject = vec![false; store.len()];
        for (i, p) in store.points().iter().enumerate() {
            if !store.is_active(i) {
                continue;
            }
            let cell = match grid.cell_of(p.x, p.y).and_then(|(ix, iy)| layer.get(ix, iy)) {
                Some(c) => c,
                None => continue,
            };
            if cell.mse.is_none() {
                continue;
            }
            let z_interp = match layer.interpolate(grid, p.x, p.y) {
                Some(z) => z,
                None => continue,
            };
            let residual = p.z - z_interp;
            if residual <= 0.0 {
                continue;
            }
            let exceeds = match policy {
                ThresholdPolicy::MaxV { max_v } => residual > max_v,
                ThresholdPolicy::Median { k_value, median } => residual > k_value * median,
            };
            if exceeds {
                reject[i] = true;
            }
        }
        store.apply_rejections(&reject);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dem_layer::DemLayer;
    use crate::point::Point;

    fn grid_plane(points: Vec<(f64, f64, f64)>, step: f64) -> (PointStore, VoxelGrid) {
        let pts: Vec<Point> = points
            .into_iter()
            .enumerate()
            .map(|(i, (x, y, z))| Point::new(i as u64 + 1, x, y, z, 0, 0, 0))
            .collect();
        let store = PointStore::new(pts);
        let grid = VoxelGrid::new(store.metrics(), step, 0.0, 0.0);
        (store, grid)
    }

    /// Two points per cell on an `n x n` unit grid (at the `0.25` and `0.75`
    /// offsets inside each cell, both axes), so every DEM cell has
    /// `count == 2` and a defined `mse` — without that, a weighted corner
    /// blend has no contributor to weight and every cell's `mse` stays `None`
    /// (an S2-shaped cloud with exactly one point per cell never leaves that
    /// degenerate state; see `DESIGN.md`'s note on `Filter`).
    ///
    /// Flat cells get two *identical* z values (exact, `mse == 0`), so their
    /// corners win any blend they participate in over a noisy neighbour — the
    /// outlier cell instead gets two distinct z values around its target so
    /// its own `mse` is a genuine positive number, never a competing exact
    /// zero that would make corner selection order-dependent.
    fn doubled_grid(n: i64, outlier: (i64, i64, f64)) -> Vec<(f64, f64, f64)> {
        let mut pts = vec![];
        for ix in 0..n {
            for iy in 0..n {
                let (z_a, z_b) = if (ix, iy) == (outlier.0, outlier.1) {
                    (outlier.2 - 0.1, outlier.2 + 0.1)
                } else {
                    (0.0, 0.0)
                };
                pts.push((ix as f64 + 0.25, iy as f64 + 0.25, z_a));
                pts.push((ix as f64 + 0.75, iy as f64 + 0.75, z_b));
            }
        }
        pts
    }

    #[test]
    fn test_maxv_rejects_only_above_threshold() {
        // S2-shaped: a flat grid at z=0 with one outlier column, doubled up so
        // every cell carries a defined mse (see `doubled_grid`).
        let pts = doubled_grid(3, (1, 1, 10.0));
        let (mut store, grid) = grid_plane(pts, 1.0);
        let dem = DemLayer::build(&store, &grid);
        let bi = BiLayer::build(&dem, &store, &grid, true);
        Filter::apply(&mut store, &grid, &bi, ThresholdPolicy::MaxV { max_v: 1.0 });

        assert_eq!(store.active_count(), 16);
        for (i, p) in store.points().iter().enumerate() {
            let is_outlier = p.z > 5.0;
            assert_eq!(!store.is_active(i), is_outlier);
        }
    }

    #[test]
    fn test_negative_residuals_never_rejected() {
        let pts = doubled_grid(2, (0, 0, -5.0));
        let (mut store, grid) = grid_plane(pts, 1.0);
        let dem = DemLayer::build(&store, &grid);
        let bi = BiLayer::build(&dem, &store, &grid, true);
        Filter::apply(&mut store, &grid, &bi, ThresholdPolicy::MaxV { max_v: 0.01 });
        assert_eq!(store.active_count(), 8);
    }

    #[test]
    fn test_keep_on_missing_interpolation() {
        // A single isolated point has no defined interpolation (see BiLayer
        // test), so it must survive any policy untouched.
        let (mut store, grid) = grid_plane(vec![(0.5, 0.5, 100.0)], 1.0);
        let dem = DemLayer::build(&store, &grid);
        let bi = BiLayer::build(&dem, &store, &grid, true);
        Filter::apply(&mut store, &grid, &bi, ThresholdPolicy::MaxV { max_v: 0.001 });
        assert_eq!(store.active_count(), 1);
    }
}
