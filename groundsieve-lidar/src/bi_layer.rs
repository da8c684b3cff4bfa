use std::collections::HashMap;

use crate::dem_layer::{weighted_rms, DemCell, DemLayer};
use crate::point::PointStore;
use crate::voxel_grid::VoxelGrid;

/// One cell of a `BiLayer`: its four corner heights (lower-left, upper-left,
/// lower-right, upper-right — `ld`/`lu`/`rd`/`ru`), each with its propagated
/// uncertainty, plus the aggregate MSE of the interpolated surface against the
/// base points that fall in this cell. Any corner may be `None` if none of its
/// contributing DEM cells exist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiCell {
    pub ix: i64,
    pub iy: i64,
    pub z_ld: Option<f64>,
    pub z_lu: Option<f64>,
    pub z_rd: Option<f64>,
    pub z_ru: Option<f64>,
    pub mse_ld: Option<f64>,
    pub mse_lu: Option<f64>,
    pub mse_rd: Option<f64>,
    pub mse_ru: Option<f64>,
    pub mse: Option<f64>,
}

/// A sparse per-cell bilinear elevation surface, continuous across shared
/// corners, derived from a `DemLayer`. A cell exists in this layer iff the
/// corresponding `DemLayer` cell exists (spec.md §3; see `DESIGN.md` for why
/// that key set suffices for every lookup the rest of the pipeline performs).
pub struct BiLayer {
    cells: HashMap<(i64, i64), BiCell>,
    pub mse_data: Option<f64>,
}

impl BiLayer {
    /// Builds corner heights for every occupied DEM cell, blending each
    /// corner's contributors per `weighted` (spec.md §4.3's weighted policy is
    /// the default used by `GroundFilter`), then runs a second pass over
    /// `store`'s active points to compute each cell's aggregate MSE against
    /// the interpolated surface.
    pub fn build(dem: &DemLayer, store: &PointStore, grid: &VoxelGrid, weighted: bool) -> BiLayer {
        let mut cells: HashMap<(i64, i64), BiCell> = HashMap::new();

        for c in dem.iter() {
            let (ix, iy) = (c.ix, c.iy);
            let (z_ld, mse_ld) = blend_corner(
                [
                    dem.get(ix - 1, iy - 1),
                    dem.get(ix - 1, iy),
                    dem.get(ix, iy - 1),
                    dem.get(ix, iy),
                ],
                weighted,
            );
            let (z_rd, mse_rd) = blend_corner(
                [
                    dem.get(ix, iy - 1),
                    dem.get(ix, iy),
                    dem.get(ix + 1, iy - 1),
                    dem.get(ix + 1, iy),
                ],
                weighted,
            );
            let (z_lu, mse_lu) = blend_corner(
                [
                    dem.get(ix - 1, iy),
                    dem.get(ix - 1, iy + 1),
                    dem.get(ix, iy),
                    dem.get(ix, iy + 1),
                ],
                weighted,
            );
            let (z_ru, mse_ru) = blend_corner(
                [
                    dem.get(ix, iy),
                    dem.get(ix, iy + 1),
                    dem.get(ix + 1, iy),
                    dem.get(ix + 1, iy + 1),
                ],
                weighted,
            );

            cells.insert(
                (ix, iy),
                BiCell {
                    ix,
                    iy,
                    z_ld,
                    z_lu,
                    z_rd,
                    z_ru,
                    mse_ld,
                    mse_lu,
                    mse_rd,
                    mse_ru,
                    mse: None,
                },
            );
        }

        let mut vv: HashMap<(i64, i64), f64> = HashMap::new();
        let mut r: HashMap<(i64, i64), f64> = HashMap::new();
        for p in store.iter_active() {
            if let Some(key) = grid.cell_of(p.x, p.y) {
                if let Some(cell) = cells.get(&key) {
                    if let Some(z_interp) = interpolate_cell(cell, grid, p.x, p.y) {
                        let d = p.z - z_interp;
                        *vv.entry(key).or_insert(0.0) += d * d;
                        *r.entry(key).or_insert(0.0) += 1.0;
                    }
                }
            }
        }
        for (key, cell) in cells.iter_mut() {
            let r_c = *r.get(key).unwrap_or(&0.0);
            if r_c > 0.0 {
                let v = *vv.get(key).unwrap_or(&0.0);
                cell.mse = Some((v / r_c).sqrt());
            }
        }

        let mse_data = weighted_rms(cells.values().filter_map(|c| {
            let r_c = *r.get(&(c.ix, c.iy)).unwrap_or(&0.0);
            if r_c > 0.0 {
                c.mse.map(|m| (m, r_c))
            } else {
                None
            }
        }));

        BiLayer { cells, mse_data }
    }

    pub fn get(&self, ix: i64, iy: i64) -> Option<&BiCell> {
        self.cells.get(&(ix, iy))
    }

    pub fn iter(&self) -> impl Iterator<Item = &BiCell> {
        self.cells.values()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The interpolated surface height at an arbitrary `(x, y)`, or `None`
    /// when the point's cell has no `BiCell` or any referenced corner is
    /// undefined.
    pub fn interpolate(&self, grid: &VoxelGrid, x: f64, y: f64) -> Option<f64> {
        let (ix, iy) = grid.cell_of(x, y)?;
        let cell = self.cells.get(&(ix, iy))?;
        interpolate_cell(cell, grid, x, y)
    }

    /// The sorted median of per-cell `mse` over cells that have one, or
    /// `None` when no cell does (spec.md §4.4's `m = median{c.mse : ...}`).
    pub fn median_mse(&self) -> Option<f64> {
        let mut values: Vec<f64> = self.cells.values().filter_map(|c| c.mse).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = values.len() / 2;
        if values.len() % 2 == 1 {
            Some(values[mid])
        } else {
            Some((values[mid - 1] + values[mid]) / 2.0)
        }
    }
}

fn interpolate_cell(cell: &BiCell, grid: &VoxelGrid, x: f64, y: f64) -> Option<f64> {
    let (x1, y1) = grid.cell_origin(cell.ix, cell.iy);
    let x2 = x1 + grid.step;
    let y2 = y1 + grid.step;
    let step = grid.step;

    let z_ld = cell.z_ld?;
    let z_lu = cell.z_lu?;
    let z_rd = cell.z_rd?;
    let z_ru = cell.z_ru?;

    let r1 = ((x2 - x) / step) * z_ld + ((x - x1) / step) * z_rd;
    let r2 = ((x2 - x) / step) * z_lu + ((x - x1) / step) * z_ru;
    Some(((y2 - y) / step) * r1 + ((y - y1) / step) * r2)
}

/// Blends up to four contributing DEM cells into one corner height.
///
/// Unweighted: plain arithmetic mean of present contributors' `avg_z`.
/// Weighted: inverse-variance weighting (`w_i = 1/mse_i^2`); a contributor
/// with `mse_i == 0` short-circuits the blend entirely (that corner *is* that
/// contributor's height, with zero uncertainty); contributors with `mse_i ==
/// None` (fewer than two points in that DEM cell) are skipped. Returns
/// `(None, None)` when no contributor qualifies.
fn blend_corner(contributors: [Option<&DemCell>; 4], weighted: bool) -> (Option<f64>, Option<f64>) {
    let present: Vec<&DemCell> = contributors.into_iter().flatten().collect();
    if present.is_empty() {
        return (None, None);
    }

    if !weighted {
        let avg = present.iter().map(|c| c.avg_z).sum::<f64>() / present.len() as f64;
        return (Some(avg), None);
    }

    for c in &present {
        if let Some(m) = c.mse {
            if m == 0.0 {
                return (Some(c.avg_z), Some(0.0));
            }
        }
    }

    let mut w_sum = 0.0;
    let mut wz_sum = 0.0;
    for c in &present {
        if let Some(m) = c.mse {
            let w = 1.0 / (m * m);
            w_sum += w;
            wz_sum += w * c.avg_z;
        }
    }

    if w_sum > 0.0 {
        (Some(wz_sum / w_sum), Some(1.0 / w_sum.sqrt()))
    } else {
        (None, None)
    }
}
