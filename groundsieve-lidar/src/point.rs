/// A single point in the cloud. Immutable once loaded; `id` is a dense, 1-based
/// index assigned in input order and is unique within a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Point {
    pub fn new(id: u64, x: f64, y: f64, z: f64, r: u8, g: u8, b: u8) -> Point {
        Point { id, x, y, z, r, g, b }
    }
}

/// Aggregate bounds and active-point count over a `PointStore`'s active subset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreMetrics {
    pub len_active: usize,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

/// The point cloud plus its activity bitmap.
///
/// `active[i]` tracks whether `points[i]` is still a ground candidate.
/// `active.len() == points.len()` always. A filter pass may flip entries
/// `true -> false`; the reverse never happens within a run (monotone activity,
/// spec.md §8 property 1).
pub struct PointStore {
    points: Vec<Point>,
    active: Vec<bool>,
    metrics: StoreMetrics,
}

impl PointStore {
    /// Builds a store from points already carrying dense ids in input order.
    /// All points start active; metrics are computed immediately.
    pub fn new(points: Vec<Point>) -> PointStore {
        let active = vec![true; points.len()];
        let metrics = compute_metrics(&points, &active);
        PointStore {
            points,
            active,
            metrics,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.active[index]
    }

    pub fn metrics(&self) -> StoreMetrics {
        self.metrics
    }

    /// Iterates the currently active points.
    pub fn iter_active(&self) -> impl Iterator<Item = &Point> + '_ {
        self.points
            .iter()
            .zip(self.active.iter())
            .filter(|(_, &is_active)| is_active)
            .map(|(p, _)| p)
    }

    pub fn active_count(&self) -> usize {
        self.metrics.len_active
    }

    /// Applies a staged rejection buffer: for every index flagged `true`, marks
    /// the point rejected. Flags for already-inactive points are ignored (the
    /// bit can only move `true -> false`, never back). Recomputes the store's
    /// aggregate metrics afterward. This is the atomic apply step a `Filter`
    /// pass calls once it has finished evaluating every active point (spec.md
    /// §5: no partial mutation is visible mid-pass).
    pub fn apply_rejections(&mut self, reject: &[bool]) {
        assert_eq!(reject.len(), self.active.len());
        for (a, &r) in self.active.iter_mut().zip(reject.iter()) {
            if r {
                *a = false;
            }
        }
        self.metrics = compute_metrics(&self.points, &self.active);
    }
}

fn compute_metrics(points: &[Point], active: &[bool]) -> StoreMetrics {
    let mut len_active = 0usize;
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    let mut min_z = f64::INFINITY;
    let mut max_z = f64::NEG_INFINITY;
    for (p, &is_active) in points.iter().zip(active.iter()) {
        if !is_active {
            continue;
        }
        len_active += 1;
        if p.x < min_x {
            min_x = p.x;
        }
        if p.x > max_x {
            max_x = p.x;
        }
        if p.y < min_y {
            min_y = p.y;
        }
        if p.y > max_y {
            max_y = p.y;
        }
        if p.z < min_z {
            min_z = p.z;
        }
        if p.z > max_z {
            max_z = p.z;
        }
    }
    StoreMetrics {
        len_active,
        min_x,
        max_x,
        min_y,
        max_y,
        min_z,
        max_z,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pt(id: u64, x: f64, y: f64, z: f64) -> Point {
        Point::new(id, x, y, z, 0, 0, 0)
    }

    #[test]
    fn test_new_store_all_active() {
        let store = PointStore::new(vec![pt(1, 0.0, 0.0, 0.0), pt(2, 1.0, 1.0, 1.0)]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.active_count(), 2);
        assert!(store.is_active(0) && store.is_active(1));
    }

    #[test]
    fn test_metrics_over_active_subset_only() {
        let store = PointStore::new(vec![pt(1, 0.0, 0.0, 0.0), pt(2, 5.0, 5.0, 5.0)]);
        let m = store.metrics();
        assert_eq!(m.min_x, 0.0);
        assert_eq!(m.max_x, 5.0);
    }

    #[test]
    fn test_apply_rejections_monotone() {
        let mut store = PointStore::new(vec![
            pt(1, 0.0, 0.0, 0.0),
            pt(2, 10.0, 10.0, 10.0),
            pt(3, 1.0, 1.0, 1.0),
        ]);
        store.apply_rejections(&[false, true, false]);
        assert_eq!(store.active_count(), 2);
        assert!(store.is_active(0));
        assert!(!store.is_active(1));
        assert!(store.is_active(2));

        let m = store.metrics();
        assert_eq!(m.max_x, 1.0);

        // A second pass can only shrink the active set further, never grow it.
        store.apply_rejections(&[false, true, false]);
        assert_eq!(store.active_count(), 2);
    }

    #[test]
    fn test_iter_active_skips_rejected() {
        let mut store = PointStore::new(vec![pt(1, 0.0, 0.0, 0.0), pt(2, 1.0, 1.0, 9.0)]);
        store.apply_rejections(&[false, true]);
        let ids: Vec<u64> = store.iter_active().map(|p| p.id).collect();
        assert_eq!(ids, vec![1]);
    }
}
