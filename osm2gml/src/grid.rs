use std::collections::{BTreeMap, BTreeSet};

use geom::Bounds;

/// A uniform bucket index over bounding boxes. Queries are a conservative broad-phase filter;
/// callers still have to do exact geometric tests on whatever comes back.
///
/// Topology changes invalidate the grid, so build a fresh one whenever needed.
pub struct SpatialGrid<K: Copy + Ord> {
    bounds: Bounds,
    cell_size: f64,
    cols: i64,
    rows: i64,
    cells: BTreeMap<(i64, i64), Vec<K>>,
}

impl<K: Copy + Ord> SpatialGrid<K> {
    /// Empty or invalid bounds produce a grid with a single cell.
    pub fn new(bounds: Bounds, cell_size: f64) -> SpatialGrid<K> {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size.max(1e-9)
        } else {
            1.0
        };
        if !bounds.is_valid() {
            return SpatialGrid {
                bounds: Bounds::from(&[geom::Pt2D::zero()]),
                cell_size,
                cols: 1,
                rows: 1,
                cells: BTreeMap::new(),
            };
        }
        // Keep the number of cells sane even for absurd cell sizes
        let max_cells_per_axis = 10_000.0;
        let cell_size = cell_size
            .max(bounds.width() / max_cells_per_axis)
            .max(bounds.height() / max_cells_per_axis);
        let cols = ((bounds.width() / cell_size).floor() as i64 + 1).max(1);
        let rows = ((bounds.height() / cell_size).floor() as i64 + 1).max(1);
        SpatialGrid {
            bounds,
            cell_size,
            cols,
            rows,
            cells: BTreeMap::new(),
        }
    }

    /// Cell size is the average dimension of the bounds, divided up.
    pub fn for_bounds(bounds: Bounds, divisions: f64) -> SpatialGrid<K> {
        let avg = (bounds.width() + bounds.height()) / 2.0;
        SpatialGrid::new(bounds, avg / divisions)
    }

    fn cell_range(&self, b: &Bounds) -> (i64, i64, i64, i64) {
        let clamp_col = |x: f64| {
            (((x - self.bounds.min_x) / self.cell_size).floor() as i64).clamp(0, self.cols - 1)
        };
        let clamp_row = |y: f64| {
            (((y - self.bounds.min_y) / self.cell_size).floor() as i64).clamp(0, self.rows - 1)
        };
        (
            clamp_col(b.min_x),
            clamp_row(b.min_y),
            clamp_col(b.max_x),
            clamp_row(b.max_y),
        )
    }

    /// Register the item in every cell its bounding box overlaps.
    pub fn add(&mut self, key: K, b: &Bounds) {
        if !b.is_valid() {
            return;
        }
        let (x1, y1, x2, y2) = self.cell_range(b);
        for x in x1..=x2 {
            for y in y1..=y2 {
                self.cells.entry((x, y)).or_insert_with(Vec::new).push(key);
            }
        }
    }

    /// Everything registered in the cells overlapping the box, plus one cell of padding.
    pub fn query(&self, b: &Bounds) -> BTreeSet<K> {
        let mut result = BTreeSet::new();
        if !b.is_valid() {
            return result;
        }
        let (x1, y1, x2, y2) = self.cell_range(b);
        for x in (x1 - 1)..=(x2 + 1) {
            for y in (y1 - 1)..=(y2 + 1) {
                if let Some(keys) = self.cells.get(&(x, y)) {
                    result.extend(keys.iter().cloned());
                }
            }
        }
        result
    }
}
