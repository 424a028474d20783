use std::collections::HashSet;

use super::math::{Vector2, TILE_SIZE};

/// Static impassable cells for one level, quantized to tile coordinates.
/// Built once at level construction and never mutated afterwards; dynamic
/// solids are scanned live from the scene instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionField {
    cells: HashSet<(i32, i32)>,
}

impl CollisionField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, position: Vector2) {
        self.cells.insert(quantize(position));
    }

    /// Rasterizes the straight segment from `start` to `end` in tile-size
    /// steps, inclusive of both endpoints. Segments are axis-aligned in
    /// practice (level borders); a diagonal input still lands on the tiles
    /// its quantized steps touch.
    pub fn insert_segment(&mut self, start: Vector2, end: Vector2) {
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let steps = (dx.abs().max(dy.abs()) / TILE_SIZE).round() as i32;
        if steps <= 0 {
            self.insert(start);
            return;
        }
        let step_x = dx / steps as f32;
        let step_y = dy / steps as f32;
        for step in 0..=steps {
            self.insert(Vector2::new(
                start.x + step_x * step as f32,
                start.y + step_y * step as f32,
            ));
        }
    }

    pub fn from_cells(cells: impl IntoIterator<Item = Vector2>) -> Self {
        let mut field = Self::new();
        for cell in cells {
            field.insert(cell);
        }
        field
    }

    /// O(1) average membership test against the static wall set.
    pub fn is_blocked(&self, position: Vector2) -> bool {
        self.cells.contains(&quantize(position))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

fn quantize(position: Vector2) -> (i32, i32) {
    (position.x.round() as i32, position.y.round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::math::grid_cells;

    #[test]
    fn horizontal_segment_covers_every_tile_inclusive() {
        let mut field = CollisionField::new();
        field.insert_segment(Vector2::new(0.0, 32.0), Vector2::new(64.0, 32.0));

        for tile in 0..=4 {
            assert!(field.is_blocked(Vector2::new(grid_cells(tile), 32.0)));
        }
        assert_eq!(field.len(), 5);
        assert!(!field.is_blocked(Vector2::new(80.0, 32.0)));
    }

    #[test]
    fn vertical_segment_covers_every_tile_inclusive() {
        let mut field = CollisionField::new();
        field.insert_segment(Vector2::new(-16.0, 16.0), Vector2::new(-16.0, 144.0));

        assert_eq!(field.len(), 9);
        assert!(field.is_blocked(Vector2::new(-16.0, 16.0)));
        assert!(field.is_blocked(Vector2::new(-16.0, 144.0)));
        assert!(!field.is_blocked(Vector2::new(-16.0, 160.0)));
    }

    #[test]
    fn degenerate_segment_marks_a_single_cell() {
        let mut field = CollisionField::new();
        field.insert_segment(Vector2::new(48.0, 48.0), Vector2::new(48.0, 48.0));
        assert_eq!(field.len(), 1);
        assert!(field.is_blocked(Vector2::new(48.0, 48.0)));
    }

    #[test]
    fn from_cells_blocks_exactly_the_listed_tiles() {
        let field = CollisionField::from_cells([
            Vector2::new(112.0, 80.0),
            Vector2::new(128.0, 80.0),
        ]);
        assert!(field.is_blocked(Vector2::new(112.0, 80.0)));
        assert!(field.is_blocked(Vector2::new(128.0, 80.0)));
        assert!(!field.is_blocked(Vector2::new(144.0, 80.0)));
    }

    #[test]
    fn empty_field_blocks_nothing() {
        let field = CollisionField::new();
        assert!(field.is_empty());
        assert!(!field.is_blocked(Vector2::ZERO));
    }
}
