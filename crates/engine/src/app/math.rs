/// World-space tile edge length in pixels. Every position that participates
/// in collision or pickup checks is quantized to multiples of this.
pub const TILE_SIZE: f32 = 16.0;

/// Converts a tile count to world pixels.
pub fn grid_cells(n: i32) -> f32 {
    n as f32 * TILE_SIZE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Exact equality. Positions on the tile grid are exact f32 values, and
    /// `move_towards` snaps on arrival, so no epsilon is involved.
    pub fn matches(self, other: Vector2) -> bool {
        self.x == other.x && self.y == other.y
    }

    /// The adjacent tile position one step in `direction`.
    pub fn to_neighbor(self, direction: Direction) -> Vector2 {
        let mut x = self.x;
        let mut y = self.y;
        match direction {
            Direction::Left => x -= TILE_SIZE,
            Direction::Right => x += TILE_SIZE,
            Direction::Up => y -= TILE_SIZE,
            Direction::Down => y += TILE_SIZE,
        }
        Vector2 { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Vector2 {
        Vector2 {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}
