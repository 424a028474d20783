use super::math::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Interact,
    Attack,
    CycleEquipment,
    Quit,
}

const ACTION_COUNT: usize = 4;

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::Interact => 0,
            InputAction::Attack => 1,
            InputAction::CycleEquipment => 2,
            InputAction::Quit => 3,
        }
    }
}

/// Edge-triggered "pressed this tick" flags, one per action. Edges are armed
/// on a press while the key is up and cleared when a snapshot is taken.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionEdges {
    down: [bool; ACTION_COUNT],
    pressed: [bool; ACTION_COUNT],
}

impl ActionEdges {
    pub(crate) fn handle_key(&mut self, action: InputAction, is_down: bool) {
        let index = action.index();
        if is_down {
            if !self.down[index] {
                self.pressed[index] = true;
            }
            self.down[index] = true;
        } else {
            self.down[index] = false;
        }
    }

    pub(crate) fn take_pressed(&mut self) -> [bool; ACTION_COUNT] {
        let pressed = self.pressed;
        self.pressed = [false; ACTION_COUNT];
        pressed
    }
}

/// Most-recently-pressed-wins stack of held cardinal directions; the front
/// entry is the mover's primary direction.
#[derive(Debug, Clone, Default)]
pub(crate) struct DirectionStack {
    held: Vec<Direction>,
}

impl DirectionStack {
    pub(crate) fn press(&mut self, direction: Direction) {
        if !self.held.contains(&direction) {
            self.held.insert(0, direction);
        }
    }

    pub(crate) fn release(&mut self, direction: Direction) {
        self.held.retain(|held| *held != direction);
    }

    pub(crate) fn primary(&self) -> Option<Direction> {
        self.held.first().copied()
    }
}

/// Immutable view of one tick's input. Entities only ever read this; the
/// loop's collector is the sole writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    primary_direction: Option<Direction>,
    pressed: [bool; ACTION_COUNT],
    quit_requested: bool,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        primary_direction: Option<Direction>,
        pressed: [bool; ACTION_COUNT],
        quit_requested: bool,
    ) -> Self {
        Self {
            primary_direction,
            pressed,
            quit_requested,
        }
    }

    /// The current primary cardinal direction, or `None` when no direction
    /// key is held.
    pub fn primary_direction(&self) -> Option<Direction> {
        self.primary_direction
    }

    /// Whether `action` was newly pressed this tick.
    pub fn just_pressed(&self, action: InputAction) -> bool {
        self.pressed[action.index()]
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn with_primary_direction(mut self, direction: Option<Direction>) -> Self {
        self.primary_direction = direction;
        self
    }

    pub fn with_pressed(mut self, action: InputAction) -> Self {
        self.pressed[action.index()] = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_edge_fires_once_per_press() {
        let mut edges = ActionEdges::default();

        edges.handle_key(InputAction::Interact, true);
        assert!(edges.take_pressed()[InputAction::Interact.index()]);

        // Held key does not re-arm the edge.
        edges.handle_key(InputAction::Interact, true);
        assert!(!edges.take_pressed()[InputAction::Interact.index()]);

        edges.handle_key(InputAction::Interact, false);
        edges.handle_key(InputAction::Interact, true);
        assert!(edges.take_pressed()[InputAction::Interact.index()]);
    }

    #[test]
    fn newest_held_direction_wins() {
        let mut stack = DirectionStack::default();
        assert_eq!(stack.primary(), None);

        stack.press(Direction::Up);
        stack.press(Direction::Left);
        assert_eq!(stack.primary(), Some(Direction::Left));

        stack.release(Direction::Left);
        assert_eq!(stack.primary(), Some(Direction::Up));

        stack.release(Direction::Up);
        assert_eq!(stack.primary(), None);
    }

    #[test]
    fn repeated_press_does_not_duplicate_a_direction() {
        let mut stack = DirectionStack::default();
        stack.press(Direction::Down);
        stack.press(Direction::Down);
        stack.release(Direction::Down);
        assert_eq!(stack.primary(), None);
    }

    #[test]
    fn snapshot_builders_cover_direction_and_presses() {
        let snapshot = InputSnapshot::empty()
            .with_primary_direction(Some(Direction::Right))
            .with_pressed(InputAction::Attack);

        assert_eq!(snapshot.primary_direction(), Some(Direction::Right));
        assert!(snapshot.just_pressed(InputAction::Attack));
        assert!(!snapshot.just_pressed(InputAction::Interact));
        assert!(!snapshot.quit_requested());
    }
}
