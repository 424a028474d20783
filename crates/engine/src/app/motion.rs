use super::math::Vector2;

/// Advances `position` toward `destination` by at most `speed` pixels and
/// returns the remaining distance. Within `speed` of the goal the position
/// snaps exactly onto it (no floating residue) and 0 is returned; callers
/// treat a return <= 0 as "arrived" and may then issue a new destination.
/// Deliberately side-effecting; call at most once per tick per mover so the
/// per-tick displacement stays bounded by `speed`.
pub fn move_towards(position: &mut Vector2, destination: Vector2, speed: f32) -> f32 {
    let mut travel_x = destination.x - position.x;
    let mut travel_y = destination.y - position.y;
    let mut distance = (travel_x * travel_x + travel_y * travel_y).sqrt();

    if distance <= speed {
        position.x = destination.x;
        position.y = destination.y;
        return 0.0;
    }

    let normalized_x = travel_x / distance;
    let normalized_y = travel_y / distance;
    position.x += normalized_x * speed;
    position.y += normalized_y * speed;

    travel_x = destination.x - position.x;
    travel_y = destination.y - position.y;
    distance = (travel_x * travel_x + travel_y * travel_y).sqrt();
    distance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrival_snaps_exactly_with_no_residue() {
        let mut position = Vector2::new(15.2, 0.0);
        let destination = Vector2::new(16.0, 0.0);

        let remaining = move_towards(&mut position, destination, 1.0);
        assert_eq!(remaining, 0.0);
        assert!(position.matches(destination));
    }

    #[test]
    fn zero_distance_returns_zero_without_moving() {
        let mut position = Vector2::new(0.0, 0.0);
        let remaining = move_towards(&mut position, Vector2::new(0.0, 0.0), 5.0);
        assert_eq!(remaining, 0.0);
        assert!(position.matches(Vector2::ZERO));
    }

    #[test]
    fn displacement_per_call_is_bounded_by_speed() {
        let mut position = Vector2::new(0.0, 0.0);
        let destination = Vector2::new(16.0, 0.0);

        let remaining = move_towards(&mut position, destination, 1.0);
        assert!((position.x - 1.0).abs() < 1e-6);
        assert_eq!(position.y, 0.0);
        assert!((remaining - 15.0).abs() < 1e-4);
    }

    #[test]
    fn remaining_distance_is_recomputed_after_the_advance() {
        let mut position = Vector2::new(0.0, 0.0);
        let destination = Vector2::new(3.0, 4.0);

        let remaining = move_towards(&mut position, destination, 1.0);
        assert!((remaining - 4.0).abs() < 1e-5);
    }

    #[test]
    fn repeated_calls_converge_onto_the_destination() {
        let mut position = Vector2::new(0.0, 0.0);
        let destination = Vector2::new(16.0, 0.0);

        let mut guard = 0;
        loop {
            let remaining = move_towards(&mut position, destination, 1.0);
            guard += 1;
            assert!(guard < 32, "mover failed to arrive");
            if remaining <= 0.0 {
                break;
            }
        }
        assert!(position.matches(destination));
    }
}
