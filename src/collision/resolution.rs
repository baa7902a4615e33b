use crate::math::vec2::Vec2;
use crate::objects::Entity;

const SEPARATION_ROUNDING: f64 = 1e-12;

/// Unit vector from `a` toward `b`. Coincident centers have no direction of their own,
/// so they are pushed apart along +y.
fn contact_normal(a: &Entity, b: &Entity) -> Vec2 {
    (b.position - a.position).try_normalize().unwrap_or(Vec2::UP)
}

/// Applies the elastic collision impulse between two touching discs.
///
/// The contact normal is scaled to the contact distance `ra + rb` rather than the current
/// separation, so the impulse is well defined right at first contact. The coefficient of
/// restitution is the mean of both elasticities. A static entity takes part with its
/// fixed mass and zero velocity, and is never modified.
pub fn resolve(a: &mut Entity, b: &mut Entity) {
    if a.is_static && b.is_static {
        return;
    }

    let delta_x = contact_normal(a, b) * (a.radius + b.radius);
    // Static velocity is stored as zero already; a static side always counts as at rest.
    let velocity_a = if a.is_static { Vec2::ZERO } else { a.velocity };
    let velocity_b = if b.is_static { Vec2::ZERO } else { b.velocity };
    let delta_v = velocity_a - velocity_b;
    let e = 0.5 * (a.elasticity + b.elasticity);

    let j = e * 2.0 * delta_v.dot(delta_x) / ((a.mass + b.mass) * delta_x.magnitude_squared());

    if !a.is_static {
        a.velocity -= delta_x * (j * b.mass);
    }
    if !b.is_static {
        b.velocity += delta_x * (j * a.mass);
    }
}

/// Pushes two overlapping discs apart along the line between their centers until they
/// are exactly `min_distance` apart at the edges.
///
/// Movable entities share the correction equally; if only one can move it takes all of
/// it. Returns whether any position changed.
pub fn separate(a: &mut Entity, b: &mut Entity, min_distance: f64) -> bool {
    if a.is_static && b.is_static {
        return false;
    }

    let target = a.radius + b.radius + min_distance;
    let distance_squared = a.position.distance_squared(b.position);
    // Rounding can leave a just-separated pair a hair short of the target.
    if distance_squared >= target * target * (1.0 - SEPARATION_ROUNDING) {
        return false;
    }

    let normal = contact_normal(a, b);
    let correction = target - distance_squared.sqrt();

    if a.is_static {
        b.position += normal * correction;
    } else if b.is_static {
        a.position -= normal * correction;
    } else {
        let half = normal * (0.5 * correction);
        a.position -= half;
        b.position += half;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{EntityOptions, STATIC_ENTITY_MASS};
    const EPSILON: f64 = 1e-9;

    fn disc(x: f64, y: f64, vx: f64, vy: f64) -> Entity {
        Entity::from_options(
            &EntityOptions::new()
                .position(Vec2::new(x, y))
                .velocity(Vec2::new(vx, vy))
                .elasticity(1.0),
        )
        .unwrap()
    }

    fn wall(x: f64, y: f64) -> Entity {
        Entity::from_options(
            &EntityOptions::new()
                .position(Vec2::new(x, y))
                .is_static(true)
                .elasticity(1.0),
        )
        .unwrap()
    }

    #[test]
    fn test_head_on_equal_masses_swap_velocities() {
        let mut a = disc(0.0, 0.0, 5.0, 0.0);
        let mut b = disc(2.0, 0.0, -5.0, 0.0);
        resolve(&mut a, &mut b);
        assert!((a.velocity.x - -5.0).abs() < EPSILON);
        assert!((b.velocity.x - 5.0).abs() < EPSILON);
        assert!(a.velocity.y.abs() < EPSILON);
        assert!(b.velocity.y.abs() < EPSILON);
    }

    #[test]
    fn test_elastic_conserves_energy() {
        let mut a = disc(0.0, 0.0, 3.0, 1.0);
        let mut b = disc(1.2, 1.6, -2.0, -0.5);
        let before = a.kinetic_energy() + b.kinetic_energy();
        resolve(&mut a, &mut b);
        let after = a.kinetic_energy() + b.kinetic_energy();
        assert!(((after - before) / before).abs() < EPSILON);
    }

    #[test]
    fn test_momentum_conserved_for_any_elasticity() {
        for elasticity in [0.0, 0.3, 1.0] {
            let mut a = Entity::from_options(
                &EntityOptions::new()
                    .mass(2.0)
                    .velocity(Vec2::new(4.0, -1.0))
                    .elasticity(elasticity),
            )
            .unwrap();
            let mut b = Entity::from_options(
                &EntityOptions::new()
                    .mass(5.0)
                    .radius(2.0)
                    .position(Vec2::new(2.5, 1.0))
                    .velocity(Vec2::new(-1.0, 0.5))
                    .elasticity(0.6),
            )
            .unwrap();
            let before = a.momentum() + b.momentum();
            resolve(&mut a, &mut b);
            let after = a.momentum() + b.momentum();
            assert!((after - before).magnitude() < EPSILON);
        }
    }

    #[test]
    fn test_static_is_fixed_reference_in_either_order() {
        let mut ball = disc(0.0, 0.0, 5.0, 0.0);
        let mut fixed = wall(2.0, 0.0);
        resolve(&mut ball, &mut fixed);
        assert!((ball.velocity.x - -5.0).abs() < 1e-6);
        assert_eq!(fixed.velocity, Vec2::ZERO);
        assert_eq!(fixed.mass, STATIC_ENTITY_MASS);

        let mut ball = disc(0.0, 0.0, 5.0, 0.0);
        let mut fixed = wall(2.0, 0.0);
        resolve(&mut fixed, &mut ball);
        assert!((ball.velocity.x - -5.0).abs() < 1e-6);
        assert_eq!(fixed.velocity, Vec2::ZERO);
        assert_eq!(fixed.position, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_zero_elasticity_applies_no_impulse() {
        let mut a = disc(0.0, 0.0, 1.0, 0.0);
        let mut b = disc(2.0, 0.0, -1.0, 0.0);
        a.elasticity = 0.0;
        b.elasticity = 0.0;
        resolve(&mut a, &mut b);
        assert_eq!(a.velocity, Vec2::new(1.0, 0.0));
        assert_eq!(b.velocity, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_coincident_centers_stay_finite() {
        let mut a = disc(1.0, 1.0, 1.0, 0.0);
        let mut b = disc(1.0, 1.0, 0.0, 1.0);
        resolve(&mut a, &mut b);
        assert!(a.velocity.is_finite() && b.velocity.is_finite());

        assert!(separate(&mut a, &mut b, 0.0));
        assert!((a.position.distance(b.position) - 2.0).abs() < EPSILON);
        assert_eq!(a.position.x, b.position.x);
        assert!(b.position.y > a.position.y);
    }

    #[test]
    fn test_separate_splits_correction() {
        let mut a = disc(0.0, 0.0, 0.0, 0.0);
        let mut b = disc(1.0, 0.0, 0.0, 0.0);
        assert!(separate(&mut a, &mut b, 0.5));
        assert!((a.position.x - -0.75).abs() < EPSILON);
        assert!((b.position.x - 1.75).abs() < EPSILON);
        assert!((a.position.distance(b.position) - 2.5).abs() < EPSILON);
    }

    #[test]
    fn test_separate_moves_only_the_movable_side() {
        let mut fixed = wall(0.0, 0.0);
        let mut ball = disc(0.0, 1.0, 0.0, 0.0);
        assert!(separate(&mut fixed, &mut ball, 0.001));
        assert_eq!(fixed.position, Vec2::ZERO);
        assert!((ball.position.y - 2.001).abs() < EPSILON);

        let mut fixed_a = wall(0.0, 0.0);
        let mut fixed_b = wall(0.5, 0.0);
        assert!(!separate(&mut fixed_a, &mut fixed_b, 0.001));
        assert_eq!(fixed_b.position, Vec2::new(0.5, 0.0));
    }

    #[test]
    fn test_separate_is_idempotent() {
        let mut a = disc(0.0, 0.0, 0.0, 0.0);
        let mut b = disc(0.3, 1.1, 0.0, 0.0);
        separate(&mut a, &mut b, 0.001);
        let (after_a, after_b) = (a.clone(), b.clone());

        assert!(!separate(&mut a, &mut b, 0.001));
        assert_eq!(a, after_a);
        assert_eq!(b, after_b);
    }
}
