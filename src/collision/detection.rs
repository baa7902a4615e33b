use crate::math::vec2::Vec2;
use crate::objects::{Entities, EntityId};

/// Tests whether two discs overlap. Discs that just touch count as overlapping.
pub fn intersects(c1: Vec2, r1: f64, c2: Vec2, r2: f64) -> bool {
    let radii = r1 + r2;
    c1.distance_squared(c2) <= radii * radii
}

/// Real roots of a quadratic, smallest first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuadraticRoots {
    None,
    One(f64),
    Two(f64, f64),
}

/// Solves `a*x² + b*x + c = 0`. Falls back to the linear solution when `a` is zero.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> QuadraticRoots {
    if a == 0.0 {
        return if b == 0.0 {
            QuadraticRoots::None
        } else {
            QuadraticRoots::One(-c / b)
        };
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        QuadraticRoots::None
    } else if discriminant == 0.0 {
        QuadraticRoots::One(-b / (2.0 * a))
    } else {
        let sqrt_discriminant = discriminant.sqrt();
        let x1 = (-b - sqrt_discriminant) / (2.0 * a);
        let x2 = (-b + sqrt_discriminant) / (2.0 * a);
        QuadraticRoots::Two(x1.min(x2), x1.max(x2))
    }
}

/// Computes when two discs moving at constant velocity first touch, within `[0, dt]`.
///
/// The squared distance between the centers at time `t` is
///
/// ```text
/// D(t) = |(c1 - c2) + (v1 - v2) * t|²
/// ```
///
/// and the discs touch when `D(t) = (r1 + r2)²`, i.e. when
/// `a*t² + b*t + c = 0` with `a = |Δv|²`, `b = 2 * (Δc · Δv)` and `c = |Δc|² - (r1 + r2)²`.
///
/// The entry root is reported; discs already overlapping at `t = 0` report 0. With no
/// relative motion (`a = 0`) there is no future contact to find and `None` is returned,
/// even for overlapping discs: use [`intersects`] for those.
pub fn time_of_collision(
    c1: Vec2,
    v1: Vec2,
    r1: f64,
    c2: Vec2,
    v2: Vec2,
    r2: f64,
    dt: f64,
) -> Option<f64> {
    let dc = c1 - c2;
    let dv = v1 - v2;
    let radii = r1 + r2;

    let a = dv.magnitude_squared();
    if a == 0.0 {
        return None;
    }
    let b = 2.0 * dc.dot(dv);
    let c = dc.magnitude_squared() - radii * radii;

    let t = match solve_quadratic(a, b, c) {
        QuadraticRoots::None => return None,
        QuadraticRoots::One(t) => t,
        // Entry before now and exit after now: they already overlap.
        QuadraticRoots::Two(t1, t2) if t1 < 0.0 && t2 >= 0.0 => 0.0,
        QuadraticRoots::Two(t1, _) => t1,
    };

    if (0.0..=dt).contains(&t) {
        Some(t)
    } else {
        None
    }
}

/// A predicted contact between two entities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    pub a: EntityId,
    pub b: EntityId,
    /// Time from now until the discs touch.
    pub time: f64,
}

/// Appends every pair in `group` that comes into contact within `horizon` to `out`.
/// Pairs of two static entities are skipped.
pub fn find_colliding_pairs(
    entities: &Entities,
    group: &[EntityId],
    horizon: f64,
    out: &mut Vec<Collision>,
) {
    for (j, &id_a) in group.iter().enumerate() {
        let Some(a) = entities.get(id_a) else { continue };
        for &id_b in &group[j + 1..] {
            let Some(b) = entities.get(id_b) else { continue };
            if a.is_static && b.is_static {
                continue;
            }
            let t = time_of_collision(
                a.position, a.velocity, a.radius, b.position, b.velocity, b.radius, horizon,
            );
            if let Some(time) = t {
                out.push(Collision { a: id_a, b: id_b, time });
            }
        }
    }
}

/// The earliest contact within `horizon` among the pairs of `group`.
/// Ties go to the pair found first.
pub fn earliest_collision(entities: &Entities, group: &[EntityId], horizon: f64) -> Option<Collision> {
    let mut earliest: Option<Collision> = None;
    for (j, &id_a) in group.iter().enumerate() {
        let Some(a) = entities.get(id_a) else { continue };
        for &id_b in &group[j + 1..] {
            let Some(b) = entities.get(id_b) else { continue };
            if a.is_static && b.is_static {
                continue;
            }
            let t = time_of_collision(
                a.position, a.velocity, a.radius, b.position, b.velocity, b.radius, horizon,
            );
            if let Some(time) = t {
                if earliest.is_none_or(|e| time < e.time) {
                    earliest = Some(Collision { a: id_a, b: id_b, time });
                }
            }
        }
    }
    earliest
}

/// Appends overlapping pairs in `group` to `out`.
///
/// Each entity is paired with at most the first partner found after it, and an entity
/// already picked as someone's partner doesn't look for one of its own. This answers
/// "is anything still overlapping" cheaply; it isn't an exhaustive pair list.
/// `paired` is scratch space and is resized to the group length.
pub fn find_intersecting_pairs(
    entities: &Entities,
    group: &[EntityId],
    paired: &mut Vec<bool>,
    out: &mut Vec<(EntityId, EntityId)>,
) {
    paired.clear();
    paired.resize(group.len(), false);

    for j in 0..group.len() {
        if paired[j] {
            continue;
        }
        let Some(a) = entities.get(group[j]) else { continue };
        for k in (j + 1)..group.len() {
            let Some(b) = entities.get(group[k]) else { continue };
            if a.is_static && b.is_static {
                continue;
            }
            if intersects(a.position, a.radius, b.position, b.radius) {
                paired[j] = true;
                paired[k] = true;
                out.push((group[j], group[k]));
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Entity, EntityOptions};
    const EPSILON: f64 = 1e-9;

    fn entity(x: f64, y: f64, vx: f64, vy: f64, radius: f64) -> Entity {
        Entity::from_options(
            &EntityOptions::new()
                .position(Vec2::new(x, y))
                .velocity(Vec2::new(vx, vy))
                .radius(radius),
        )
        .unwrap()
    }

    #[test]
    fn test_intersects() {
        let origin = Vec2::ZERO;
        assert!(intersects(origin, 1.0, Vec2::new(1.5, 0.0), 1.0));
        assert!(intersects(origin, 1.0, Vec2::new(2.0, 0.0), 1.0));
        assert!(!intersects(origin, 1.0, Vec2::new(2.0001, 0.0), 1.0));
        assert!(intersects(origin, 1.0, origin, 1.0));
    }

    #[test]
    fn test_solve_quadratic() {
        assert_eq!(solve_quadratic(1.0, 0.0, 1.0), QuadraticRoots::None);
        assert_eq!(solve_quadratic(1.0, -2.0, 1.0), QuadraticRoots::One(1.0));
        match solve_quadratic(1.0, -3.0, 2.0) {
            QuadraticRoots::Two(x1, x2) => {
                assert!((x1 - 1.0).abs() < EPSILON);
                assert!((x2 - 2.0).abs() < EPSILON);
            }
            other => panic!("expected two roots, got {:?}", other),
        }
        // Negative leading coefficient still orders the roots.
        match solve_quadratic(-1.0, 3.0, -2.0) {
            QuadraticRoots::Two(x1, x2) => assert!(x1 < x2),
            other => panic!("expected two roots, got {:?}", other),
        }
        assert_eq!(solve_quadratic(0.0, 2.0, -4.0), QuadraticRoots::One(2.0));
        assert_eq!(solve_quadratic(0.0, 0.0, 1.0), QuadraticRoots::None);
    }

    #[test]
    fn test_time_of_collision_head_on() {
        let t = time_of_collision(
            Vec2::new(0.0, 0.0),
            Vec2::new(5.0, 0.0),
            1.0,
            Vec2::new(10.0, 0.0),
            Vec2::new(-5.0, 0.0),
            1.0,
            3.0,
        )
        .unwrap();
        assert!((t - 0.8).abs() < EPSILON);
    }

    #[test]
    fn test_time_of_collision_outside_horizon() {
        let t = time_of_collision(
            Vec2::new(0.0, 0.0),
            Vec2::new(5.0, 0.0),
            1.0,
            Vec2::new(10.0, 0.0),
            Vec2::new(-5.0, 0.0),
            1.0,
            0.5,
        );
        assert_eq!(t, None);
    }

    #[test]
    fn test_time_of_collision_moving_apart() {
        let t = time_of_collision(
            Vec2::new(0.0, 0.0),
            Vec2::new(-5.0, 0.0),
            1.0,
            Vec2::new(3.0, 0.0),
            Vec2::new(5.0, 0.0),
            1.0,
            10.0,
        );
        assert_eq!(t, None);
    }

    #[test]
    fn test_time_of_collision_already_overlapping() {
        let t = time_of_collision(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            1.0,
            Vec2::new(1.0, 0.0),
            Vec2::new(-1.0, 0.0),
            1.0,
            1.0,
        );
        assert_eq!(t, Some(0.0));
    }

    #[test]
    fn test_time_of_collision_grazing() {
        // Passes the other disc at exactly the contact distance.
        let t = time_of_collision(
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            1.0,
            Vec2::new(5.0, 2.0),
            Vec2::ZERO,
            1.0,
            10.0,
        )
        .unwrap();
        assert!((t - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_time_of_collision_without_relative_motion() {
        let v = Vec2::new(3.0, -1.0);
        // Apart and moving together: never meet.
        assert_eq!(
            time_of_collision(Vec2::ZERO, v, 1.0, Vec2::new(5.0, 0.0), v, 1.0, 10.0),
            None
        );
        // Overlapping and moving together: left to the discrete test.
        assert_eq!(
            time_of_collision(Vec2::ZERO, v, 1.0, Vec2::new(1.0, 0.0), v, 1.0, 10.0),
            None
        );
        assert!(intersects(Vec2::ZERO, 1.0, Vec2::new(1.0, 0.0), 1.0));
        // Both at rest.
        assert_eq!(
            time_of_collision(Vec2::ZERO, Vec2::ZERO, 1.0, Vec2::new(1.0, 0.0), Vec2::ZERO, 1.0, 1.0),
            None
        );
    }

    #[test]
    fn test_find_colliding_pairs_and_earliest() {
        let mut entities = Entities::new();
        let a = entities.insert(entity(0.0, 0.0, 5.0, 0.0, 1.0));
        let b = entities.insert(entity(10.0, 0.0, -5.0, 0.0, 1.0));
        let c = entities.insert(entity(2.0, 6.0, 0.0, -10.0, 1.0));
        let far = entities.insert(entity(100.0, 100.0, 0.0, 0.0, 1.0));
        let group = [a, b, c, far];

        let mut out = Vec::new();
        find_colliding_pairs(&entities, &group, 3.0, &mut out);
        let pairs: Vec<(EntityId, EntityId)> = out.iter().map(|c| (c.a, c.b)).collect();
        assert_eq!(pairs, vec![(a, b), (a, c)]);
        assert!((out[0].time - 0.8).abs() < EPSILON);
        assert!((out[1].time - 0.4).abs() < EPSILON);

        let earliest = earliest_collision(&entities, &group, 3.0).unwrap();
        assert_eq!((earliest.a, earliest.b), (a, c));
        assert!((earliest.time - 0.4).abs() < EPSILON);

        assert!(earliest_collision(&entities, &[a, far], 3.0).is_none());
    }

    #[test]
    fn test_static_pairs_skipped() {
        let mut entities = Entities::new();
        let wall = EntityOptions::new().is_static(true);
        let a = entities.insert(Entity::from_options(&wall.position(Vec2::new(0.0, 0.0))).unwrap());
        let b = entities.insert(Entity::from_options(&wall.position(Vec2::new(1.0, 0.0))).unwrap());

        let mut collisions = Vec::new();
        find_colliding_pairs(&entities, &[a, b], 1.0, &mut collisions);
        assert!(collisions.is_empty());

        let mut paired = Vec::new();
        let mut overlapping = Vec::new();
        find_intersecting_pairs(&entities, &[a, b], &mut paired, &mut overlapping);
        assert!(overlapping.is_empty());
    }

    #[test]
    fn test_find_intersecting_pairs() {
        let mut entities = Entities::new();
        let a = entities.insert(entity(0.0, 0.0, 0.0, 0.0, 1.0));
        let b = entities.insert(entity(1.0, 0.0, 0.0, 0.0, 1.0));
        let c = entities.insert(entity(2.0, 0.0, 0.0, 0.0, 1.0));
        let d = entities.insert(entity(50.0, 0.0, 0.0, 0.0, 1.0));
        let e = entities.insert(entity(51.0, 0.0, 0.0, 0.0, 1.0));

        let mut paired = Vec::new();
        let mut out = Vec::new();
        find_intersecting_pairs(&entities, &[a, b, c, d, e], &mut paired, &mut out);
        // a stops at b; b is already taken so it doesn't look for c.
        assert_eq!(out, vec![(a, b), (d, e)]);

        out.clear();
        find_intersecting_pairs(&entities, &[c, d], &mut paired, &mut out);
        assert!(out.is_empty());
    }
}
