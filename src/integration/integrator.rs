use crate::objects::Entity;

/// Advances an entity's state by `dt` under its applied force and torque.
///
/// Position takes the half-step acceleration term, so a constant force gives the exact
/// constant-acceleration trajectory:
///
/// ```text
/// x += dt * (v + 0.5 * dt * F / m)
/// v += dt * F / m
/// ```
///
/// Rotation follows the same scheme with torque and moment of inertia. Static entities
/// are left untouched, and the applied loads are not cleared.
pub fn integrate(entity: &mut Entity, dt: f64) {
    if entity.is_static {
        return;
    }

    // --- Linear Motion --- //
    let linear_acceleration = entity.applied_force * entity.inverse_mass();
    entity.position += (entity.velocity + linear_acceleration * (0.5 * dt)) * dt;
    entity.velocity += linear_acceleration * dt;

    // --- Angular Motion --- //
    let angular_acceleration = entity.applied_torque * entity.inverse_inertia();
    entity.rotation += dt * entity.angular_velocity + 0.5 * dt * dt * angular_acceleration;
    entity.angular_velocity += dt * angular_acceleration;
}
