//! Long-range joints past light intermediate bodies

use crate::assembly::{Assembly, BodyId, JointId, JointKind, StructuralJoint};
use crate::registry::{JointRecord, MultiJointRegistry};

use super::PassContext;

/// Ratio of the heavier to the lighter mass.
///
/// A zero mass on one side gives infinity; two zero masses count as equal.
pub fn mass_ratio(a: f32, b: f32) -> f32 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if lo <= 0.0 {
        if hi <= 0.0 { 1.0 } else { f32::INFINITY }
    } else {
        hi / lo
    }
}

/// Climb from the grandparent of `origin` while the masses along the way stay
/// lopsided, then tie `origin` to the last ancestor with a rigid body.
///
/// The new joint copies the drives and break thresholds of `local_joint` and
/// is recorded under every body it crosses. Returns `None` when no suitable
/// ancestor exists or the pair is already linked.
pub fn extend_to_ancestor(
    assembly: &mut Assembly,
    ctx: &PassContext<'_>,
    registry: &mut MultiJointRegistry,
    origin: BodyId,
    parent: BodyId,
    local_joint: &StructuralJoint,
) -> Option<JointId> {
    let threshold = ctx.settings.stiffening_extension_mass_ratio_threshold;
    let mass = |id: BodyId| assembly.body(id).map_or(0.0, |b| b.effective_mass());
    let backed = |id: BodyId| assembly.body(id).is_some_and(|b| b.has_rigid_body);

    let origin_mass = mass(origin);
    let parent_mass = mass(parent);

    let mut candidate = assembly.parent_of(parent)?;
    let mut crossed = vec![origin, parent];
    let mut pending = Vec::new();
    let mut target = None;

    if backed(candidate) {
        crossed.push(candidate);
        target = Some(candidate);
    } else {
        pending.push(candidate);
    }

    loop {
        let candidate_mass = mass(candidate);
        if mass_ratio(origin_mass, candidate_mass) <= threshold
            && mass_ratio(parent_mass, candidate_mass) <= threshold
        {
            break;
        }
        let Some(next) = assembly.parent_of(candidate) else {
            break;
        };
        if !ctx.is_adjustment_valid(next) {
            break;
        }

        candidate = next;
        if backed(candidate) {
            crossed.append(&mut pending);
            crossed.push(candidate);
            target = Some(candidate);
        } else {
            pending.push(candidate);
        }
    }

    let target = target?;
    if registry.check_linked(origin, target) {
        return None;
    }

    let connected_anchor = {
        let host = assembly.body(origin)?;
        let other = assembly.body(target)?;
        host.world_transform
            .inverse()
            .transform_point3(other.world_position())
    };

    let joint = StructuralJoint::builder(JointKind::LongRange, origin)
        .connected(target)
        .connected_anchor(connected_anchor)
        .linear_drive(local_joint.linear_drive)
        .angular_drive(local_joint.angular_drive)
        .break_force(local_joint.break_force)
        .break_torque(local_joint.break_torque)
        .locked()
        .build();
    let record = JointRecord::from(&joint);
    let id = assembly.add_joint(joint).ok()?;

    registry.try_set_linked(origin, target);
    for body in &crossed {
        registry.register(*body, record);
    }

    tracing::debug!(
        "Long-range joint {} -> {} across {} bodies",
        origin,
        target,
        crossed.len()
    );
    Some(id)
}
