//! Joint strength calculator for primary joints

use glam::Vec3;

use crate::assembly::{
    AttachMethod, AttachMode, AttachNode, Assembly, BodyId, JointDrive, NodeKind,
};
use crate::constants::{
    ALIGNMENT_COSINE, ANGULAR_DAMPER_SCALE, DEFAULT_NODE_SIZE, MIN_SECTION_RADIUS,
    NODE_SIZE_RADIUS_FACTOR,
};
use crate::geometry::{extents_along, extents_oriented, guess_up_vector, radius_along, CrossSection};
use crate::registry::MultiJointRegistry;

use super::propagation::extend_to_ancestor;
use super::{PassContext, ReinforceOutcome, SkipReason};

/// Thresholds and drive values written into a reinforced joint
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointStrength {
    pub break_force: f32,
    pub break_torque: f32,
    pub angular_drive: JointDrive,
    pub section: CrossSection,
}

/// How a body meets its parent
#[derive(Debug, Clone, PartialEq)]
pub enum Connection {
    /// Through an attach node owned by `owner`
    Node { node: AttachNode, owner: BodyId },
    /// Axial connection without a node
    Stack,
    /// Side-by-side connection without a node
    Surface,
}

/// Work out the connection between `body` and `parent`.
///
/// Prefers an attach node pair, then a docked port pair, then the body's
/// surface node, and finally falls back to the attach mode.
pub fn resolve_connection(assembly: &Assembly, body_id: BodyId, parent_id: BodyId) -> Connection {
    let (Some(body), Some(parent)) = (assembly.body(body_id), assembly.body(parent_id)) else {
        return Connection::Stack;
    };

    let mut attach = body.find_attach_node_by_body(parent_id);
    let mut parent_attach = parent.find_attach_node_by_body(body_id);

    if attach.is_none()
        && parent_attach.is_none()
        && let (Some((docked_a, reference_a)), Some((docked_b, reference_b))) =
            (body.docking_port(), parent.docking_port())
        && (docked_a == Some(parent_id) || docked_b == Some(body_id))
    {
        attach = reference_a.and_then(|id| body.find_attach_node(id));
        parent_attach = reference_b.and_then(|id| parent.find_attach_node(id));
    }

    if let Some(node) = attach {
        return Connection::Node {
            node: node.clone(),
            owner: body_id,
        };
    }
    if let Some(node) = parent_attach {
        return Connection::Node {
            node: node.clone(),
            owner: parent_id,
        };
    }

    match body.attach_mode {
        AttachMode::SurfaceAttach => match &body.surface_node {
            Some(node) => Connection::Node {
                node: node.clone(),
                owner: body_id,
            },
            None => Connection::Surface,
        },
        AttachMode::Stack => Connection::Stack,
    }
}

fn circular_or_nominal(radius: f32, nominal_size: f32) -> CrossSection {
    if radius <= MIN_SECTION_RADIUS {
        CrossSection::circular(nominal_size * NODE_SIZE_RADIUS_FACTOR)
    } else {
        CrossSection::circular(radius)
    }
}

/// Cross-section governing the joint between `body_id` and `connected_id`
fn connection_section(
    assembly: &Assembly,
    body_id: BodyId,
    connected_id: BodyId,
    connection: &Connection,
) -> CrossSection {
    let (Some(body), Some(connected)) = (assembly.body(body_id), assembly.body(connected_id)) else {
        return CrossSection::ZERO;
    };

    match connection {
        Connection::Node { node, owner } => {
            let Some(main) = assembly.body(*owner) else {
                return CrossSection::ZERO;
            };
            let ndir = node.orientation.normalize_or_zero();

            if node.kind == NodeKind::Surface {
                let up = guess_up_vector(main).normalize_or_zero();
                if up.dot(ndir).abs() > ALIGNMENT_COSINE {
                    // Node along the main axis: effectively a stack connection
                    let radius = radius_along(main, ndir).min(radius_along(connected, ndir));
                    circular_or_nominal(radius, node.size)
                } else {
                    let main_size = extents_oriented(main, ndir, up);
                    let connected_size = extents_oriented(connected, ndir, up);
                    CrossSection::from_side_extents(main_size, connected_size)
                }
            } else {
                // Node direction in the body's own frame
                let dir = body.world_rotation().inverse() * (main.world_rotation() * ndir);
                let radius = radius_along(body, dir).min(radius_along(connected, dir));
                circular_or_nominal(radius, node.size)
            }
        }
        Connection::Stack => {
            let radius = radius_along(body, Vec3::Y).min(radius_along(connected, Vec3::Y));
            circular_or_nominal(radius, DEFAULT_NODE_SIZE)
        }
        Connection::Surface => {
            let size = extents_along(body, guess_up_vector(body));
            let connected_size = extents_along(connected, guess_up_vector(connected));
            CrossSection::from_side_extents(size, connected_size)
        }
    }
}

/// Lock a strut's own joint at auxiliary strength
fn reinforce_strut(assembly: &mut Assembly, ctx: &PassContext<'_>, body_id: BodyId) -> bool {
    let Some((Some(_), Some(_), Some(joint_id))) = assembly.body(body_id).and_then(|b| b.strut()) else {
        return false;
    };
    let strength = ctx.settings.auxiliary_strength();
    let Some(joint) = assembly.joint_mut(joint_id) else {
        return false;
    };

    let drive = JointDrive {
        position_spring: strength,
        position_damper: joint.angular_drive.position_damper,
        maximum_force: strength,
    };
    joint.linear_drive = drive;
    joint.angular_drive = drive;
    joint.break_force = strength;
    joint.break_torque = strength;
    joint.lock_all();

    if let Some(body) = assembly.body_mut(body_id) {
        body.attach_method = AttachMethod::LockedJoint;
    }
    tracing::debug!("Strut joint of body {} locked", body_id);
    true
}

/// Strengthen the primary joint of `body_id` and, when allowed, propagate a
/// long-range joint towards a heavier ancestor.
///
/// A body that is already locked, lacks a rigid body or a primary joint, or
/// is not adjustable is left untouched.
pub fn reinforce(
    assembly: &mut Assembly,
    ctx: &mut PassContext<'_>,
    registry: &mut MultiJointRegistry,
    body_id: BodyId,
) -> ReinforceOutcome {
    let Some(body) = assembly.body(body_id) else {
        return ReinforceOutcome::Skipped(SkipReason::UnknownBody);
    };
    if !ctx.is_adjustment_valid(body_id) {
        return ReinforceOutcome::Skipped(SkipReason::NotAdjustable);
    }
    if !body.has_rigid_body {
        return ReinforceOutcome::Skipped(SkipReason::NoRigidBody);
    }
    let Some(joint_id) = body.attach_joint else {
        return ReinforceOutcome::Skipped(SkipReason::NoAttachJoint);
    };
    if body.is_locked() {
        tracing::debug!("Body {} already processed", body_id);
        return ReinforceOutcome::Skipped(SkipReason::AlreadyLocked);
    }

    let is_strut = ctx.class(body_id).strut;
    if is_strut {
        reinforce_strut(assembly, ctx, body_id);
    }

    let Some(parent_id) = assembly.parent_of(body_id) else {
        return ReinforceOutcome::Skipped(SkipReason::NoAttachJoint);
    };
    let Some(connected_id) = assembly
        .joint(joint_id)
        .map(|j| j.connected.unwrap_or(parent_id))
        .filter(|id| assembly.body(*id).is_some())
    else {
        return ReinforceOutcome::Skipped(SkipReason::MissingConnectedBody);
    };

    let settings = ctx.settings;
    let (Some(body), Some(connected)) = (assembly.body(body_id), assembly.body(connected_id)) else {
        return ReinforceOutcome::Skipped(SkipReason::MissingConnectedBody);
    };
    if body.effective_mass() < settings.mass_for_adjustment
        || connected.effective_mass() < settings.mass_for_adjustment
    {
        tracing::debug!("Body {} mass too low, skipping", body_id);
        return ReinforceOutcome::Skipped(SkipReason::MassTooLow);
    }

    let base_force = body.breaking_force.min(connected.breaking_force) * settings.break_force_multiplier;
    let base_torque =
        body.breaking_torque.min(connected.breaking_torque) * settings.break_torque_multiplier;

    let connection = resolve_connection(assembly, body_id, parent_id);
    let mut section = connection_section(assembly, body_id, connected_id, &connection);
    if settings.use_volume_not_area {
        section = section.volumetric();
    }

    let break_force = base_force.max(settings.break_strength_per_area * section.area);
    let break_torque = base_torque.max(settings.break_torque_per_moi * section.moment_of_inertia);

    let Some(joint) = assembly.joint_mut(joint_id) else {
        return ReinforceOutcome::Skipped(SkipReason::NoAttachJoint);
    };
    let angular_drive = JointDrive {
        position_spring: (section.moment_of_inertia * settings.angular_drive_spring)
            .max(joint.angular_drive.position_spring),
        position_damper: (section.moment_of_inertia
            * settings.angular_drive_damper
            * ANGULAR_DAMPER_SCALE)
            .max(joint.angular_drive.position_damper),
        maximum_force: break_torque,
    };
    joint.angular_drive = angular_drive;
    joint.linear_drive.maximum_force = break_force;
    joint.clear_limits_and_targets();
    joint.break_force = break_force;
    joint.break_torque = break_torque;
    joint.lock_all();
    let local_joint = joint.clone();

    if let Some(body) = assembly.body_mut(body_id) {
        body.attach_method = AttachMethod::LockedJoint;
    }

    tracing::debug!(
        "Body {} -> {}: {:?}, area {:.4}, moi {:.4}, break force {:.1}, break torque {:.1}",
        body_id,
        connected_id,
        connection,
        section.area,
        section.moment_of_inertia,
        break_force,
        break_torque
    );

    let mut long_range = None;
    if settings.multi_part_attach_node_reinforcement
        && !is_strut
        && let Some(grandparent_id) = assembly.parent_of(parent_id)
        && ctx.claim_propagation(parent_id)
        && ctx.is_adjustment_valid(parent_id)
        && ctx.is_adjustment_valid(grandparent_id)
    {
        long_range = extend_to_ancestor(assembly, ctx, registry, body_id, parent_id, &local_joint);
    }

    ReinforceOutcome::Reinforced {
        strength: JointStrength {
            break_force,
            break_torque,
            angular_drive,
            section,
        },
        long_range,
    }
}
