//! Tree completion: leaves tied to each other and to the root

use crate::assembly::{Assembly, BodyId, JointKind};
use crate::registry::{JointRecord, MultiJointRegistry};

use super::{add_locked_link, PassContext};

/// Leaves of the main tree heavy enough to anchor a lattice joint.
///
/// Leaves under other roots (detached bodies) are ignored. A leaf without a
/// rigid body is replaced by its nearest ancestor that has one.
pub fn lattice_leaves(assembly: &Assembly, ctx: &PassContext<'_>) -> Vec<BodyId> {
    let Some(root) = assembly.root() else {
        return Vec::new();
    };
    let mut leaves: Vec<BodyId> = Vec::new();
    for leaf in assembly.leaves() {
        let Some(body) = assembly.body(leaf) else {
            continue;
        };
        if body.effective_mass() <= ctx.settings.mass_for_adjustment {
            continue;
        }
        let chain = assembly.chain_to_root(leaf);
        if chain.last() != Some(&root) {
            continue;
        }
        let anchor = chain
            .into_iter()
            .find(|id| assembly.body(*id).is_some_and(|b| b.has_rigid_body));
        if let Some(anchor) = anchor
            && !leaves.contains(&anchor)
        {
            leaves.push(anchor);
        }
    }
    leaves
}

fn lattice_link(
    assembly: &mut Assembly,
    registry: &mut MultiJointRegistry,
    strength: f32,
    a: BodyId,
    b: BodyId,
) -> bool {
    if a == b {
        return false;
    }
    let backed = |id: BodyId| assembly.body(id).is_some_and(|body| body.has_rigid_body);
    if !backed(a) || !backed(b) {
        return false;
    }
    if registry.check_linked(a, b) || !registry.try_set_linked(a, b) {
        return false;
    }

    match add_locked_link(assembly, JointKind::Lattice, a, b, strength, strength) {
        Some(joint) => {
            registry.register_between(a, b, JointRecord::from(&joint));
            true
        }
        None => false,
    }
}

/// Link every qualifying leaf to its next neighbour, to the leaf opposite it
/// and to the root. Returns the number of joints created.
pub fn complete_tree(
    assembly: &mut Assembly,
    ctx: &PassContext<'_>,
    registry: &mut MultiJointRegistry,
) -> usize {
    if assembly.body_count() <= 1 {
        return 0;
    }
    let Some(root) = assembly.root() else {
        return 0;
    };

    let leaves = lattice_leaves(assembly, ctx);
    let count = leaves.len();
    let strength = ctx.settings.auxiliary_strength();

    let mut created = 0;
    for (i, leaf) in leaves.iter().enumerate() {
        let targets = [leaves[(i + 1) % count], leaves[(i + count / 2) % count], root];
        for other in targets {
            if lattice_link(assembly, registry, strength, *leaf, other) {
                created += 1;
            }
        }
    }

    if created > 0 {
        tracing::debug!("Lattice: {} joints over {} leaves", created, count);
    }
    created
}
