//! Stiffening across decouplers
//!
//! The bodies on either side of a decoupler are tied directly to each other so
//! the decoupler itself does not become the weak point of the stack.

use crate::assembly::{Assembly, BodyId, JointKind};
use crate::registry::{JointRecord, MultiJointRegistry};

use super::{add_locked_link, PassContext};

/// Direction in which the stiffening list is collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StiffeningSide {
    Parents,
    Children,
}

/// Bodies on one side of a decoupler that take part in stiffening.
///
/// Bodies without physical significance and bodies carrying a stiffening
/// extension module are looked through. Neighbours much heavier than a body
/// are pulled in as well. With `only_last`, bodies that were looked through
/// are left out of the result.
pub fn decoupler_stiffening_list(
    assembly: &Assembly,
    ctx: &PassContext<'_>,
    body_id: BodyId,
    side: StiffeningSide,
    only_last: bool,
) -> Vec<BodyId> {
    let Some(body) = assembly.body(body_id) else {
        return Vec::new();
    };
    let neighbours = match side {
        StiffeningSide::Parents => assembly.parent_of(body_id).into_iter().collect(),
        StiffeningSide::Children => assembly.children_of(body_id),
    };

    let mut extend = !body.is_physically_significant() || ctx.class(body_id).stiffening_extension;
    let mut additions = Vec::new();

    if extend {
        for neighbour in neighbours {
            additions.extend(decoupler_stiffening_list(assembly, ctx, neighbour, side, only_last));
        }
    } else {
        let own_mass = body.effective_mass();
        if own_mass > 0.0 {
            let threshold = ctx.settings.stiffening_extension_mass_ratio_threshold;
            for neighbour in neighbours {
                let Some(other) = assembly.body(neighbour) else {
                    continue;
                };
                if other.effective_mass() / own_mass > threshold {
                    tracing::debug!(
                        "'{}' added to decoupler stiffening for its mass",
                        other.name
                    );
                    additions.push(neighbour);
                }
            }
        }
    }

    let mut list = Vec::new();
    if !additions.is_empty() {
        list.append(&mut additions);
    } else if only_last {
        extend = false;
    }
    if !only_last || !extend {
        list.push(body_id);
    }
    list
}

/// Tie every body below `decoupler` to every body above it.
///
/// Returns the records of the joints created.
pub fn stiffen_decoupler(
    assembly: &mut Assembly,
    ctx: &PassContext<'_>,
    registry: &mut MultiJointRegistry,
    decoupler: BodyId,
) -> Vec<JointRecord> {
    let Some(parent) = assembly.parent_of(decoupler) else {
        return Vec::new();
    };
    let parents = decoupler_stiffening_list(assembly, ctx, parent, StiffeningSide::Parents, true);

    let mut children: Vec<BodyId> = Vec::new();
    for child in assembly.children_of(decoupler) {
        for id in decoupler_stiffening_list(assembly, ctx, child, StiffeningSide::Children, true) {
            if !children.contains(&id) {
                children.push(id);
            }
        }
    }

    let strength = ctx.settings.auxiliary_strength();
    let mut created = Vec::new();
    for child in &children {
        for parent in &parents {
            if child == parent {
                continue;
            }
            let backed = |id: BodyId| assembly.body(id).is_some_and(|b| b.has_rigid_body);
            if !backed(*child) || !backed(*parent) {
                continue;
            }
            if registry.check_linked(*child, *parent) || !registry.try_set_linked(*child, *parent) {
                continue;
            }
            if let Some(joint) =
                add_locked_link(assembly, JointKind::Decoupler, *child, *parent, strength, strength)
            {
                let record = JointRecord::from(&joint);
                registry.register_between(*child, *parent, record);
                created.push(record);
            }
        }
    }

    tracing::debug!(
        "Decoupler {}: {} joints between {} and {} bodies",
        decoupler,
        created.len(),
        children.len(),
        parents.len()
    );
    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{Body, Capability, PhysicalSignificance};
    use crate::settings::ReinforcementSettings;

    fn attach(assembly: &mut Assembly, parent: BodyId, body: Body) -> BodyId {
        let id = assembly.add_body(body);
        assembly.connect(parent, id).unwrap();
        id
    }

    #[test]
    fn test_plain_neighbours() {
        let settings = ReinforcementSettings::default();
        let mut assembly = Assembly::new("stack");
        let upper = assembly.add_body(Body::new("upper", 2.0));
        let decoupler = attach(&mut assembly, upper, Body::new("decoupler", 0.1).with_capability(Capability::Decoupler));
        let lower = attach(&mut assembly, decoupler, Body::new("lower", 2.0));
        assembly.update_world_transforms();

        let ctx = PassContext::new(&settings, &assembly);
        assert_eq!(
            decoupler_stiffening_list(&assembly, &ctx, upper, StiffeningSide::Parents, true),
            vec![upper]
        );

        let mut registry = MultiJointRegistry::new();
        assert_eq!(stiffen_decoupler(&mut assembly, &ctx, &mut registry, decoupler).len(), 1);
        let joints = assembly.joints_between(lower, upper);
        assert_eq!(joints.len(), 1);
        assert_eq!(joints[0].kind, JointKind::Decoupler);
        assert_eq!(joints[0].host, lower);
        assert!(registry.check_linked(upper, lower));
    }

    #[test]
    fn test_heavy_parent_added() {
        let settings = ReinforcementSettings::default();
        let mut assembly = Assembly::new("stack");
        let tank = assembly.add_body(Body::new("tank", 50.0));
        let adapter = attach(&mut assembly, tank, Body::new("adapter", 1.0));

        let ctx = PassContext::new(&settings, &assembly);
        assert_eq!(
            decoupler_stiffening_list(&assembly, &ctx, adapter, StiffeningSide::Parents, true),
            vec![tank, adapter]
        );
    }

    #[test]
    fn test_engine_is_looked_through() {
        let settings = ReinforcementSettings::default();
        let mut assembly = Assembly::new("stack");
        let decoupler = assembly.add_body(Body::new("decoupler", 0.1).with_capability(Capability::Decoupler));
        let engine = attach(&mut assembly, decoupler, Body::new("engine", 1.0).with_module("ModuleEngines"));
        let left = attach(&mut assembly, engine, Body::new("left", 1.0));
        let right = attach(&mut assembly, engine, Body::new("right", 1.0));

        let ctx = PassContext::new(&settings, &assembly);
        let only_last = decoupler_stiffening_list(&assembly, &ctx, engine, StiffeningSide::Children, true);
        assert_eq!(only_last, vec![left, right]);

        let all = decoupler_stiffening_list(&assembly, &ctx, engine, StiffeningSide::Children, false);
        assert_eq!(all, vec![left, right, engine]);
    }

    #[test]
    fn test_extension_without_neighbours_keeps_body() {
        let settings = ReinforcementSettings::default();
        let mut assembly = Assembly::new("stack");
        let mut fairing = Body::new("fairing", 0.5);
        fairing.physical_significance = PhysicalSignificance::None;
        let fairing = assembly.add_body(fairing);

        let ctx = PassContext::new(&settings, &assembly);
        assert_eq!(
            decoupler_stiffening_list(&assembly, &ctx, fairing, StiffeningSide::Parents, true),
            vec![fairing]
        );
    }

    #[test]
    fn test_unbacked_bodies_not_linked() {
        let settings = ReinforcementSettings::default();
        let mut assembly = Assembly::new("stack");
        let upper = assembly.add_body(Body::new("upper", 2.0));
        let decoupler = attach(&mut assembly, upper, Body::new("decoupler", 0.1).with_capability(Capability::Decoupler));
        let mut ghost = Body::new("ghost", 2.0);
        ghost.has_rigid_body = false;
        attach(&mut assembly, decoupler, ghost);

        let ctx = PassContext::new(&settings, &assembly);
        let mut registry = MultiJointRegistry::new();
        assert!(stiffen_decoupler(&mut assembly, &ctx, &mut registry, decoupler).is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_root_decoupler_is_ignored() {
        let settings = ReinforcementSettings::default();
        let mut assembly = Assembly::new("stack");
        let decoupler = assembly.add_body(Body::new("decoupler", 0.1).with_capability(Capability::Decoupler));
        attach(&mut assembly, decoupler, Body::new("lower", 2.0));

        let ctx = PassContext::new(&settings, &assembly);
        let mut registry = MultiJointRegistry::new();
        assert!(stiffen_decoupler(&mut assembly, &ctx, &mut registry, decoupler).is_empty());
    }
}
