//! Reinforcement pass components
//!
//! - Strength: sizes a primary joint from the connection's cross-section
//! - Propagation: long-range joints past light intermediate bodies
//! - Lattice: leaves linked to each other and to the root
//! - Decoupler: stiffening across decouplers

mod decoupler;
mod lattice;
mod propagation;
mod strength;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::assembly::{Assembly, BodyClass, BodyId, JointId, JointKind, StructuralJoint};
use crate::settings::ReinforcementSettings;

pub use decoupler::{decoupler_stiffening_list, stiffen_decoupler, StiffeningSide};
pub use lattice::{complete_tree, lattice_leaves};
pub use propagation::{extend_to_ancestor, mass_ratio};
pub use strength::{reinforce, resolve_connection, Connection, JointStrength};

/// Per-pass state shared by the pass components
#[derive(Debug)]
pub struct PassContext<'a> {
    pub settings: &'a ReinforcementSettings,
    classes: HashMap<BodyId, BodyClass>,
    /// Parents whose first child already triggered propagation
    propagated_parents: HashSet<BodyId>,
}

impl<'a> PassContext<'a> {
    /// Resolve body capabilities once for the whole pass
    pub fn new(settings: &'a ReinforcementSettings, assembly: &Assembly) -> Self {
        let classes = assembly
            .bodies
            .iter()
            .map(|(id, body)| (*id, BodyClass::resolve(body, settings)))
            .collect();
        Self {
            settings,
            classes,
            propagated_parents: HashSet::new(),
        }
    }

    pub fn class(&self, id: BodyId) -> BodyClass {
        self.classes.get(&id).copied().unwrap_or_default()
    }

    pub fn is_adjustment_valid(&self, id: BodyId) -> bool {
        self.class(id).adjustment_valid
    }

    /// Claim the propagation slot for `parent`; false if a sibling already took it
    pub(crate) fn claim_propagation(&mut self, parent: BodyId) -> bool {
        self.propagated_parents.insert(parent)
    }
}

/// Why a body was left as it was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    UnknownBody,
    NoRigidBody,
    NoAttachJoint,
    NotAdjustable,
    AlreadyLocked,
    MassTooLow,
    MissingConnectedBody,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::UnknownBody => "unknown body",
            SkipReason::NoRigidBody => "no rigid body",
            SkipReason::NoAttachJoint => "no attach joint",
            SkipReason::NotAdjustable => "not adjustable",
            SkipReason::AlreadyLocked => "already locked",
            SkipReason::MassTooLow => "mass too low",
            SkipReason::MissingConnectedBody => "missing connected body",
        };
        f.write_str(text)
    }
}

/// Result of reinforcing one body
#[derive(Debug, Clone, PartialEq)]
pub enum ReinforceOutcome {
    Reinforced {
        strength: JointStrength,
        /// Long-range joint created by propagation
        long_range: Option<JointId>,
    },
    Skipped(SkipReason),
}

impl ReinforceOutcome {
    pub fn is_reinforced(&self) -> bool {
        matches!(self, ReinforceOutcome::Reinforced { .. })
    }
}

/// Summary of one reinforcement pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub reinforced: usize,
    pub struts: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    pub long_range_joints: usize,
    pub lattice_joints: usize,
    pub decoupler_joints: usize,
}

impl PassReport {
    pub(crate) fn record(&mut self, outcome: &ReinforceOutcome) {
        match outcome {
            ReinforceOutcome::Reinforced { long_range, .. } => {
                self.reinforced += 1;
                if long_range.is_some() {
                    self.long_range_joints += 1;
                }
            }
            ReinforceOutcome::Skipped(reason) => {
                *self.skipped.entry(*reason).or_default() += 1;
            }
        }
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn joints_created(&self) -> usize {
        self.long_range_joints + self.lattice_joints + self.decoupler_joints
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reinforced, {} skipped, {} long-range, {} lattice, {} decoupler",
            self.reinforced,
            self.skipped_total(),
            self.long_range_joints,
            self.lattice_joints,
            self.decoupler_joints
        )
    }
}

/// Create a fully locked joint from `host` to `connected` and add it to the assembly
pub(crate) fn add_locked_link(
    assembly: &mut Assembly,
    kind: JointKind,
    host: BodyId,
    connected: BodyId,
    break_force: f32,
    break_torque: f32,
) -> Option<StructuralJoint> {
    let host_body = assembly.body(host)?;
    let connected_body = assembly.body(connected)?;
    let connected_anchor = host_body
        .world_transform
        .inverse()
        .transform_point3(connected_body.world_position());

    let joint = StructuralJoint::builder(kind, host)
        .connected(connected)
        .connected_anchor(connected_anchor)
        .break_force(break_force)
        .break_torque(break_torque)
        .locked()
        .build();
    assembly.add_joint(joint.clone()).ok()?;
    Some(joint)
}
