//! Multi-joint registry
//!
//! Bookkeeping for reinforcement joints that are not parent/child joints. Each
//! joint is recorded under every body it passes through so that removing any of
//! those bodies tears the joint down. A set of linked pairs prevents the same two
//! bodies from being reinforced twice.
//!
//! The registry never owns the physical joints; they live in the [`Assembly`]
//! and are destroyed through it.

use std::collections::{BTreeMap, HashSet};

use crate::assembly::{Assembly, BodyId, JointId, StructuralJoint};

/// Unordered pair of bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyPair(BodyId, BodyId);

impl BodyPair {
    pub fn new(a: BodyId, b: BodyId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    pub fn contains(&self, body: BodyId) -> bool {
        self.0 == body || self.1 == body
    }

    pub fn bodies(&self) -> (BodyId, BodyId) {
        (self.0, self.1)
    }
}

/// A tracked reinforcement joint and its two ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointRecord {
    pub joint: JointId,
    pub host: BodyId,
    pub connected: Option<BodyId>,
}

impl JointRecord {
    pub fn connects(&self, a: BodyId, b: BodyId) -> bool {
        (self.host == a && self.connected == Some(b)) || (self.host == b && self.connected == Some(a))
    }
}

impl From<&StructuralJoint> for JointRecord {
    fn from(joint: &StructuralJoint) -> Self {
        Self {
            joint: joint.id,
            host: joint.host,
            connected: joint.connected,
        }
    }
}

/// Index from body to the reinforcement joints touching it
#[derive(Debug, Clone, Default)]
pub struct MultiJointRegistry {
    joints: BTreeMap<BodyId, Vec<JointRecord>>,
    linked: HashSet<BodyPair>,
}

impl MultiJointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a reinforcement joint already connects the pair
    pub fn check_linked(&self, a: BodyId, b: BodyId) -> bool {
        if self.linked.contains(&BodyPair::new(a, b)) {
            return true;
        }
        [a, b].iter().any(|body| {
            self.joints
                .get(body)
                .is_some_and(|records| records.iter().any(|r| r.connects(a, b)))
        })
    }

    /// Mark the pair as linked; false if it already was
    pub fn try_set_linked(&mut self, a: BodyId, b: BodyId) -> bool {
        self.linked.insert(BodyPair::new(a, b))
    }

    /// Record `joint` under `body`
    pub fn register(&mut self, body: BodyId, joint: JointRecord) {
        let records = self.joints.entry(body).or_default();
        if !records.iter().any(|r| r.joint == joint.joint) {
            records.push(joint);
        }
    }

    /// Link the pair and record `joint` under both bodies
    pub fn register_between(&mut self, a: BodyId, b: BodyId, joint: JointRecord) {
        self.try_set_linked(a, b);
        self.register(a, joint);
        self.register(b, joint);
    }

    /// Destroy every joint recorded under `body` and drop all references to it.
    ///
    /// Returns the number of joints destroyed in the assembly. Safe to call for
    /// bodies with no records and for bodies already removed.
    pub fn on_body_removed(&mut self, assembly: &mut Assembly, body: BodyId) -> usize {
        let records = self.joints.remove(&body).unwrap_or_default();

        let mut destroyed = 0;
        for record in &records {
            if assembly.destroy_joint(record.joint).is_some() {
                destroyed += 1;
            }
            for list in self.joints.values_mut() {
                list.retain(|r| r.joint != record.joint);
            }
            if let Some(connected) = record.connected {
                self.linked.remove(&BodyPair::new(record.host, connected));
            }
        }
        self.joints.retain(|_, list| !list.is_empty());
        self.linked.retain(|pair| !pair.contains(body));

        if !records.is_empty() {
            tracing::debug!(
                "Removed {} reinforcement joint(s) through body {}",
                records.len(),
                body
            );
        }
        destroyed
    }

    /// Forget per-pass link bookkeeping; joints stay in place
    pub fn clear_transient_state(&mut self) {
        self.linked.clear();
    }

    /// Destroy every tracked joint and reset the registry
    pub fn purge_all(&mut self, assembly: &mut Assembly) -> usize {
        let destroyed = self
            .records()
            .iter()
            .filter(|r| assembly.destroy_joint(r.joint).is_some())
            .count();
        self.forget();
        destroyed
    }

    /// Reset the registry without touching any assembly
    pub fn forget(&mut self) {
        self.joints.clear();
        self.linked.clear();
    }

    /// Records tracked under `body`
    pub fn joints_for(&self, body: BodyId) -> &[JointRecord] {
        self.joints.get(&body).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every tracked joint once
    pub fn records(&self) -> Vec<JointRecord> {
        let mut seen = HashSet::new();
        self.joints
            .values()
            .flatten()
            .filter(|r| seen.insert(r.joint))
            .copied()
            .collect()
    }

    /// Bodies with at least one record
    pub fn bodies(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.joints.keys().copied()
    }

    pub fn joint_count(&self) -> usize {
        self.records().len()
    }

    pub fn linked_pair_count(&self) -> usize {
        self.linked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty() && self.linked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{Body, JointKind};

    fn setup(count: usize) -> (Assembly, Vec<BodyId>) {
        let mut assembly = Assembly::new("registry");
        let ids: Vec<BodyId> = (0..count)
            .map(|i| assembly.add_body(Body::new(format!("b{}", i), 1.0)))
            .collect();
        for pair in ids.windows(2) {
            assembly.connect(pair[0], pair[1]).unwrap();
        }
        (assembly, ids)
    }

    fn link(assembly: &mut Assembly, host: BodyId, connected: BodyId) -> JointRecord {
        let joint = StructuralJoint::builder(JointKind::Lattice, host)
            .connected(connected)
            .locked()
            .build();
        let record = JointRecord::from(&joint);
        assembly.add_joint(joint).unwrap();
        record
    }

    #[test]
    fn test_try_set_linked_is_symmetric() {
        let mut registry = MultiJointRegistry::new();
        assert!(registry.try_set_linked(BodyId(1), BodyId(2)));
        assert!(!registry.try_set_linked(BodyId(2), BodyId(1)));
        assert!(registry.check_linked(BodyId(2), BodyId(1)));
    }

    #[test]
    fn test_check_linked_survives_transient_clear() {
        let (mut assembly, ids) = setup(3);
        let mut registry = MultiJointRegistry::new();
        let record = link(&mut assembly, ids[2], ids[0]);
        registry.register_between(ids[2], ids[0], record);

        registry.clear_transient_state();
        assert_eq!(registry.linked_pair_count(), 0);
        assert!(registry.check_linked(ids[0], ids[2]));
        assert!(!registry.check_linked(ids[0], ids[1]));
    }

    #[test]
    fn test_register_deduplicates() {
        let (mut assembly, ids) = setup(2);
        let mut registry = MultiJointRegistry::new();
        let record = link(&mut assembly, ids[1], ids[0]);
        registry.register(ids[1], record);
        registry.register(ids[1], record);
        assert_eq!(registry.joints_for(ids[1]).len(), 1);
    }

    #[test]
    fn test_on_body_removed_tears_down_crossed_joint() {
        let (mut assembly, ids) = setup(4);
        let mut registry = MultiJointRegistry::new();
        let record = link(&mut assembly, ids[3], ids[0]);
        for body in &ids {
            registry.register(*body, record);
        }
        registry.try_set_linked(ids[1], ids[2]);

        let destroyed = registry.on_body_removed(&mut assembly, ids[1]);
        assert_eq!(destroyed, 1);
        assert!(assembly.joint(record.joint).is_none());
        for body in &ids {
            assert!(registry.joints_for(*body).is_empty());
        }
        assert!(!registry.check_linked(ids[1], ids[2]));
        assert!(!registry.check_linked(ids[3], ids[0]));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_on_body_removed_is_idempotent() {
        let (mut assembly, ids) = setup(3);
        let mut registry = MultiJointRegistry::new();
        let record = link(&mut assembly, ids[2], ids[0]);
        registry.register_between(ids[2], ids[0], record);

        assert_eq!(registry.on_body_removed(&mut assembly, ids[0]), 1);
        assert_eq!(registry.on_body_removed(&mut assembly, ids[0]), 0);
        assert_eq!(registry.on_body_removed(&mut assembly, BodyId(99)), 0);
        assert_eq!(assembly.joint_count(), 2);
    }

    #[test]
    fn test_removal_keeps_unrelated_joints() {
        let (mut assembly, ids) = setup(4);
        let mut registry = MultiJointRegistry::new();
        let first = link(&mut assembly, ids[2], ids[0]);
        let second = link(&mut assembly, ids[3], ids[1]);
        registry.register_between(ids[2], ids[0], first);
        registry.register_between(ids[3], ids[1], second);

        registry.on_body_removed(&mut assembly, ids[0]);
        assert!(assembly.joint(second.joint).is_some());
        assert!(registry.check_linked(ids[1], ids[3]));
        assert_eq!(registry.joint_count(), 1);
    }

    #[test]
    fn test_purge_all() {
        let (mut assembly, ids) = setup(3);
        let mut registry = MultiJointRegistry::new();
        let record = link(&mut assembly, ids[2], ids[0]);
        registry.register_between(ids[2], ids[0], record);

        assert_eq!(registry.purge_all(&mut assembly), 1);
        assert!(registry.is_empty());
        assert_eq!(assembly.joint_count(), 2);
    }
}
