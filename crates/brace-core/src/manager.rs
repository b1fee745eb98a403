//! Lifecycle orchestration
//!
//! The [`ReinforcementManager`] reacts to host notifications about assemblies,
//! decides when a reinforcement pass may run and keeps the per-assembly
//! registries. Passes that arrive while an assembly is not safe to inspect are
//! queued and retried from [`ReinforcementManager::step`].

use std::collections::{HashMap, HashSet, VecDeque};

use crate::assembly::{AttachMethod, Assembly, AssemblyId, BodyId, JointKind};
use crate::constants::EASING_CRASH_TOLERANCE_FACTOR;
use crate::registry::{JointRecord, MultiJointRegistry};
use crate::reinforce::{complete_tree, reinforce, stiffen_decoupler, PassContext, PassReport};
use crate::settings::ReinforcementSettings;

/// Lookup of live assemblies by id, provided by the host
pub trait AssemblySource {
    fn assembly(&self, id: AssemblyId) -> Option<&Assembly>;
    fn assembly_mut(&mut self, id: AssemblyId) -> Option<&mut Assembly>;
}

impl AssemblySource for HashMap<AssemblyId, Assembly> {
    fn assembly(&self, id: AssemblyId) -> Option<&Assembly> {
        self.get(&id)
    }

    fn assembly_mut(&mut self, id: AssemblyId) -> Option<&mut Assembly> {
        self.get_mut(&id)
    }
}

/// Reinforcement state of one assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Out of active simulation
    #[default]
    Dormant,
    /// A pass is scheduled or running
    Reinforcing,
    /// Pass complete, registries populated
    Reinforced,
}

/// Everything the manager tracks for one assembly in simulation
#[derive(Debug, Default)]
pub struct AssemblyRecord {
    phase: Phase,
    multi: MultiJointRegistry,
    decoupler: MultiJointRegistry,
    easing: bool,
    /// Stiffened decouplers and the bodies their joints link
    stiffened_decouplers: HashMap<BodyId, HashSet<BodyId>>,
    last_report: Option<PassReport>,
}

impl AssemblyRecord {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn multi_registry(&self) -> &MultiJointRegistry {
        &self.multi
    }

    pub fn decoupler_registry(&self) -> &MultiJointRegistry {
        &self.decoupler
    }

    /// Whether easing overrides are currently applied
    pub fn is_easing(&self) -> bool {
        self.easing
    }

    pub fn is_decoupler_stiffened(&self, body: BodyId) -> bool {
        self.stiffened_decouplers.contains_key(&body)
    }

    pub fn last_report(&self) -> Option<&PassReport> {
        self.last_report.as_ref()
    }
}

/// A pass waiting for its assembly to become safe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredPass {
    pub assembly: AssemblyId,
    pub attempts: u32,
}

/// Whether the assembly can be inspected right now
pub fn is_safe(assembly: &Assembly) -> bool {
    !assembly.hierarchy_updating
        && assembly
            .root()
            .and_then(|root| assembly.body(root))
            .is_some_and(|root| root.has_rigid_body)
}

fn apply_easing(assembly: &mut Assembly) {
    for body in assembly.bodies.values_mut() {
        body.crash_tolerance *= EASING_CRASH_TOLERANCE_FACTOR;
    }
    for joint in assembly.joints.values_mut() {
        if joint.kind == JointKind::Primary {
            joint.unbreakable = true;
        }
    }
}

fn revert_easing(assembly: &mut Assembly) {
    for body in assembly.bodies.values_mut() {
        body.crash_tolerance /= EASING_CRASH_TOLERANCE_FACTOR;
    }
    for joint in assembly.joints.values_mut() {
        if joint.kind == JointKind::Primary {
            joint.unbreakable = false;
        }
    }
}

/// One full pass over `assembly`
fn run_pass(
    settings: &ReinforcementSettings,
    assembly: &mut Assembly,
    record: &mut AssemblyRecord,
) -> PassReport {
    let mut ctx = PassContext::new(settings, assembly);
    let mut report = PassReport::default();

    for id in assembly.bodies_depth_first() {
        let Some(body) = assembly.body(id) else {
            continue;
        };
        let joint_adjustable = assembly.parent_of(id).is_some()
            && body.is_physically_significant()
            && body.attach_joint.is_some();
        let class = ctx.class(id);

        if settings.reinforce_attach_nodes && joint_adjustable {
            let outcome = reinforce(assembly, &mut ctx, &mut record.multi, id);
            if class.strut && outcome.is_reinforced() {
                report.struts += 1;
            }
            report.record(&outcome);
        }

        // Insignificant decouplers are stiffened too
        if settings.reinforce_decouplers_further
            && class.decoupler
            && !record.stiffened_decouplers.contains_key(&id)
        {
            let created = stiffen_decoupler(assembly, &ctx, &mut record.decoupler, id);
            report.decoupler_joints += created.len();
            let linked = created
                .iter()
                .flat_map(|r| std::iter::once(r.host).chain(r.connected))
                .collect();
            record.stiffened_decouplers.insert(id, linked);
        }
    }

    if settings.tree_completion
        && settings.reinforce_attach_nodes
        && settings.multi_part_attach_node_reinforcement
    {
        report.lattice_joints += complete_tree(assembly, &ctx, &mut record.multi);
    }

    record.multi.clear_transient_state();
    record.decoupler.clear_transient_state();
    record.phase = Phase::Reinforced;
    record.last_report = Some(report.clone());

    tracing::info!("Assembly '{}' reinforced: {}", assembly.name, report);
    report
}

/// Orchestrates reinforcement passes for every assembly in simulation
#[derive(Debug, Default)]
pub struct ReinforcementManager {
    settings: ReinforcementSettings,
    records: HashMap<AssemblyId, AssemblyRecord>,
    deferred: VecDeque<DeferredPass>,
    construction_mode: bool,
    steps: u64,
}

impl ReinforcementManager {
    pub fn new(settings: ReinforcementSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    // ============== Configuration ==============

    pub fn settings(&self) -> &ReinforcementSettings {
        &self.settings
    }

    /// Swap the configuration; later passes use the new values
    pub fn reload_settings(&mut self, settings: ReinforcementSettings) {
        tracing::info!("Reinforcement settings reloaded");
        self.settings = settings;
    }

    pub fn construction_mode(&self) -> bool {
        self.construction_mode
    }

    pub fn on_construction_mode_changed(&mut self, active: bool) {
        tracing::debug!("Construction mode {}", if active { "on" } else { "off" });
        self.construction_mode = active;
    }

    // ============== Passes ==============

    /// Run a full pass now, regardless of deferral state
    pub fn reinforce_assembly(&mut self, assembly: &mut Assembly) -> PassReport {
        let record = self.records.entry(assembly.id).or_default();
        run_pass(&self.settings, assembly, record)
    }

    fn defer(&mut self, id: AssemblyId) {
        if !self.deferred.iter().any(|task| task.assembly == id) {
            tracing::debug!("Deferring reinforcement of assembly {}", id);
            self.deferred.push_back(DeferredPass {
                assembly: id,
                attempts: 0,
            });
        }
    }

    /// Run now when the assembly is safe, otherwise queue the pass
    fn schedule(&mut self, assembly: &mut Assembly) -> Option<PassReport> {
        self.records.entry(assembly.id).or_default().phase = Phase::Reinforcing;
        if !self.construction_mode && is_safe(assembly) {
            self.deferred.retain(|task| task.assembly != assembly.id);
            Some(self.reinforce_assembly(assembly))
        } else {
            self.defer(assembly.id);
            None
        }
    }

    // ============== Notifications ==============

    /// The assembly's topology changed. Ignored for assemblies not in simulation.
    pub fn on_assembly_modified(&mut self, assembly: &mut Assembly) -> Option<PassReport> {
        if !self.records.contains_key(&assembly.id) {
            return None;
        }
        self.schedule(assembly)
    }

    /// The assembly entered active simulation
    pub fn on_assembly_entered_simulation(&mut self, assembly: &mut Assembly) -> Option<PassReport> {
        tracing::info!("Assembly '{}' entered simulation", assembly.name);
        let report = self.schedule(assembly);

        if assembly.easing_gravity
            && let Some(record) = self.records.get_mut(&assembly.id)
            && !record.easing
        {
            apply_easing(assembly);
            record.easing = true;
            tracing::debug!("Easing overrides applied to '{}'", assembly.name);
        }
        report
    }

    /// The assembly left active simulation. Returns the number of joints destroyed.
    pub fn on_assembly_left_simulation(&mut self, assembly: &mut Assembly) -> usize {
        let destroyed = self.purge_assembly(assembly);
        for body in assembly.bodies.values_mut() {
            body.attach_method = AttachMethod::FixedJoint;
        }
        self.deferred.retain(|task| task.assembly != assembly.id);
        self.records.remove(&assembly.id);
        tracing::info!("Assembly '{}' left simulation", assembly.name);
        destroyed
    }

    /// The assembly was destroyed; pass it if it can still be reached
    pub fn on_assembly_destroyed(&mut self, id: AssemblyId, assembly: Option<&mut Assembly>) -> usize {
        match assembly {
            Some(assembly) => self.on_assembly_left_simulation(assembly),
            None => {
                self.deferred.retain(|task| task.assembly != id);
                self.records.remove(&id);
                0
            }
        }
    }

    /// A joint of `body` broke
    pub fn on_joint_broken(&mut self, assembly: &mut Assembly, body: BodyId) -> usize {
        self.purge_body(assembly, body)
    }

    /// `body` was detached from the assembly
    pub fn on_body_detached(&mut self, assembly: &mut Assembly, body: BodyId) -> usize {
        self.purge_body(assembly, body)
    }

    /// A robotic joint on `body` was locked or unlocked
    pub fn on_robotic_lock_changed(
        &mut self,
        assembly: &mut Assembly,
        body: BodyId,
        locked: bool,
    ) -> Option<PassReport> {
        if let Some(b) = assembly.body_mut(body) {
            b.set_robotic_lock(locked);
            if !locked {
                b.attach_method = AttachMethod::FixedJoint;
            }
        }
        if !locked {
            self.purge_body(assembly, body);
        }
        self.on_assembly_modified(assembly)
    }

    // ============== Teardown ==============

    /// Drop every registry entry for `body`, destroying its reinforcement joints
    pub fn purge_body(&mut self, assembly: &mut Assembly, body: BodyId) -> usize {
        let Some(record) = self.records.get_mut(&assembly.id) else {
            return 0;
        };
        let destroyed = record.multi.on_body_removed(assembly, body)
            + record.decoupler.on_body_removed(assembly, body);
        record
            .stiffened_decouplers
            .retain(|decoupler, linked| *decoupler != body && !linked.contains(&body));
        destroyed
    }

    /// Revert easing and destroy every reinforcement joint of the assembly
    pub fn purge_assembly(&mut self, assembly: &mut Assembly) -> usize {
        let Some(record) = self.records.get_mut(&assembly.id) else {
            return 0;
        };
        if record.easing {
            revert_easing(assembly);
            record.easing = false;
        }
        let destroyed = record.multi.purge_all(assembly) + record.decoupler.purge_all(assembly);
        record.stiffened_decouplers.clear();
        record.phase = Phase::Dormant;
        tracing::debug!("Purged {} reinforcement joint(s) from '{}'", destroyed, assembly.name);
        destroyed
    }

    // ============== Stepping ==============

    /// Advance one simulation step: revert finished easing and retry deferred passes.
    ///
    /// Returns the reports of the passes that ran.
    pub fn step<S: AssemblySource>(&mut self, source: &mut S) -> Vec<(AssemblyId, PassReport)> {
        self.steps += 1;

        for (id, record) in self.records.iter_mut().filter(|(_, r)| r.easing) {
            match source.assembly_mut(*id) {
                Some(assembly) if assembly.easing_gravity => {}
                Some(assembly) => {
                    revert_easing(assembly);
                    record.easing = false;
                    tracing::debug!("Easing finished for '{}'", assembly.name);
                }
                None => record.easing = false,
            }
        }

        let mut reports = Vec::new();
        let mut waiting = VecDeque::new();
        while let Some(mut task) = self.deferred.pop_front() {
            let Some(assembly) = source.assembly_mut(task.assembly) else {
                tracing::debug!("Assembly {} is gone, dropping deferred pass", task.assembly);
                continue;
            };
            let Some(record) = self.records.get_mut(&task.assembly) else {
                continue;
            };
            if record.phase == Phase::Reinforced {
                continue;
            }

            if !self.construction_mode && is_safe(assembly) {
                let report = run_pass(&self.settings, assembly, record);
                reports.push((task.assembly, report));
                continue;
            }

            task.attempts += 1;
            if task.attempts >= self.settings.max_deferred_steps {
                tracing::warn!(
                    "Assembly '{}' not safe after {} steps, abandoning reinforcement",
                    assembly.name,
                    task.attempts
                );
            } else {
                waiting.push_back(task);
            }
        }
        self.deferred = waiting;
        reports
    }

    // ============== Queries ==============

    pub fn phase(&self, id: AssemblyId) -> Phase {
        self.records.get(&id).map(|r| r.phase).unwrap_or_default()
    }

    pub fn record(&self, id: AssemblyId) -> Option<&AssemblyRecord> {
        self.records.get(&id)
    }

    pub fn pending_deferrals(&self) -> usize {
        self.deferred.len()
    }

    /// Steps seen so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Unique reinforcement joints of both registries
    pub fn reinforcement_joints(&self, id: AssemblyId) -> Vec<JointRecord> {
        let Some(record) = self.records.get(&id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        record
            .multi
            .records()
            .into_iter()
            .chain(record.decoupler.records())
            .filter(|r| seen.insert(r.joint))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{Body, Capability, PhysicalSignificance};
    use crate::reinforce::SkipReason;

    /// Chain of bodies, the first one being the root
    fn stack(masses: &[f32]) -> (Assembly, Vec<BodyId>) {
        let mut assembly = Assembly::new("stack");
        let ids: Vec<BodyId> = masses
            .iter()
            .enumerate()
            .map(|(i, m)| assembly.add_body(Body::new(format!("b{}", i), *m)))
            .collect();
        for pair in ids.windows(2) {
            assembly.connect(pair[0], pair[1]).unwrap();
        }
        assembly.update_world_transforms();
        (assembly, ids)
    }

    #[test]
    fn test_enter_simulation_runs_pass() {
        let mut manager = ReinforcementManager::new(ReinforcementSettings::default());
        let (mut assembly, ids) = stack(&[1.0, 1.0, 1.0]);

        let report = manager.on_assembly_entered_simulation(&mut assembly).unwrap();
        assert_eq!(report.reinforced, 2);
        assert_eq!(report.long_range_joints, 1);
        assert_eq!(manager.phase(assembly.id), Phase::Reinforced);
        assert!(ids[1..].iter().all(|id| assembly.body(*id).unwrap().is_locked()));
        assert_eq!(manager.reinforcement_joints(assembly.id).len(), 1);
    }

    #[test]
    fn test_modified_ignored_outside_simulation() {
        let mut manager = ReinforcementManager::new(ReinforcementSettings::default());
        let (mut assembly, _) = stack(&[1.0, 1.0]);
        assert!(manager.on_assembly_modified(&mut assembly).is_none());
        assert_eq!(manager.phase(assembly.id), Phase::Dormant);
        assert_eq!(manager.pending_deferrals(), 0);
    }

    #[test]
    fn test_unsafe_assembly_is_deferred() {
        let mut manager = ReinforcementManager::new(ReinforcementSettings::default());
        let (mut assembly, _) = stack(&[1.0, 1.0, 1.0]);
        assembly.hierarchy_updating = true;
        let id = assembly.id;

        assert!(manager.on_assembly_entered_simulation(&mut assembly).is_none());
        assert!(manager.on_assembly_modified(&mut assembly).is_none());
        assert_eq!(manager.pending_deferrals(), 1);
        assert_eq!(manager.phase(id), Phase::Reinforcing);

        let mut world = HashMap::new();
        world.insert(id, assembly);
        assert!(manager.step(&mut world).is_empty());

        world.get_mut(&id).unwrap().hierarchy_updating = false;
        let reports = manager.step(&mut world);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, id);
        assert_eq!(manager.pending_deferrals(), 0);
        assert_eq!(manager.phase(id), Phase::Reinforced);
        assert_eq!(manager.steps(), 2);
    }

    #[test]
    fn test_deferral_abandoned_after_limit() {
        let settings = ReinforcementSettings {
            max_deferred_steps: 3,
            ..Default::default()
        };
        let mut manager = ReinforcementManager::new(settings);
        let (mut assembly, ids) = stack(&[1.0, 1.0]);
        assembly.body_mut(ids[0]).unwrap().has_rigid_body = false;
        let id = assembly.id;
        manager.on_assembly_entered_simulation(&mut assembly);

        let mut world = HashMap::new();
        world.insert(id, assembly);
        manager.step(&mut world);
        manager.step(&mut world);
        assert_eq!(manager.pending_deferrals(), 1);
        manager.step(&mut world);
        assert_eq!(manager.pending_deferrals(), 0);
        assert_eq!(manager.phase(id), Phase::Reinforcing);
    }

    #[test]
    fn test_construction_mode_defers() {
        let mut manager = ReinforcementManager::new(ReinforcementSettings::default());
        let (mut assembly, _) = stack(&[1.0, 1.0]);
        let id = assembly.id;
        manager.on_construction_mode_changed(true);
        assert!(manager.on_assembly_entered_simulation(&mut assembly).is_none());

        let mut world = HashMap::new();
        world.insert(id, assembly);
        assert!(manager.step(&mut world).is_empty());

        manager.on_construction_mode_changed(false);
        assert_eq!(manager.step(&mut world).len(), 1);
    }

    #[test]
    fn test_destroyed_assembly_drops_deferral() {
        let mut manager = ReinforcementManager::new(ReinforcementSettings::default());
        let (mut assembly, _) = stack(&[1.0, 1.0]);
        assembly.hierarchy_updating = true;
        manager.on_assembly_entered_simulation(&mut assembly);

        let mut world: HashMap<AssemblyId, Assembly> = HashMap::new();
        assert!(manager.step(&mut world).is_empty());
        assert_eq!(manager.pending_deferrals(), 0);

        manager.on_assembly_destroyed(assembly.id, None);
        assert!(manager.record(assembly.id).is_none());
    }

    #[test]
    fn test_easing_applied_and_reverted() {
        let mut manager = ReinforcementManager::new(ReinforcementSettings::default());
        let (mut assembly, ids) = stack(&[1.0, 1.0]);
        assembly.easing_gravity = true;
        let id = assembly.id;

        manager.on_assembly_entered_simulation(&mut assembly);
        assert!(manager.record(id).unwrap().is_easing());
        assert!(assembly.primary_joint(ids[1]).unwrap().unbreakable);
        assert_eq!(assembly.body(ids[0]).unwrap().crash_tolerance, 90000.0);

        let mut world = HashMap::new();
        world.insert(id, assembly);
        manager.step(&mut world);
        assert!(manager.record(id).unwrap().is_easing());

        world.get_mut(&id).unwrap().easing_gravity = false;
        manager.step(&mut world);
        let assembly = &world[&id];
        assert!(!manager.record(id).unwrap().is_easing());
        assert!(!assembly.primary_joint(ids[1]).unwrap().unbreakable);
        assert_eq!(assembly.body(ids[0]).unwrap().crash_tolerance, 9.0);
    }

    #[test]
    fn test_left_simulation_tears_down() {
        let mut manager = ReinforcementManager::new(ReinforcementSettings::default());
        let (mut assembly, ids) = stack(&[1.0, 1.0, 1.0, 1.0]);
        assembly.easing_gravity = true;
        manager.on_assembly_entered_simulation(&mut assembly);
        let reinforcement = manager.reinforcement_joints(assembly.id).len();
        assert!(reinforcement > 0);

        let destroyed = manager.on_assembly_left_simulation(&mut assembly);
        assert_eq!(destroyed, reinforcement);
        assert_eq!(assembly.joint_count(), 3);
        assert!(ids.iter().all(|id| !assembly.body(*id).unwrap().is_locked()));
        assert_eq!(assembly.body(ids[0]).unwrap().crash_tolerance, 9.0);
        assert_eq!(manager.phase(assembly.id), Phase::Dormant);
        assert!(manager.reinforcement_joints(assembly.id).is_empty());
    }

    #[test]
    fn test_joint_broken_purges_body() {
        let mut manager = ReinforcementManager::new(ReinforcementSettings::default());
        let (mut assembly, ids) = stack(&[1.0, 1.0, 1.0]);
        manager.on_assembly_entered_simulation(&mut assembly);
        assert_eq!(assembly.joints_between(ids[2], ids[0]).len(), 1);

        assert_eq!(manager.on_joint_broken(&mut assembly, ids[1]), 1);
        assert!(assembly.joints_between(ids[2], ids[0]).is_empty());
        let record = manager.record(assembly.id).unwrap();
        assert!(record.multi_registry().joints_for(ids[0]).is_empty());
        assert!(!record.multi_registry().check_linked(ids[2], ids[0]));
    }

    #[test]
    fn test_unlocked_robotic_joint_is_released() {
        let mut manager = ReinforcementManager::new(ReinforcementSettings::default());
        let mut assembly = Assembly::new("arm");
        let base = assembly.add_body(Body::new("base", 5.0));
        let hinge = assembly.add_body(Body::new("hinge", 1.0).with_capability(Capability::Robotic { locked: true }));
        let tip = assembly.add_body(Body::new("tip", 1.0));
        assembly.connect(base, hinge).unwrap();
        assembly.connect(hinge, tip).unwrap();
        manager.on_assembly_entered_simulation(&mut assembly);
        assert!(assembly.body(hinge).unwrap().is_locked());

        let report = manager.on_robotic_lock_changed(&mut assembly, hinge, false).unwrap();
        assert!(!assembly.body(hinge).unwrap().is_locked());
        assert_eq!(report.skipped.get(&SkipReason::NotAdjustable), Some(&1));
        assert!(assembly.joints.values().all(|j| j.kind != JointKind::LongRange));
    }

    #[test]
    fn test_decoupler_stiffened_once() {
        let mut manager = ReinforcementManager::new(ReinforcementSettings::default());
        let mut assembly = Assembly::new("stage");
        let upper = assembly.add_body(Body::new("upper", 2.0));
        let decoupler = assembly.add_body(Body::new("decoupler", 0.1).with_capability(Capability::Decoupler));
        let lower = assembly.add_body(Body::new("lower", 2.0));
        assembly.connect(upper, decoupler).unwrap();
        assembly.connect(decoupler, lower).unwrap();

        let report = manager.on_assembly_entered_simulation(&mut assembly).unwrap();
        assert_eq!(report.decoupler_joints, 1);
        assert!(manager.record(assembly.id).unwrap().is_decoupler_stiffened(decoupler));

        let report = manager.on_assembly_modified(&mut assembly).unwrap();
        assert_eq!(report.decoupler_joints, 0);
        assert_eq!(
            manager
                .record(assembly.id)
                .unwrap()
                .decoupler_registry()
                .joint_count(),
            1
        );
    }

    #[test]
    fn test_insignificant_decoupler_is_stiffened() {
        let mut manager = ReinforcementManager::new(ReinforcementSettings::default());
        let mut assembly = Assembly::new("stage");
        let upper = assembly.add_body(Body::new("upper", 2.0));
        let mut ring = Body::new("ring", 0.1).with_capability(Capability::Decoupler);
        ring.physical_significance = PhysicalSignificance::None;
        let ring = assembly.add_body(ring);
        let lower = assembly.add_body(Body::new("lower", 2.0));
        assembly.connect(upper, ring).unwrap();
        assembly.connect(ring, lower).unwrap();

        let report = manager.on_assembly_entered_simulation(&mut assembly).unwrap();
        assert_eq!(report.decoupler_joints, 1);
        assert!(manager.record(assembly.id).unwrap().is_decoupler_stiffened(ring));
        let joints = assembly.joints_between(lower, upper);
        assert!(joints.iter().any(|j| j.kind == JointKind::Decoupler));
    }

    #[test]
    fn test_decoupler_restiffened_after_neighbour_purge() {
        let mut manager = ReinforcementManager::new(ReinforcementSettings::default());
        let mut assembly = Assembly::new("stage");
        let upper = assembly.add_body(Body::new("upper", 2.0));
        let decoupler = assembly.add_body(Body::new("decoupler", 0.1).with_capability(Capability::Decoupler));
        let lower = assembly.add_body(Body::new("lower", 2.0));
        assembly.connect(upper, decoupler).unwrap();
        assembly.connect(decoupler, lower).unwrap();
        manager.on_assembly_entered_simulation(&mut assembly);

        manager.on_joint_broken(&mut assembly, lower);
        let record = manager.record(assembly.id).unwrap();
        assert!(!record.is_decoupler_stiffened(decoupler));
        assert!(record.decoupler_registry().is_empty());
        assert!(
            assembly
                .joints
                .values()
                .all(|j| j.kind != JointKind::Decoupler)
        );

        let report = manager.on_assembly_modified(&mut assembly).unwrap();
        assert_eq!(report.decoupler_joints, 1);
        assert!(manager.record(assembly.id).unwrap().is_decoupler_stiffened(decoupler));
    }

    #[test]
    fn test_unrelated_purge_keeps_decoupler_mark() {
        let mut manager = ReinforcementManager::new(ReinforcementSettings::default());
        let mut assembly = Assembly::new("stage");
        let upper = assembly.add_body(Body::new("upper", 2.0));
        let decoupler = assembly.add_body(Body::new("decoupler", 0.1).with_capability(Capability::Decoupler));
        let lower = assembly.add_body(Body::new("lower", 2.0));
        let antenna = assembly.add_body(Body::new("antenna", 0.5));
        assembly.connect(upper, decoupler).unwrap();
        assembly.connect(decoupler, lower).unwrap();
        assembly.connect(upper, antenna).unwrap();
        manager.on_assembly_entered_simulation(&mut assembly);

        manager.on_joint_broken(&mut assembly, antenna);
        assert!(manager.record(assembly.id).unwrap().is_decoupler_stiffened(decoupler));
    }

    #[test]
    fn test_reload_settings() {
        let mut manager = ReinforcementManager::new(ReinforcementSettings::default());
        manager.reload_settings(ReinforcementSettings {
            tree_completion: false,
            ..Default::default()
        });
        assert!(!manager.settings().tree_completion);
    }
}
