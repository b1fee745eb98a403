//! Assembly (tree of rigid bodies) and its joints

mod joint;
mod queries;
mod tree_cache;
mod types;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use glam::Mat4;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use joint::{
    JointBuilder, JointDrive, JointId, JointKind, Motion, MotionLocks, SoftLimit, StructuralJoint,
};
pub use types::{
    AttachMethod, AttachMode, AttachNode, Body, BodyClass, BodyId, Capability, NodeKind,
    PhysicalSignificance, Pose,
};

use tree_cache::TreeCache;

/// Unique assembly identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssemblyId(pub Uuid);

impl AssemblyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssemblyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssemblyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw assembly data for deserialization (used internally)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AssemblyData {
    #[serde(default)]
    id: AssemblyId,
    name: String,
    bodies: BTreeMap<BodyId, Body>,
    #[serde(default)]
    joints: HashMap<JointId, StructuralJoint>,
    #[serde(default)]
    parent: HashMap<BodyId, BodyId>,
    #[serde(default)]
    next_body: u32,
    #[serde(default)]
    hierarchy_updating: bool,
    #[serde(default)]
    easing_gravity: bool,
}

/// Tree of rigid bodies connected by structural joints
#[derive(Debug, Clone, Serialize)]
#[serde(into = "AssemblyData")]
pub struct Assembly {
    pub id: AssemblyId,
    pub name: String,
    /// All bodies, ordered by id
    pub bodies: BTreeMap<BodyId, Body>,
    /// All physical joints; each is owned by its host body
    pub joints: HashMap<JointId, StructuralJoint>,
    /// Parent mapping: child -> parent
    pub parent: HashMap<BodyId, BodyId>,
    /// Children mapping: parent -> [child]
    pub children: HashMap<BodyId, Vec<BodyId>>,
    /// Host is rebuilding the hierarchy; not safe to inspect
    pub hierarchy_updating: bool,
    /// Host is ramping gravity up after entering simulation
    pub easing_gravity: bool,
    next_body: u32,
    /// Cached tree structure (interior mutability for lazy evaluation)
    cache: RefCell<TreeCache>,
}

impl From<Assembly> for AssemblyData {
    fn from(assembly: Assembly) -> Self {
        Self {
            id: assembly.id,
            name: assembly.name,
            bodies: assembly.bodies,
            joints: assembly.joints,
            parent: assembly.parent,
            next_body: assembly.next_body,
            hierarchy_updating: assembly.hierarchy_updating,
            easing_gravity: assembly.easing_gravity,
        }
    }
}

impl From<AssemblyData> for Assembly {
    fn from(data: AssemblyData) -> Self {
        let next_body = data
            .bodies
            .keys()
            .map(|id| id.0 + 1)
            .max()
            .unwrap_or(0)
            .max(data.next_body);
        let mut assembly = Self {
            id: data.id,
            name: data.name,
            bodies: data.bodies,
            joints: data.joints,
            parent: data.parent,
            children: HashMap::new(),
            hierarchy_updating: data.hierarchy_updating,
            easing_gravity: data.easing_gravity,
            next_body,
            cache: RefCell::new(TreeCache::default()),
        };
        assembly.rebuild_indices();
        assembly.update_world_transforms();
        assembly
    }
}

impl<'de> Deserialize<'de> for Assembly {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let data = AssemblyData::deserialize(deserializer)?;
        Ok(Assembly::from(data))
    }
}

impl Default for Assembly {
    fn default() -> Self {
        Self::new("assembly")
    }
}

impl Assembly {
    /// Create a new empty assembly
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: AssemblyId::new(),
            name: name.into(),
            bodies: BTreeMap::new(),
            joints: HashMap::new(),
            parent: HashMap::new(),
            children: HashMap::new(),
            hierarchy_updating: false,
            easing_gravity: false,
            next_body: 0,
            cache: RefCell::new(TreeCache::default()),
        }
    }

    /// Rebuild the children index from the parent mapping (call after deserialization)
    pub fn rebuild_indices(&mut self) {
        self.parent
            .retain(|child, parent| self.bodies.contains_key(child) && self.bodies.contains_key(parent));
        self.children.clear();
        let mut pairs: Vec<(BodyId, BodyId)> = self.parent.iter().map(|(c, p)| (*c, *p)).collect();
        pairs.sort();
        for (child, parent) in pairs {
            self.children.entry(parent).or_default().push(child);
        }
        self.invalidate_cache();
    }

    /// Invalidate the tree cache (call after any structural change)
    pub(crate) fn invalidate_cache(&self) {
        self.cache.borrow_mut().invalidate();
    }

    /// Ensure the cache is valid, rebuilding if necessary
    pub(crate) fn ensure_cache_valid(&self) {
        let mut cache = self.cache.borrow_mut();
        if !cache.valid {
            cache.rebuild(&self.bodies, &self.parent, &self.children);
        }
    }

    /// Add a body to the assembly (unconnected)
    pub fn add_body(&mut self, body: Body) -> BodyId {
        let id = BodyId(self.next_body);
        self.next_body += 1;
        self.bodies.insert(id, body);
        self.invalidate_cache();
        id
    }

    /// Remove a body and all its descendants, with every joint touching them
    pub fn remove_body(&mut self, id: BodyId) -> Result<Vec<BodyId>, AssemblyError> {
        if !self.bodies.contains_key(&id) {
            return Err(AssemblyError::BodyNotFound(id));
        }

        let mut to_remove = vec![id];
        let mut i = 0;
        while i < to_remove.len() {
            if let Some(children) = self.children.get(&to_remove[i]) {
                to_remove.extend(children.iter().copied());
            }
            i += 1;
        }

        if let Some(parent_id) = self.parent.get(&id).copied()
            && let Some(siblings) = self.children.get_mut(&parent_id)
        {
            siblings.retain(|c| *c != id);
        }

        for body_id in &to_remove {
            self.bodies.remove(body_id);
            self.children.remove(body_id);
            self.parent.remove(body_id);
        }

        let dead: Vec<JointId> = self
            .joints
            .values()
            .filter(|j| to_remove.iter().any(|b| j.touches(*b)))
            .map(|j| j.id)
            .collect();
        for joint_id in dead {
            self.destroy_joint(joint_id);
        }

        self.invalidate_cache();
        Ok(to_remove)
    }

    /// Connect `child` under `parent` with a new primary joint hosted by the child
    pub fn connect(&mut self, parent_id: BodyId, child_id: BodyId) -> Result<JointId, AssemblyError> {
        let parent = self
            .bodies
            .get(&parent_id)
            .ok_or(AssemblyError::BodyNotFound(parent_id))?;
        let child = self
            .bodies
            .get(&child_id)
            .ok_or(AssemblyError::BodyNotFound(child_id))?;

        if self.would_create_cycle(parent_id, child_id) {
            return Err(AssemblyError::WouldCreateCycle);
        }
        if self.parent.contains_key(&child_id) {
            return Err(AssemblyError::AlreadyHasParent(child_id));
        }

        let joint = StructuralJoint::builder(JointKind::Primary, child_id)
            .connected(parent_id)
            .connected_anchor(child.local_offset.position())
            .break_force(parent.breaking_force.min(child.breaking_force))
            .break_torque(parent.breaking_torque.min(child.breaking_torque))
            .build();
        let joint_id = joint.id;
        self.joints.insert(joint_id, joint);

        self.children.entry(parent_id).or_default().push(child_id);
        self.parent.insert(child_id, parent_id);
        if let Some(child) = self.bodies.get_mut(&child_id) {
            child.attach_joint = Some(joint_id);
        }

        self.invalidate_cache();
        Ok(joint_id)
    }

    /// Disconnect a body from its parent, destroying its primary joint
    pub fn disconnect(&mut self, child_id: BodyId) -> Result<Option<StructuralJoint>, AssemblyError> {
        let parent_id = self
            .parent
            .remove(&child_id)
            .ok_or(AssemblyError::NoParent(child_id))?;

        if let Some(children) = self.children.get_mut(&parent_id) {
            children.retain(|c| *c != child_id);
        }

        let joint = self
            .bodies
            .get(&child_id)
            .and_then(|b| b.attach_joint)
            .and_then(|joint_id| self.destroy_joint(joint_id));

        self.invalidate_cache();
        Ok(joint)
    }

    /// Add a joint; both ends must exist
    pub fn add_joint(&mut self, joint: StructuralJoint) -> Result<JointId, AssemblyError> {
        if !self.bodies.contains_key(&joint.host) {
            return Err(AssemblyError::InvalidJointReference(joint.id, joint.host));
        }
        if let Some(connected) = joint.connected
            && !self.bodies.contains_key(&connected)
        {
            return Err(AssemblyError::InvalidJointReference(joint.id, connected));
        }
        let id = joint.id;
        self.joints.insert(id, joint);
        Ok(id)
    }

    /// Destroy a joint; a missing joint is a no-op
    pub fn destroy_joint(&mut self, id: JointId) -> Option<StructuralJoint> {
        let joint = self.joints.remove(&id)?;
        if let Some(host) = self.bodies.get_mut(&joint.host)
            && host.attach_joint == Some(id)
        {
            host.attach_joint = None;
        }
        Some(joint)
    }

    /// Check if connecting parent to child would create a cycle
    fn would_create_cycle(&self, parent_id: BodyId, child_id: BodyId) -> bool {
        let mut current = Some(parent_id);
        while let Some(id) = current {
            if id == child_id {
                return true;
            }
            current = self.parent.get(&id).copied();
        }
        false
    }

    /// Update all world transforms from local offsets
    pub fn update_world_transforms(&mut self) {
        self.ensure_cache_valid();
        let order = self.cache.borrow().order.clone();
        for id in order {
            let parent_transform = self
                .parent
                .get(&id)
                .and_then(|p| self.bodies.get(p))
                .map(|p| p.world_transform)
                .unwrap_or(Mat4::IDENTITY);
            if let Some(body) = self.bodies.get_mut(&id) {
                body.world_transform = parent_transform * body.local_offset.to_mat4();
            }
        }
    }

    /// Validate the assembly
    pub fn validate(&self) -> Result<(), Vec<AssemblyError>> {
        let mut errors = Vec::new();

        for joint in self.joints.values() {
            if !self.bodies.contains_key(&joint.host) {
                errors.push(AssemblyError::InvalidJointReference(joint.id, joint.host));
            }
            if let Some(connected) = joint.connected
                && !self.bodies.contains_key(&connected)
            {
                errors.push(AssemblyError::InvalidJointReference(joint.id, connected));
            }
        }

        for (id, body) in &self.bodies {
            if let Some(joint_id) = body.attach_joint
                && !self.joints.contains_key(&joint_id)
            {
                errors.push(AssemblyError::JointNotFound(joint_id));
            }
            if body.attach_joint.is_some() && !self.parent.contains_key(id) {
                errors.push(AssemblyError::NoParent(*id));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    // ============== File IO ==============

    /// Save the assembly to a RON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AssemblyError> {
        let content = self.to_bytes()?;
        std::fs::write(path.as_ref(), content).map_err(|e| AssemblyError::Io(e.to_string()))?;
        Ok(())
    }

    /// Serialize the assembly to RON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, AssemblyError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| AssemblyError::Serialize(e.to_string()))?;
        Ok(content.into_bytes())
    }

    /// Load an assembly from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssemblyError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| AssemblyError::Io(e.to_string()))?;
        Self::load_from_bytes(content.as_bytes())
    }

    /// Load an assembly from RON bytes
    pub fn load_from_bytes(data: &[u8]) -> Result<Self, AssemblyError> {
        let content =
            std::str::from_utf8(data).map_err(|e| AssemblyError::Deserialize(e.to_string()))?;
        ron::from_str(content).map_err(|e| AssemblyError::Deserialize(e.to_string()))
    }
}

/// Assembly-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AssemblyError {
    #[error("Body not found: {0}")]
    BodyNotFound(BodyId),
    #[error("Joint not found: {0}")]
    JointNotFound(JointId),
    #[error("Connection would create a cycle")]
    WouldCreateCycle,
    #[error("Body already has a parent: {0}")]
    AlreadyHasParent(BodyId),
    #[error("Body has no parent: {0}")]
    NoParent(BodyId),
    #[error("Invalid joint reference: joint {0} references non-existent body {1}")]
    InvalidJointReference(JointId, BodyId),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}
