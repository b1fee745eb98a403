//! Query methods for Assembly

use super::Assembly;
use super::joint::{JointId, StructuralJoint};
use super::types::{Body, BodyId};

impl Assembly {
    // ============== Query Helpers ==============

    /// Get a body by ID
    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    /// Get a mutable body by ID
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(&id)
    }

    /// Get a joint by ID
    pub fn joint(&self, id: JointId) -> Option<&StructuralJoint> {
        self.joints.get(&id)
    }

    /// Get a mutable joint by ID
    pub fn joint_mut(&mut self, id: JointId) -> Option<&mut StructuralJoint> {
        self.joints.get_mut(&id)
    }

    /// Find a body ID by name
    pub fn find_body_by_name(&self, name: &str) -> Option<BodyId> {
        self.bodies
            .iter()
            .find(|(_, body)| body.name == name)
            .map(|(id, _)| *id)
    }

    /// Primary joint connecting a body to its parent
    pub fn primary_joint(&self, id: BodyId) -> Option<&StructuralJoint> {
        self.bodies
            .get(&id)
            .and_then(|b| b.attach_joint)
            .and_then(|joint_id| self.joints.get(&joint_id))
    }

    /// Get the parent body ID
    pub fn parent_of(&self, id: BodyId) -> Option<BodyId> {
        self.parent.get(&id).copied()
    }

    /// Get the direct children of a body
    pub fn children_of(&self, id: BodyId) -> Vec<BodyId> {
        self.children.get(&id).cloned().unwrap_or_default()
    }

    /// All root bodies (bodies without parents), in ascending order
    pub fn roots(&self) -> Vec<BodyId> {
        self.ensure_cache_valid();
        self.cache.borrow().roots.clone()
    }

    /// The root of the assembly tree
    pub fn root(&self) -> Option<BodyId> {
        self.ensure_cache_valid();
        self.cache.borrow().roots.first().copied()
    }

    /// Get the chain of body IDs from a body to the root (body first)
    pub fn chain_to_root(&self, id: BodyId) -> Vec<BodyId> {
        self.ensure_cache_valid();
        let cache = self.cache.borrow();
        match cache.ancestors.get(&id) {
            Some(ancestors) => ancestors.iter().rev().copied().collect(),
            None => vec![id],
        }
    }

    /// Get body depth from root (root = 0)
    pub fn depth(&self, id: BodyId) -> usize {
        self.ensure_cache_valid();
        self.cache.borrow().depths.get(&id).copied().unwrap_or(0)
    }

    /// Check if a body is an ancestor of another
    pub fn is_ancestor(&self, ancestor: BodyId, descendant: BodyId) -> bool {
        self.ensure_cache_valid();
        self.cache
            .borrow()
            .ancestors
            .get(&descendant)
            .is_some_and(|chain| chain.contains(&ancestor))
    }

    /// All bodies in depth-first order from every root
    pub fn bodies_depth_first(&self) -> Vec<BodyId> {
        self.ensure_cache_valid();
        self.cache.borrow().order.clone()
    }

    /// Bodies with no children, in depth-first order
    pub fn leaves(&self) -> Vec<BodyId> {
        self.bodies_depth_first()
            .into_iter()
            .filter(|id| self.children.get(id).is_none_or(|c| c.is_empty()))
            .collect()
    }

    /// Joints hosted by a body
    pub fn joints_hosted_by(&self, id: BodyId) -> Vec<&StructuralJoint> {
        self.joints.values().filter(|j| j.host == id).collect()
    }

    /// Joints connecting the unordered pair {a, b}
    pub fn joints_between(&self, a: BodyId, b: BodyId) -> Vec<&StructuralJoint> {
        self.joints.values().filter(|j| j.connects(a, b)).collect()
    }

    /// Count total number of bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Count total number of joints
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Check if assembly is empty
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Find bodies matching a predicate
    pub fn find_bodies<F>(&self, predicate: F) -> Vec<BodyId>
    where
        F: Fn(&Body) -> bool,
    {
        self.bodies
            .iter()
            .filter(|(_, body)| predicate(body))
            .map(|(id, _)| *id)
            .collect()
    }
}
