//! Cached tree structure for efficient traversal

use std::collections::{BTreeMap, HashMap};

use super::types::{Body, BodyId};

/// Cached tree structure for efficient traversal (computed on demand)
#[derive(Debug, Clone, Default)]
pub(super) struct TreeCache {
    /// Depth of each body (root = 0)
    pub depths: HashMap<BodyId, usize>,
    /// Pre-computed chain from the root to each body (root first)
    pub ancestors: HashMap<BodyId, Vec<BodyId>>,
    /// All bodies in depth-first order from every root
    pub order: Vec<BodyId>,
    /// Root body IDs in ascending order
    pub roots: Vec<BodyId>,
    /// Whether cache is valid
    pub valid: bool,
}

impl TreeCache {
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn rebuild(
        &mut self,
        bodies: &BTreeMap<BodyId, Body>,
        parent: &HashMap<BodyId, BodyId>,
        children: &HashMap<BodyId, Vec<BodyId>>,
    ) {
        self.depths.clear();
        self.ancestors.clear();
        self.order.clear();

        self.roots = bodies
            .keys()
            .filter(|id| !parent.contains_key(id))
            .copied()
            .collect();

        // Iterative DFS so deep chains cannot overflow the stack
        for &root_id in &self.roots {
            let mut stack = vec![(root_id, 0usize, vec![root_id])];
            while let Some((id, depth, chain)) = stack.pop() {
                self.depths.insert(id, depth);
                self.order.push(id);
                if let Some(child_list) = children.get(&id) {
                    for child_id in child_list.iter().rev() {
                        let mut child_chain = chain.clone();
                        child_chain.push(*child_id);
                        stack.push((*child_id, depth + 1, child_chain));
                    }
                }
                self.ancestors.insert(id, chain);
            }
        }

        self.valid = true;
    }
}
