mod builder;
mod pruning;
mod snapshot;

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::config::{ConfigError, GenotypeProfile, RootSystem};
use crate::metamer::{Metamer, MetamerId};

pub use builder::TreeSpec;
pub use pruning::PruneOutcome;
pub use snapshot::{MetamerSnapshot, TreeSnapshot};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    #[error("metamer {0} not found")]
    NotFound(MetamerId),
    #[error("metamer id {0} is already registered")]
    DuplicateId(MetamerId),
    #[error("metamer {0} cannot be a root: roots have no parent and order 0")]
    InvalidRoot(MetamerId),
    #[error("cannot grow from pruned metamer {0}")]
    PrunedParent(MetamerId),
    #[error("metamer {id} has an invalid {field}")]
    InvalidMetamer { id: MetamerId, field: &'static str },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Metamers indexed by id. Nodes are never removed; pruning only sets a flag.
#[derive(Clone, Debug)]
pub struct AppleTree {
    genotype: GenotypeProfile,
    root_system: RootSystem,
    roots: Vec<MetamerId>,
    index: HashMap<MetamerId, Metamer>,
    next_id: MetamerId,
    /// Roots whose pruning has already released apical dominance.
    released_roots: BTreeSet<MetamerId>,
}

impl AppleTree {
    pub fn new(genotype: GenotypeProfile, root_system: RootSystem) -> Result<Self, TreeError> {
        genotype.validate()?;
        root_system.validate()?;
        Ok(Self {
            genotype,
            root_system,
            roots: Vec::new(),
            index: HashMap::new(),
            next_id: 1,
            released_roots: BTreeSet::new(),
        })
    }

    pub fn genotype(&self) -> &GenotypeProfile {
        &self.genotype
    }

    pub fn root_system(&self) -> &RootSystem {
        &self.root_system
    }

    pub fn roots(&self) -> &[MetamerId] {
        &self.roots
    }

    /// Number of indexed metamers, pruned ones included.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.index.values().filter(|m| !m.is_pruned()).count()
    }

    /// Id the next spawned metamer will receive.
    pub fn next_id(&self) -> MetamerId {
        self.next_id
    }

    pub fn add_root(&mut self, metamer: Metamer) -> Result<(), TreeError> {
        if metamer.parent_id().is_some() || metamer.order() != 0 {
            return Err(TreeError::InvalidRoot(metamer.id()));
        }
        let id = metamer.id();
        self.insert(metamer)?;
        self.roots.push(id);
        Ok(())
    }

    /// Attach `child` under `parent_id`, fixing its parent link and order.
    pub fn register_child(
        &mut self,
        parent_id: MetamerId,
        mut child: Metamer,
    ) -> Result<(), TreeError> {
        let parent_order = match self.index.get(&parent_id) {
            None => return Err(TreeError::NotFound(parent_id)),
            Some(parent) if parent.is_pruned() => return Err(TreeError::PrunedParent(parent_id)),
            Some(parent) => parent.order(),
        };
        child.attach(parent_id, parent_order + 1);
        let child_id = child.id();
        self.insert(child)?;
        if let Some(parent) = self.index.get_mut(&parent_id) {
            parent.push_child(child_id);
        }
        Ok(())
    }

    fn insert(&mut self, metamer: Metamer) -> Result<(), TreeError> {
        let id = metamer.id();
        if self.index.contains_key(&id) {
            return Err(TreeError::DuplicateId(id));
        }
        self.next_id = self.next_id.max(id.saturating_add(1));
        self.index.insert(id, metamer);
        Ok(())
    }

    /// Reserve a fresh id, or `None` once the id space is exhausted.
    pub(crate) fn allocate_id(&mut self) -> Option<MetamerId> {
        if self.next_id == MetamerId::MAX {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        Some(id)
    }

    pub fn find(&self, id: MetamerId) -> Option<&Metamer> {
        self.index.get(&id)
    }

    pub fn find_mut(&mut self, id: MetamerId) -> Option<&mut Metamer> {
        self.index.get_mut(&id)
    }

    /// Like [`find`](Self::find), but reports a missing id as [`TreeError::NotFound`].
    pub fn get(&self, id: MetamerId) -> Result<&Metamer, TreeError> {
        self.index.get(&id).ok_or(TreeError::NotFound(id))
    }

    /// Every metamer reachable from the roots, depth-first, parents before children.
    pub fn iter_all(&self) -> Iter<'_> {
        Iter {
            tree: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// [`iter_all`](Self::iter_all) restricted to unpruned metamers.
    pub fn iter_active(&self) -> impl Iterator<Item = &Metamer> + '_ {
        self.iter_all().filter(|m| !m.is_pruned())
    }

    pub fn active_ids(&self) -> Vec<MetamerId> {
        self.iter_active().map(Metamer::id).collect()
    }

    /// `id` and all of its descendants in depth-first order.
    pub fn subtree_ids(&self, id: MetamerId) -> Vec<MetamerId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(m) = self.index.get(&current) {
                out.push(current);
                stack.extend(m.children().iter().rev());
            }
        }
        out
    }

    /// Leaf area carried by `id` and its unpruned descendants.
    pub fn descendant_leaf_area(&self, id: MetamerId) -> f64 {
        self.subtree_ids(id)
            .into_iter()
            .filter_map(|sid| self.index.get(&sid))
            .filter(|m| !m.is_pruned())
            .map(|m| m.leaf_area)
            .sum()
    }

    /// [`descendant_leaf_area`](Self::descendant_leaf_area) for every metamer in one
    /// bottom-up pass.
    pub fn supported_leaf_areas(&self) -> HashMap<MetamerId, f64> {
        let mut nodes: Vec<&Metamer> = self.iter_all().collect();
        // Reversed preorder visits every child before its parent.
        nodes.reverse();
        let mut areas: HashMap<MetamerId, f64> = HashMap::with_capacity(nodes.len());
        for m in nodes {
            let own = if m.is_pruned() { 0.0 } else { m.leaf_area };
            let below: f64 = m.children().iter().filter_map(|c| areas.get(c)).sum();
            areas.insert(m.id(), own + below);
        }
        areas
    }

    pub fn total_live_leaf_area(&self) -> f64 {
        self.iter_active().map(|m| m.leaf_area).sum()
    }

    pub fn max_live_order(&self) -> Option<u32> {
        self.iter_active().map(Metamer::order).max()
    }

    /// The dominant tip: first unpruned metamer in traversal order with the highest order.
    pub fn apex(&self) -> Option<MetamerId> {
        let mut best: Option<&Metamer> = None;
        for m in self.iter_active() {
            if best.is_none_or(|b| m.order() > b.order()) {
                best = Some(m);
            }
        }
        best.map(Metamer::id)
    }
}

/// Depth-first traversal over an [`AppleTree`]. Restart by calling `iter_all` again.
pub struct Iter<'a> {
    tree: &'a AppleTree,
    stack: Vec<MetamerId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Metamer;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if let Some(m) = self.tree.index.get(&id) {
                self.stack.extend(m.children().iter().rev());
                return Some(m);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests;
