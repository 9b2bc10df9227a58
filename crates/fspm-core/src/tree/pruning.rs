use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AppleTree, TreeError};
use crate::constants::APICAL_RELEASE_FACTOR;
use crate::metamer::{BudStatus, MetamerId};

/// What a single prune call changed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PruneOutcome {
    /// Metamers newly flagged as pruned, target first.
    pub pruned: Vec<MetamerId>,
    /// Dormant buds released to Active by the prune.
    pub activated: Vec<MetamerId>,
    /// The target sat at or above the highest live order.
    pub apex_removed: bool,
    pub apical_dominance_released: bool,
}

impl AppleTree {
    /// Flag `target` and its whole subtree as pruned and release the buds it was
    /// suppressing.
    ///
    /// The parent and surviving siblings wake if Dormant; removing the apex wakes
    /// every Dormant bud; pruning a root permanently weakens apical dominance.
    /// Pruning an already-pruned metamer changes nothing.
    pub fn prune(&mut self, target: MetamerId) -> Result<PruneOutcome, TreeError> {
        let (parent_id, order, already_pruned, is_root) = {
            let m = self.get(target)?;
            (m.parent_id(), m.order(), m.is_pruned(), m.is_root())
        };
        let mut outcome = PruneOutcome::default();
        if already_pruned {
            debug!(metamer = target, "prune target already pruned");
            return Ok(outcome);
        }

        let max_live_order = self.max_live_order().unwrap_or(order);
        outcome.apex_removed = order >= max_live_order;

        for id in self.subtree_ids(target) {
            if let Some(m) = self.index.get_mut(&id) {
                if !m.is_pruned() {
                    m.mark_pruned();
                    outcome.pruned.push(id);
                }
            }
        }

        if let Some(parent_id) = parent_id {
            self.activate_if_dormant(parent_id, &mut outcome.activated);
            let siblings = self
                .index
                .get(&parent_id)
                .map(|p| p.children().to_vec())
                .unwrap_or_default();
            for sibling in siblings.into_iter().filter(|&s| s != target) {
                self.activate_if_dormant(sibling, &mut outcome.activated);
            }
        }

        if outcome.apex_removed {
            for id in self.active_ids() {
                self.activate_if_dormant(id, &mut outcome.activated);
            }
        }

        if is_root {
            outcome.apical_dominance_released = self.release_apical_dominance(target);
        }

        info!(
            metamer = target,
            pruned = outcome.pruned.len(),
            activated = outcome.activated.len(),
            apex_removed = outcome.apex_removed,
            released = outcome.apical_dominance_released,
            "pruned metamer"
        );
        Ok(outcome)
    }

    fn activate_if_dormant(&mut self, id: MetamerId, activated: &mut Vec<MetamerId>) {
        if let Some(m) = self.index.get_mut(&id) {
            if !m.is_pruned() && m.bud_status == BudStatus::Dormant {
                m.bud_status = BudStatus::Active;
                activated.push(id);
            }
        }
    }

    /// Seasonal reset: every metamer that is not Dead becomes Dormant.
    ///
    /// Returns how many statuses changed.
    pub fn apply_winter_dormancy(&mut self) -> usize {
        let mut changed = 0;
        for m in self.index.values_mut() {
            if m.bud_status != BudStatus::Dead && m.bud_status != BudStatus::Dormant {
                m.bud_status = BudStatus::Dormant;
                changed += 1;
            }
        }
        info!(changed, "applied winter dormancy");
        changed
    }

    /// Release apical dominance for every pruned root that has not released yet.
    ///
    /// Returns whether `apical_dominance` was lowered.
    pub fn apply_apical_release(&mut self) -> bool {
        let pruned_roots: Vec<MetamerId> = self
            .roots
            .iter()
            .copied()
            .filter(|id| self.index.get(id).is_some_and(|m| m.is_pruned()))
            .collect();
        let mut released = false;
        for root in pruned_roots {
            released |= self.release_apical_dominance(root);
        }
        released
    }

    fn release_apical_dominance(&mut self, root: MetamerId) -> bool {
        if !self.released_roots.insert(root) {
            return false;
        }
        let before = self.genotype.apical_dominance;
        self.genotype.apical_dominance = (before * APICAL_RELEASE_FACTOR).max(0.0);
        info!(
            root,
            before,
            after = self.genotype.apical_dominance,
            "released apical dominance"
        );
        true
    }
}
