use tracing::{debug, trace};

use super::super::Step;
use crate::constants::{ACTIVE_THRESHOLD_FACTOR, BRANCH_ORDER_PENALTY};
use crate::metamer::{BudStatus, MetamerId};
use crate::tree::MetamerSnapshot;

impl Step<'_> {
    /// Let buds that escape apical inhibition and can pay for it spawn one child each.
    ///
    /// Only metamers alive at the start of the phase are considered, so a new
    /// child never branches in the step that created it.
    pub(in crate::simulation) fn branching_phase(&mut self) {
        if !(self.summary.net_assimilation > 0.0) {
            return;
        }
        let Some(apex_id) = self.tree.apex() else {
            return;
        };
        let (apex_order, apex_auxin) = match self.tree.find(apex_id) {
            Some(apex) => (apex.order(), apex.auxin_level),
            None => return,
        };
        let genotype = self.tree.genotype();
        let apical_dominance = genotype.apical_dominance;
        let apical_decay = genotype.apical_decay;
        let energy_threshold = genotype.energy_threshold;
        let construction_cost = genotype.construction_cost;

        let ids: Vec<MetamerId> = self.tree.active_ids();
        for id in ids {
            let child = {
                let Some(m) = self.tree.find(id) else {
                    continue;
                };
                if !m.bud_status.can_branch() {
                    continue;
                }
                let inhibition = if id == apex_id {
                    0.0
                } else {
                    let distance = f64::from(apex_order.saturating_sub(m.order())) * m.length;
                    apex_auxin * apical_dominance * (-apical_decay * distance).exp()
                };
                let suppressed = m.activation_potential / (1.0 + inhibition);

                let mut threshold = self.env.activation_threshold
                    * (1.0 + BRANCH_ORDER_PENALTY * m.children().len() as f64);
                if m.bud_status == BudStatus::Active {
                    threshold *= ACTIVE_THRESHOLD_FACTOR;
                }
                if !(suppressed > threshold) {
                    continue;
                }
                if m.nsc_store < energy_threshold + construction_cost {
                    continue;
                }

                let angle = match &self.env.tropism {
                    Some(tropism) => tropism.direction_for(m.angle_world),
                    None => m.angle_world,
                };
                let Some(child_id) = self.tree.allocate_id() else {
                    debug!(parent = id, "metamer ids exhausted, no further branching this step");
                    break;
                };
                match self.tree.find(id) {
                    Some(parent) => parent.sprout(child_id, angle),
                    None => continue,
                }
            };

            let child_id = child.id();
            if let Err(err) = self.tree.register_child(id, child) {
                debug!(parent = id, %err, "could not register spawned metamer");
                continue;
            }
            if let Some(parent) = self.tree.find_mut(id) {
                parent.bud_status = BudStatus::Active;
                parent.nsc_store -= construction_cost;
            }
            if let Some(spawned) = self.tree.find(child_id) {
                trace!(parent = id, child = child_id, order = spawned.order(), "spawned metamer");
                self.summary.new_metamers.push(MetamerSnapshot::from(spawned));
            }
        }
    }
}
