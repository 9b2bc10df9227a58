use tracing::debug;

use super::super::Step;
use crate::constants::MAINTENANCE_CLAMP_FRACTION;
use crate::metamer::MetamerId;
use crate::physiology::{compute_activation_potential, compute_photosynthesis, PhotosynthesisInputs};

impl Step<'_> {
    /// Assimilate, charge maintenance, resize stems and bank any surplus in reserves.
    pub(in crate::simulation) fn carbon_phase(&mut self) {
        let ids: Vec<MetamerId> = self.tree.active_ids();
        let supported = self.tree.supported_leaf_areas();
        let kappa = self.env.kappa.unwrap_or(self.tree.genotype().kappa);
        let apical_dominance = self.tree.genotype().apical_dominance;
        let maintenance_cost = self.tree.genotype().maintenance_cost;
        let root_cytokinin = self.tree.root_system().cytokinin_level;

        let mut assimilation = 0.0;
        let mut maintenance = 0.0;
        let mut potentials = Vec::with_capacity(ids.len());
        for &id in &ids {
            let Some(m) = self.tree.find_mut(id) else {
                continue;
            };
            let gross = compute_photosynthesis(&PhotosynthesisInputs::new(m.incident_light, self.env));
            assimilation += gross.max(0.0);
            maintenance += maintenance_cost * m.biomass_carbon;

            let direct = compute_activation_potential(
                apical_dominance,
                root_cytokinin,
                f64::from(m.order()) * m.length,
                self.env.lambda_factor,
            );
            m.activation_potential = m.activation_potential.max(direct);
            potentials.push(m.activation_potential);

            let supported_area = supported.get(&id).copied().unwrap_or(m.leaf_area);
            self.physiology.update_loads(m);
            self.physiology.update_pipe_model(m, supported_area, kappa);
            self.physiology.update_sag(m);
        }

        let clamped = maintenance > assimilation;
        if clamped {
            let limit = MAINTENANCE_CLAMP_FRACTION * assimilation;
            debug!(maintenance, assimilation, limit, "maintenance exceeds assimilation, clamping");
            maintenance = limit;
        }
        let net = assimilation - maintenance;

        if net > 0.0 && !ids.is_empty() {
            let share = net / ids.len() as f64;
            for &id in &ids {
                if let Some(m) = self.tree.find_mut(id) {
                    m.nsc_store += share;
                }
            }
        }

        self.summary.total_assimilation = assimilation;
        self.summary.activation_potentials = potentials;
        self.summary.maintenance = maintenance;
        self.summary.net_assimilation = net;
        self.summary.maintenance_clamped = clamped;
    }
}
