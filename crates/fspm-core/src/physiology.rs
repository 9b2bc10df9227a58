use std::cmp::Reverse;
use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

use crate::config::{Environment, GenotypeProfile};
use crate::constants::{
    CI_TO_CA_RATIO, EA_JMAX, EA_VCMAX, ELECTRON_TRANSPORT_CURVATURE, GAMMA_STAR, GAS_CONSTANT,
    GIBBERELLIN_PER_FRUIT_CARBON, GRAVITY, KC, KELVIN_OFFSET, KO, LEAF_ABSORPTANCE, O2,
    REFERENCE_TEMPERATURE_K, RESPIRATION_Q10, SINK_WEIGHT_FRUIT, SINK_WEIGHT_ROOT,
    SINK_WEIGHT_SHOOT, SINK_WEIGHT_STORAGE, SPECTRAL_CORRECTION,
};
use crate::metamer::{BudStatus, Metamer, MetamerId};
use crate::tree::AppleTree;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhotosynthesisInputs {
    /// Incident PAR (µmol m⁻² s⁻¹).
    pub incident_light: f64,
    pub t_leaf: f64,
    /// Ambient CO₂ (ppm).
    pub c_a: f64,
    pub vcmax25: f64,
    pub jmax25: f64,
    pub rd25: f64,
}

impl PhotosynthesisInputs {
    pub fn new(incident_light: f64, env: &Environment) -> Self {
        Self {
            incident_light,
            t_leaf: env.temperature_c,
            c_a: env.co2_ppm,
            vcmax25: env.vcmax25,
            jmax25: env.jmax25,
            rd25: env.rd25,
        }
    }
}

/// Arrhenius scaling of a 25 °C rate to `t_leaf`.
fn arrhenius(value_25: f64, activation_energy: f64, t_leaf: f64) -> f64 {
    let t_k = t_leaf + KELVIN_OFFSET;
    value_25
        * (activation_energy * (t_k - REFERENCE_TEMPERATURE_K)
            / (REFERENCE_TEMPERATURE_K * GAS_CONSTANT * t_k))
            .exp()
}

/// Smaller root of θJ² − (I₂ + Jmax)J + I₂·Jmax = 0.
fn electron_transport_rate(absorbed_light: f64, jmax: f64) -> f64 {
    let theta = ELECTRON_TRANSPORT_CURVATURE;
    let sum = absorbed_light + jmax;
    let discriminant = (sum * sum - 4.0 * theta * absorbed_light * jmax).max(0.0);
    (sum - discriminant.sqrt()) / (2.0 * theta)
}

/// Net CO₂ assimilation: min(Rubisco-limited, RuBP-limited) − respiration.
///
/// The result may be negative in darkness; callers clamp at aggregate level.
pub fn compute_photosynthesis(inputs: &PhotosynthesisInputs) -> f64 {
    let vcmax = arrhenius(inputs.vcmax25, EA_VCMAX, inputs.t_leaf);
    let jmax = arrhenius(inputs.jmax25, EA_JMAX, inputs.t_leaf);
    let rd = inputs.rd25 * RESPIRATION_Q10.powf((inputs.t_leaf - 25.0) / 10.0);

    let ci = CI_TO_CA_RATIO * inputs.c_a;
    let km = KC * (1.0 + O2 / KO);
    let a_c = vcmax * (ci - GAMMA_STAR) / (ci + km);

    let absorbed = inputs.incident_light.max(0.0) * LEAF_ABSORPTANCE * (1.0 - SPECTRAL_CORRECTION)
        / 2.0;
    let j = electron_transport_rate(absorbed, jmax);
    let a_j = j * (ci - GAMMA_STAR) / (4.0 * ci + 8.0 * GAMMA_STAR);

    a_c.min(a_j) - rd
}

/// Cytokinin / (auxin × distance + λ); zero when the denominator is not positive.
pub fn compute_activation_potential(auxin: f64, cytokinin: f64, distance: f64, lambda: f64) -> f64 {
    let denominator = auxin * distance + lambda;
    if !(denominator > 0.0) {
        return 0.0;
    }
    cytokinin / denominator
}

/// Second moment of area of a circular stem.
pub fn moment_of_inertia(thickness: f64) -> f64 {
    if !(thickness > 0.0) {
        return 0.0;
    }
    PI * thickness.powi(4) / 64.0
}

/// Small-deflection end slope of a cantilever carrying `load_mass` at its tip,
/// capped at 90°.
pub fn compute_sag_angle(load_mass: f64, length: f64, inertia: f64, elasticity: f64) -> f64 {
    if !(inertia > 0.0 && elasticity > 0.0) {
        return 0.0;
    }
    let angle = load_mass * GRAVITY * length * length / (2.0 * elasticity * inertia);
    if angle.is_nan() {
        return 0.0;
    }
    angle.clamp(0.0, FRAC_PI_2)
}

/// Raw sink demands competing for a pool of carbon.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SinkStrengths {
    pub fruit: f64,
    pub shoot: f64,
    pub root: f64,
    pub storage: f64,
}

impl SinkStrengths {
    /// Demands implied by the live tree: carried fruit, active shoots, root
    /// uptake, and reserves.
    pub fn from_tree(tree: &AppleTree) -> Self {
        let construction_cost = tree.genotype().construction_cost;
        let mut strengths = Self {
            root: tree.root_system().nitrogen_uptake,
            ..Self::default()
        };
        for m in tree.iter_active() {
            strengths.fruit += m.fruit_weight;
            strengths.storage += m.nsc_store;
            if m.bud_status == BudStatus::Active {
                strengths.shoot += construction_cost;
            }
        }
        strengths
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub fruit: f64,
    pub shoot: f64,
    pub root: f64,
    pub storage: f64,
}

impl Allocation {
    pub fn total(&self) -> f64 {
        self.fruit + self.shoot + self.root + self.storage
    }
}

/// Physiology engine configured from one genotype.
///
/// The only state it carries between calls is the gibberellin produced by the
/// last fruit allocation, read by the next flowering decision.
#[derive(Clone, Debug)]
pub struct Physiology {
    params: GenotypeProfile,
    gibberellin_level: f64,
}

impl Physiology {
    pub fn new(params: &GenotypeProfile) -> Self {
        Self {
            params: params.clone(),
            gibberellin_level: 0.0,
        }
    }

    pub fn params(&self) -> &GenotypeProfile {
        &self.params
    }

    pub fn gibberellin_level(&self) -> f64 {
        self.gibberellin_level
    }

    /// Size the stem from the leaf area it supports and derive its biomass.
    ///
    /// A non-positive supported area keeps the current thickness.
    pub fn update_pipe_model(&self, m: &mut Metamer, supported_leaf_area: f64, kappa: f64) {
        let area = kappa * supported_leaf_area;
        if area > 0.0 && area.is_finite() {
            m.thickness = 2.0 * (area / PI).sqrt();
        }
        let volume = m.cross_section() * m.length;
        m.biomass_dry_weight = volume * self.params.wood_density;
        m.biomass_carbon = m.biomass_dry_weight * self.params.carbon_fraction;
    }

    /// Recompute leaf and fruit mass carried by the metamer.
    pub fn update_loads(&self, m: &mut Metamer) {
        m.leaf_weight = m.leaf_area * self.params.leaf_mass_per_area;
        m.fruit_weight = if m.bud_status == BudStatus::Flower {
            self.params.fruit_set_weight
        } else {
            0.0
        };
    }

    pub fn update_sag(&self, m: &mut Metamer) {
        m.sag_angle = compute_sag_angle(
            m.fruit_weight + m.leaf_weight,
            m.length,
            moment_of_inertia(m.thickness),
            self.params.branch_elasticity,
        );
    }

    /// Basipetal auxin and acropetal cytokinin over the whole graph, followed by
    /// each live bud's activation potential.
    ///
    /// Auxin is accumulated tips-first: metamers are visited in decreasing order,
    /// so a child's total is final before it flows into its parent. Pruned
    /// metamers neither produce nor pass on auxin.
    pub fn transport_hormones(&self, tree: &mut AppleTree) {
        struct Visit {
            id: MetamerId,
            parent: Option<MetamerId>,
            order: u32,
            pruned: bool,
            length: f64,
            sag: f64,
        }

        let mut visits: Vec<Visit> = tree
            .iter_all()
            .map(|m| Visit {
                id: m.id(),
                parent: m.parent_id(),
                order: m.order(),
                pruned: m.is_pruned(),
                length: m.length,
                sag: m.sag_angle,
            })
            .collect();

        for v in &visits {
            if let Some(m) = tree.find_mut(v.id) {
                m.auxin_level = 0.0;
                m.cytokinin_level = 0.0;
                m.activation_potential = 0.0;
            }
        }

        // Cytokinin needs path length from the root; traversal order visits parents first.
        let max_order = tree.max_live_order().unwrap_or(0);
        let root_cytokinin = tree.root_system().cytokinin_level;
        let mut reach: HashMap<MetamerId, f64> = HashMap::with_capacity(visits.len());
        let mut distances: HashMap<MetamerId, f64> = HashMap::with_capacity(visits.len());
        for v in &visits {
            let distance = v
                .parent
                .and_then(|p| reach.get(&p).copied())
                .unwrap_or(0.0);
            reach.insert(v.id, distance + v.length);
            distances.insert(v.id, distance);
        }

        visits.sort_by_key(|v| Reverse(v.order));
        for v in &visits {
            if v.pruned {
                continue;
            }
            let auxin = match tree.find_mut(v.id) {
                Some(m) => {
                    m.auxin_level += self.params.auxin_production;
                    m.auxin_level
                }
                None => continue,
            };
            if let Some(parent) = v.parent.and_then(|p| tree.find_mut(p)) {
                let flow_factor = 1.0 / (1.0 + self.params.mechanical_auxin_slowdown * v.sag);
                parent.auxin_level += auxin * self.params.auxin_transport_efficiency * flow_factor;
            }
        }

        for v in &visits {
            if v.pruned {
                continue;
            }
            let Some(m) = tree.find_mut(v.id) else {
                continue;
            };
            let distance = distances.get(&v.id).copied().unwrap_or(0.0);
            m.cytokinin_level = root_cytokinin * (-self.params.cytokinin_decay * distance).exp();
            let apex_distance = f64::from(max_order.saturating_sub(v.order)) * v.length;
            let base = compute_activation_potential(
                m.auxin_level,
                m.cytokinin_level,
                apex_distance,
                self.params.lambda_factor,
            );
            m.activation_potential = base + self.params.activation_bias_strength * m.sag_angle;
        }
    }

    /// Split `total_carbon` across sinks in proportion to priority-weighted
    /// strength, remembering the gibberellin implied by the fruit share.
    pub fn allocate_resources(&mut self, total_carbon: f64, strengths: &SinkStrengths) -> Allocation {
        let fruit = strengths.fruit.max(0.0) * SINK_WEIGHT_FRUIT;
        let shoot = strengths.shoot.max(0.0) * SINK_WEIGHT_SHOOT;
        let root = strengths.root.max(0.0) * SINK_WEIGHT_ROOT;
        let storage = strengths.storage.max(0.0) * SINK_WEIGHT_STORAGE;
        let total_strength = fruit + shoot + root + storage;
        if !(total_strength > 0.0) || !total_carbon.is_finite() {
            self.gibberellin_level = 0.0;
            return Allocation::default();
        }
        let portion = |strength: f64| strength / total_strength * total_carbon;
        let allocation = Allocation {
            fruit: portion(fruit),
            shoot: portion(shoot),
            root: portion(root),
            storage: portion(storage),
        };
        self.gibberellin_level = allocation.fruit.max(0.0) * GIBBERELLIN_PER_FRUIT_CARBON;
        allocation
    }

    /// Baseline flowering probability lowered by gibberellin from fruit load.
    pub fn flowering_probability(&self, baseline: f64) -> f64 {
        (baseline - self.params.gibberellin_sensitivity * self.gibberellin_level).clamp(0.0, 1.0)
    }

    /// Beer-Lambert light for each live metamer, shaded by the leaf area it carries
    /// beyond itself relative to the whole live canopy.
    pub fn apply_canopy_light(&self, tree: &mut AppleTree, above_canopy_light: f64) {
        let total = tree.total_live_leaf_area();
        let supported = tree.supported_leaf_areas();
        let ids: Vec<(MetamerId, bool, f64)> = tree
            .iter_all()
            .map(|m| (m.id(), m.is_pruned(), m.leaf_area))
            .collect();
        for (id, pruned, own) in ids {
            let Some(m) = tree.find_mut(id) else {
                continue;
            };
            if pruned {
                m.incident_light = 0.0;
                continue;
            }
            let shading = if total > 0.0 {
                ((supported.get(&id).copied().unwrap_or(own) - own) / total).max(0.0)
            } else {
                0.0
            };
            m.incident_light = above_canopy_light * (-self.params.canopy_extinction * shading).exp();
        }
    }
}
