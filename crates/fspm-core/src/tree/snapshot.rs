use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::AppleTree;
use crate::config::RootSystem;
use crate::geometry::Vec3;
use crate::metamer::{BudStatus, Metamer, MetamerId};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MetamerSnapshot {
    pub id: MetamerId,
    pub parent_id: Option<MetamerId>,
    pub order: u32,
    pub length: f64,
    pub thickness: f64,
    pub angle_world: Vec3,
    pub biomass_carbon: f64,
    pub biomass_dry_weight: f64,
    pub nsc_store: f64,
    pub bud_status: BudStatus,
    pub is_pruned: bool,
    pub leaf_area: f64,
    pub incident_light: f64,
    pub children: Vec<MetamerId>,
    pub auxin_level: f64,
    pub cytokinin_level: f64,
    pub activation_potential: f64,
    pub fruit_weight: f64,
    pub leaf_weight: f64,
    pub sag_angle: f64,
}

impl From<&Metamer> for MetamerSnapshot {
    fn from(m: &Metamer) -> Self {
        Self {
            id: m.id(),
            parent_id: m.parent_id(),
            order: m.order(),
            length: m.length,
            thickness: m.thickness,
            angle_world: m.angle_world,
            biomass_carbon: m.biomass_carbon,
            biomass_dry_weight: m.biomass_dry_weight,
            nsc_store: m.nsc_store,
            bud_status: m.bud_status,
            is_pruned: m.is_pruned(),
            leaf_area: m.leaf_area,
            incident_light: m.incident_light,
            children: m.children().to_vec(),
            auxin_level: m.auxin_level,
            cytokinin_level: m.cytokinin_level,
            activation_potential: m.activation_potential,
            fruit_weight: m.fruit_weight,
            leaf_weight: m.leaf_weight,
            sag_angle: m.sag_angle,
        }
    }
}

/// Read-only projection of a whole tree for presentation layers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TreeSnapshot {
    pub genotype_params: BTreeMap<String, f64>,
    pub root_system: RootSystem,
    pub roots: Vec<MetamerId>,
    /// Every indexed metamer in depth-first order.
    pub metamers: Vec<MetamerSnapshot>,
}

impl AppleTree {
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            genotype_params: self.genotype.to_parameter_map(),
            root_system: self.root_system,
            roots: self.roots.clone(),
            metamers: self.iter_all().map(MetamerSnapshot::from).collect(),
        }
    }
}
