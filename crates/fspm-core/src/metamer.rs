use serde::{Deserialize, Serialize};

use crate::geometry::Vec3;

/// Stable metamer identifier. Assigned monotonically and never reused.
pub type MetamerId = u64;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BudStatus {
    #[default]
    Dormant,
    Active,
    /// Reproductive; never branches.
    Flower,
    /// Terminal; never reactivates.
    Dead,
}

impl BudStatus {
    /// Only Dormant and Active buds may spawn a new metamer.
    pub fn can_branch(self) -> bool {
        matches!(self, Self::Dormant | Self::Active)
    }
}

/// Initial descriptor for a metamer supplied at tree construction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetamerSpec {
    pub id: MetamerId,
    pub parent_id: Option<MetamerId>,
    pub order: u32,
    pub length: f64,
    pub thickness: f64,
    pub angle_world: Vec3,
    pub biomass_carbon: f64,
    pub nsc_store: f64,
    pub bud_status: BudStatus,
    pub leaf_area: f64,
    pub incident_light: f64,
}

impl Default for MetamerSpec {
    fn default() -> Self {
        Self {
            id: 1,
            parent_id: None,
            order: 0,
            length: 0.05,
            thickness: 0.4,
            angle_world: [0.0, 1.0, 0.0],
            biomass_carbon: 1.2,
            nsc_store: 4.0,
            bud_status: BudStatus::Dormant,
            leaf_area: 30.0,
            incident_light: 1200.0,
        }
    }
}

impl MetamerSpec {
    /// Name of the first field that breaks the descriptor's numeric contract.
    pub fn invalid_field(&self) -> Option<&'static str> {
        if !(self.length.is_finite() && self.length > 0.0) {
            return Some("length");
        }
        if !(self.thickness.is_finite() && self.thickness > 0.0) {
            return Some("thickness");
        }
        if !self.angle_world.iter().all(|v| v.is_finite()) {
            return Some("angle_world");
        }
        if !(self.biomass_carbon.is_finite() && self.biomass_carbon >= 0.0) {
            return Some("biomass_carbon");
        }
        if !(self.nsc_store.is_finite() && self.nsc_store >= 0.0) {
            return Some("nsc_store");
        }
        if !(self.leaf_area.is_finite() && self.leaf_area >= 0.0) {
            return Some("leaf_area");
        }
        if !(self.incident_light.is_finite() && self.incident_light >= 0.0) {
            return Some("incident_light");
        }
        None
    }
}

/// One repeated structural unit: stem segment, bud and leaf area.
///
/// Structural fields (identity, parent, order, children, prune flag) are private
/// and only change through `AppleTree`, which keeps the index and the growth-order
/// and cascade invariants consistent. Physiological fields are public and are
/// rewritten by the physiology engine every step.
#[derive(Clone, Debug, PartialEq)]
pub struct Metamer {
    id: MetamerId,
    parent_id: Option<MetamerId>,
    order: u32,
    is_pruned: bool,
    children: Vec<MetamerId>,
    pub length: f64,
    pub thickness: f64,
    pub angle_world: Vec3,
    pub biomass_carbon: f64,
    pub biomass_dry_weight: f64,
    pub nsc_store: f64,
    pub bud_status: BudStatus,
    pub leaf_area: f64,
    pub incident_light: f64,
    pub auxin_level: f64,
    pub cytokinin_level: f64,
    pub activation_potential: f64,
    pub sag_angle: f64,
    pub fruit_weight: f64,
    pub leaf_weight: f64,
}

impl Metamer {
    pub fn from_spec(spec: &MetamerSpec) -> Self {
        Self {
            id: spec.id,
            parent_id: spec.parent_id,
            order: spec.order,
            is_pruned: false,
            children: Vec::new(),
            length: spec.length,
            thickness: spec.thickness,
            angle_world: spec.angle_world,
            biomass_carbon: spec.biomass_carbon,
            biomass_dry_weight: 0.0,
            nsc_store: spec.nsc_store,
            bud_status: spec.bud_status,
            leaf_area: spec.leaf_area,
            incident_light: spec.incident_light,
            auxin_level: 0.0,
            cytokinin_level: 0.0,
            activation_potential: 0.0,
            sag_angle: 0.0,
            fruit_weight: 0.0,
            leaf_weight: 0.0,
        }
    }

    /// New Dormant bud one order above `self`, inheriting its geometry with
    /// no carbon, reserve or leaf area.
    pub fn sprout(&self, id: MetamerId, angle_world: Vec3) -> Self {
        Self {
            id,
            parent_id: Some(self.id),
            order: self.order + 1,
            is_pruned: false,
            children: Vec::new(),
            length: self.length,
            thickness: self.thickness,
            angle_world,
            biomass_carbon: 0.0,
            biomass_dry_weight: 0.0,
            nsc_store: 0.0,
            bud_status: BudStatus::Dormant,
            leaf_area: 0.0,
            incident_light: 0.0,
            auxin_level: 0.0,
            cytokinin_level: 0.0,
            activation_potential: 0.0,
            sag_angle: 0.0,
            fruit_weight: 0.0,
            leaf_weight: 0.0,
        }
    }

    pub fn id(&self) -> MetamerId {
        self.id
    }

    pub fn parent_id(&self) -> Option<MetamerId> {
        self.parent_id
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn is_pruned(&self) -> bool {
        self.is_pruned
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Child ids in branching order.
    pub fn children(&self) -> &[MetamerId] {
        &self.children
    }

    pub(crate) fn mark_pruned(&mut self) {
        self.is_pruned = true;
    }

    pub(crate) fn attach(&mut self, parent_id: MetamerId, order: u32) {
        self.parent_id = Some(parent_id);
        self.order = order;
    }

    pub(crate) fn push_child(&mut self, child: MetamerId) {
        self.children.push(child);
    }

    /// Cross-sectional area of a circular stem of this thickness.
    pub fn cross_section(&self) -> f64 {
        let radius = self.thickness * 0.5;
        std::f64::consts::PI * radius * radius
    }
}
