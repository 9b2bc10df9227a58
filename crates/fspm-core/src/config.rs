use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::geometry::Tropism;

/// Genotype-specific parameter bundle for one tree.
///
/// Every field has a documented default so partial JSON payloads fill in the rest.
/// The only in-simulation mutation is the apical-dominance release after a root
/// is pruned, which only ever lowers `apical_dominance`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenotypeProfile {
    /// Strength of the dominant apex's suppression of lower buds, in [0,1].
    pub apical_dominance: f64,
    /// Exponential decay of apical inhibition with distance below the apex.
    pub apical_decay: f64,
    /// Internode length of a fully extended metamer.
    pub internode_length: f64,
    /// Branching angle in radians.
    pub branching_angle: f64,
    /// Baseline flowering probability, in [0,1].
    pub flower_rate: f64,
    /// Beer-Lambert extinction coefficient used by canopy light interception.
    pub canopy_extinction: f64,
    /// Pipe-model proportionality between supported leaf area and stem cross-section.
    pub kappa: f64,
    /// Carbon cost per unit of carbon biomass per step.
    pub maintenance_cost: f64,
    /// Carbon debited from the parent's reserve to initiate a new metamer.
    pub construction_cost: f64,
    /// Reserve that must remain beyond the construction cost before a bud may branch.
    pub energy_threshold: f64,
    /// Auxin produced by every live metamer per step.
    pub auxin_production: f64,
    /// Fraction of accumulated auxin passed to the parent, in [0,1].
    pub auxin_transport_efficiency: f64,
    /// Exponential decay of root cytokinin per unit of path length from the root.
    pub cytokinin_decay: f64,
    /// Stabilizing offset in the activation-potential denominator.
    pub lambda_factor: f64,
    /// Wood density (mass per volume).
    pub wood_density: f64,
    /// Carbon fraction of dry weight, in [0,1].
    pub carbon_fraction: f64,
    /// Young's modulus of the branch wood.
    pub branch_elasticity: f64,
    /// How strongly sag slows basipetal auxin flow.
    pub mechanical_auxin_slowdown: f64,
    /// Activation bias added per radian of sag.
    pub activation_bias_strength: f64,
    /// Flowering penalty per unit of gibberellin.
    pub gibberellin_sensitivity: f64,
    /// Leaf mass per unit leaf area, for the mechanical load.
    pub leaf_mass_per_area: f64,
    /// Fruit mass carried by a Flower bud, for the mechanical load.
    pub fruit_set_weight: f64,
}

impl Default for GenotypeProfile {
    fn default() -> Self {
        Self {
            apical_dominance: 0.85,
            apical_decay: 2.5,
            internode_length: 0.05,
            branching_angle: 0.78,
            flower_rate: 0.4,
            canopy_extinction: 1.2,
            kappa: 0.02,
            maintenance_cost: 0.001,
            construction_cost: 0.5,
            energy_threshold: 0.2,
            auxin_production: 1.0,
            auxin_transport_efficiency: 0.8,
            cytokinin_decay: 0.5,
            lambda_factor: 0.5,
            wood_density: 600.0,
            carbon_fraction: 0.5,
            branch_elasticity: 1.0e9,
            mechanical_auxin_slowdown: 0.5,
            activation_bias_strength: 0.1,
            gibberellin_sensitivity: 0.5,
            leaf_mass_per_area: 0.1,
            fruit_set_weight: 0.2,
        }
    }
}

/// Root system of a tree instance; the source of basipetal cytokinin.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RootSystem {
    pub nitrogen_uptake: f64,
    pub cytokinin_level: f64,
}

impl Default for RootSystem {
    fn default() -> Self {
        Self {
            nitrogen_uptake: 1.2,
            cytokinin_level: 0.6,
        }
    }
}

/// Per-step environmental conditions handed to the stepper.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Environment {
    /// Leaf temperature (°C).
    pub temperature_c: f64,
    /// Ambient CO₂ (ppm).
    pub co2_ppm: f64,
    /// Maximum carboxylation rate at 25 °C.
    pub vcmax25: f64,
    /// Maximum electron transport rate at 25 °C.
    pub jmax25: f64,
    /// Dark respiration at 25 °C.
    pub rd25: f64,
    /// Activation potential a bud must clear before it may branch.
    pub activation_threshold: f64,
    /// Stabilizer for the direct apical-dominance activation estimate.
    pub lambda_factor: f64,
    /// Pipe-model kappa for this step; `None` uses the genotype's kappa.
    pub kappa: Option<f64>,
    /// When set, new metamers orient along the tropism-weighted growth direction
    /// instead of inheriting their parent's direction.
    pub tropism: Option<Tropism>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            temperature_c: 25.0,
            co2_ppm: 410.0,
            vcmax25: 80.0,
            jmax25: 150.0,
            rd25: 1.2,
            activation_threshold: 0.6,
            lambda_factor: 0.5,
            kappa: None,
            tropism: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("apical_dominance must be finite and within [0,1]")]
    InvalidApicalDominance,
    #[error("apical_decay must be finite and non-negative")]
    InvalidApicalDecay,
    #[error("internode_length must be finite and positive")]
    InvalidInternodeLength,
    #[error("branching_angle must be finite")]
    InvalidBranchingAngle,
    #[error("flower_rate must be finite and within [0,1]")]
    InvalidFlowerRate,
    #[error("canopy_extinction must be finite and non-negative")]
    InvalidCanopyExtinction,
    #[error("kappa must be finite and non-negative")]
    InvalidKappa,
    #[error("maintenance_cost must be finite and non-negative")]
    InvalidMaintenanceCost,
    #[error("construction_cost must be finite and non-negative")]
    InvalidConstructionCost,
    #[error("energy_threshold must be finite and non-negative")]
    InvalidEnergyThreshold,
    #[error("auxin_production must be finite and non-negative")]
    InvalidAuxinProduction,
    #[error("auxin_transport_efficiency must be finite and within [0,1]")]
    InvalidAuxinTransportEfficiency,
    #[error("cytokinin_decay must be finite and non-negative")]
    InvalidCytokininDecay,
    #[error("lambda_factor must be finite and non-negative")]
    InvalidLambdaFactor,
    #[error("wood_density must be finite and non-negative")]
    InvalidWoodDensity,
    #[error("carbon_fraction must be finite and within [0,1]")]
    InvalidCarbonFraction,
    #[error("branch_elasticity must be finite and non-negative")]
    InvalidBranchElasticity,
    #[error("mechanical_auxin_slowdown must be finite and non-negative")]
    InvalidMechanicalAuxinSlowdown,
    #[error("activation_bias_strength must be finite and non-negative")]
    InvalidActivationBiasStrength,
    #[error("gibberellin_sensitivity must be finite and non-negative")]
    InvalidGibberellinSensitivity,
    #[error("leaf_mass_per_area must be finite and non-negative")]
    InvalidLeafMassPerArea,
    #[error("fruit_set_weight must be finite and non-negative")]
    InvalidFruitSetWeight,
    #[error("nitrogen_uptake must be finite and non-negative")]
    InvalidNitrogenUptake,
    #[error("root cytokinin_level must be finite and non-negative")]
    InvalidRootCytokinin,
    #[error("temperature_c must be finite")]
    InvalidTemperature,
    #[error("co2_ppm must be finite and non-negative")]
    InvalidCo2,
    #[error("vcmax25 must be finite and non-negative")]
    InvalidVcmax25,
    #[error("jmax25 must be finite and non-negative")]
    InvalidJmax25,
    #[error("rd25 must be finite and non-negative")]
    InvalidRd25,
    #[error("activation_threshold must be finite and non-negative")]
    InvalidActivationThreshold,
    #[error("environment lambda_factor must be finite and non-negative")]
    InvalidEnvironmentLambda,
    #[error("environment kappa must be finite and non-negative when set")]
    InvalidEnvironmentKappa,
    #[error("tropism vectors and weights must be finite")]
    InvalidTropism,
    #[error("base_temperature_c must be finite")]
    InvalidBaseTemperature,
    #[error("seasonal_amplitude_c must be finite and non-negative")]
    InvalidSeasonalAmplitude,
    #[error("above_canopy_light must be finite and non-negative when set")]
    InvalidCanopyLight,
    #[error("flower_induction_day ({day}) must be before the end of the run ({days} days)")]
    InvalidFlowerInductionDay { day: usize, days: usize },
    #[error("unknown genotype parameter: {name}")]
    UnknownParameter { name: String },
    #[error("override for {name} must be finite")]
    InvalidOverrideValue { name: String },
    #[error("unknown genotype preset: {name}")]
    UnknownPreset { name: String },
    #[error("failed to encode genotype parameters: {0}")]
    Encoding(String),
}

impl GenotypeProfile {
    pub const PRESETS: [&'static str; 2] = ["fuji", "orin"];

    /// Named cultivar preset. Unlisted fields keep their defaults.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "fuji" => Ok(Self {
                apical_dominance: 0.85,
                internode_length: 0.05,
                branching_angle: 0.78,
                flower_rate: 0.4,
                ..Self::default()
            }),
            "orin" => Ok(Self {
                apical_dominance: 0.65,
                internode_length: 0.04,
                branching_angle: 1.22,
                flower_rate: 0.7,
                ..Self::default()
            }),
            _ => Err(ConfigError::UnknownPreset {
                name: name.to_string(),
            }),
        }
    }

    /// Merge name→value overrides over this profile and validate the result.
    ///
    /// This is the only place a generic parameter mapping is accepted; the engine
    /// itself reads typed fields.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, f64>) -> Result<Self, ConfigError> {
        let mut fields = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(ConfigError::Encoding(
                    "genotype profile did not encode as an object".to_string(),
                ))
            }
            Err(e) => return Err(ConfigError::Encoding(e.to_string())),
        };
        for (name, &value) in overrides {
            if !value.is_finite() {
                return Err(ConfigError::InvalidOverrideValue { name: name.clone() });
            }
            match fields.get_mut(name) {
                Some(slot) => *slot = Value::from(value),
                None => return Err(ConfigError::UnknownParameter { name: name.clone() }),
            }
        }
        let profile: Self = serde_json::from_value(Value::Object(fields))
            .map_err(|e| ConfigError::Encoding(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Flat name→value view of every parameter, as exposed in snapshots.
    pub fn to_parameter_map(&self) -> BTreeMap<String, f64> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map
                .into_iter()
                .filter_map(|(name, value)| value.as_f64().map(|v| (name, v)))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_architecture()?;
        self.validate_carbon()?;
        self.validate_hormones()?;
        self.validate_mechanics()?;
        Ok(())
    }

    fn validate_architecture(&self) -> Result<(), ConfigError> {
        if !(self.apical_dominance.is_finite() && (0.0..=1.0).contains(&self.apical_dominance)) {
            return Err(ConfigError::InvalidApicalDominance);
        }
        if !(self.apical_decay.is_finite() && self.apical_decay >= 0.0) {
            return Err(ConfigError::InvalidApicalDecay);
        }
        if !(self.internode_length.is_finite() && self.internode_length > 0.0) {
            return Err(ConfigError::InvalidInternodeLength);
        }
        if !self.branching_angle.is_finite() {
            return Err(ConfigError::InvalidBranchingAngle);
        }
        if !(self.flower_rate.is_finite() && (0.0..=1.0).contains(&self.flower_rate)) {
            return Err(ConfigError::InvalidFlowerRate);
        }
        if !(self.canopy_extinction.is_finite() && self.canopy_extinction >= 0.0) {
            return Err(ConfigError::InvalidCanopyExtinction);
        }
        if !(self.kappa.is_finite() && self.kappa >= 0.0) {
            return Err(ConfigError::InvalidKappa);
        }
        Ok(())
    }

    fn validate_carbon(&self) -> Result<(), ConfigError> {
        if !(self.maintenance_cost.is_finite() && self.maintenance_cost >= 0.0) {
            return Err(ConfigError::InvalidMaintenanceCost);
        }
        if !(self.construction_cost.is_finite() && self.construction_cost >= 0.0) {
            return Err(ConfigError::InvalidConstructionCost);
        }
        if !(self.energy_threshold.is_finite() && self.energy_threshold >= 0.0) {
            return Err(ConfigError::InvalidEnergyThreshold);
        }
        if !(self.wood_density.is_finite() && self.wood_density >= 0.0) {
            return Err(ConfigError::InvalidWoodDensity);
        }
        if !(self.carbon_fraction.is_finite() && (0.0..=1.0).contains(&self.carbon_fraction)) {
            return Err(ConfigError::InvalidCarbonFraction);
        }
        Ok(())
    }

    fn validate_hormones(&self) -> Result<(), ConfigError> {
        if !(self.auxin_production.is_finite() && self.auxin_production >= 0.0) {
            return Err(ConfigError::InvalidAuxinProduction);
        }
        if !(self.auxin_transport_efficiency.is_finite()
            && (0.0..=1.0).contains(&self.auxin_transport_efficiency))
        {
            return Err(ConfigError::InvalidAuxinTransportEfficiency);
        }
        if !(self.cytokinin_decay.is_finite() && self.cytokinin_decay >= 0.0) {
            return Err(ConfigError::InvalidCytokininDecay);
        }
        if !(self.lambda_factor.is_finite() && self.lambda_factor >= 0.0) {
            return Err(ConfigError::InvalidLambdaFactor);
        }
        if !(self.activation_bias_strength.is_finite() && self.activation_bias_strength >= 0.0) {
            return Err(ConfigError::InvalidActivationBiasStrength);
        }
        if !(self.gibberellin_sensitivity.is_finite() && self.gibberellin_sensitivity >= 0.0) {
            return Err(ConfigError::InvalidGibberellinSensitivity);
        }
        Ok(())
    }

    fn validate_mechanics(&self) -> Result<(), ConfigError> {
        if !(self.branch_elasticity.is_finite() && self.branch_elasticity >= 0.0) {
            return Err(ConfigError::InvalidBranchElasticity);
        }
        if !(self.mechanical_auxin_slowdown.is_finite() && self.mechanical_auxin_slowdown >= 0.0)
        {
            return Err(ConfigError::InvalidMechanicalAuxinSlowdown);
        }
        if !(self.leaf_mass_per_area.is_finite() && self.leaf_mass_per_area >= 0.0) {
            return Err(ConfigError::InvalidLeafMassPerArea);
        }
        if !(self.fruit_set_weight.is_finite() && self.fruit_set_weight >= 0.0) {
            return Err(ConfigError::InvalidFruitSetWeight);
        }
        Ok(())
    }
}

impl RootSystem {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.nitrogen_uptake.is_finite() && self.nitrogen_uptake >= 0.0) {
            return Err(ConfigError::InvalidNitrogenUptake);
        }
        if !(self.cytokinin_level.is_finite() && self.cytokinin_level >= 0.0) {
            return Err(ConfigError::InvalidRootCytokinin);
        }
        Ok(())
    }
}

impl Environment {
    /// Same conditions at a different temperature.
    pub fn at_temperature(&self, temperature_c: f64) -> Self {
        Self {
            temperature_c,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.temperature_c.is_finite() {
            return Err(ConfigError::InvalidTemperature);
        }
        if !(self.co2_ppm.is_finite() && self.co2_ppm >= 0.0) {
            return Err(ConfigError::InvalidCo2);
        }
        if !(self.vcmax25.is_finite() && self.vcmax25 >= 0.0) {
            return Err(ConfigError::InvalidVcmax25);
        }
        if !(self.jmax25.is_finite() && self.jmax25 >= 0.0) {
            return Err(ConfigError::InvalidJmax25);
        }
        if !(self.rd25.is_finite() && self.rd25 >= 0.0) {
            return Err(ConfigError::InvalidRd25);
        }
        if !(self.activation_threshold.is_finite() && self.activation_threshold >= 0.0) {
            return Err(ConfigError::InvalidActivationThreshold);
        }
        if !(self.lambda_factor.is_finite() && self.lambda_factor >= 0.0) {
            return Err(ConfigError::InvalidEnvironmentLambda);
        }
        if let Some(kappa) = self.kappa {
            if !(kappa.is_finite() && kappa >= 0.0) {
                return Err(ConfigError::InvalidEnvironmentKappa);
            }
        }
        if let Some(tropism) = &self.tropism {
            if !tropism.is_finite() {
                return Err(ConfigError::InvalidTropism);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_defaults() {
        assert!(GenotypeProfile::default().validate().is_ok());
        assert!(RootSystem::default().validate().is_ok());
        assert!(Environment::default().validate().is_ok());
    }

    #[test]
    fn presets_are_valid_and_distinct() {
        for name in GenotypeProfile::PRESETS {
            let profile = GenotypeProfile::preset(name).expect("preset should exist");
            assert!(profile.validate().is_ok(), "{name} should validate");
        }
        let orin = GenotypeProfile::preset("orin").unwrap();
        assert_eq!(orin.apical_dominance, 0.65);
        assert_eq!(orin.flower_rate, 0.7);
        assert_eq!(orin.construction_cost, GenotypeProfile::default().construction_cost);
    }

    #[test]
    fn preset_rejects_unknown_name() {
        assert_eq!(
            GenotypeProfile::preset("gala"),
            Err(ConfigError::UnknownPreset {
                name: "gala".to_string()
            })
        );
    }

    #[test]
    fn validate_rejects_out_of_range_apical_dominance() {
        let profile = GenotypeProfile {
            apical_dominance: 1.5,
            ..GenotypeProfile::default()
        };
        assert_eq!(profile.validate(), Err(ConfigError::InvalidApicalDominance));

        let profile = GenotypeProfile {
            apical_dominance: f64::NAN,
            ..GenotypeProfile::default()
        };
        assert_eq!(profile.validate(), Err(ConfigError::InvalidApicalDominance));
    }

    #[test]
    fn validate_rejects_non_positive_internode_length() {
        let profile = GenotypeProfile {
            internode_length: 0.0,
            ..GenotypeProfile::default()
        };
        assert_eq!(profile.validate(), Err(ConfigError::InvalidInternodeLength));
    }

    #[test]
    fn overrides_merge_over_defaults() {
        let mut overrides = BTreeMap::new();
        overrides.insert("construction_cost".to_string(), 0.25);
        overrides.insert("apical_dominance".to_string(), 0.1);
        let profile = GenotypeProfile::default()
            .with_overrides(&overrides)
            .expect("known overrides should merge");
        assert_eq!(profile.construction_cost, 0.25);
        assert_eq!(profile.apical_dominance, 0.1);
        assert_eq!(profile.apical_decay, GenotypeProfile::default().apical_decay);
    }

    #[test]
    fn overrides_reject_unknown_names_and_invalid_values() {
        let mut overrides = BTreeMap::new();
        overrides.insert("leaf_colour".to_string(), 1.0);
        assert_eq!(
            GenotypeProfile::default().with_overrides(&overrides),
            Err(ConfigError::UnknownParameter {
                name: "leaf_colour".to_string()
            })
        );

        let mut overrides = BTreeMap::new();
        overrides.insert("flower_rate".to_string(), 2.0);
        assert_eq!(
            GenotypeProfile::default().with_overrides(&overrides),
            Err(ConfigError::InvalidFlowerRate)
        );

        let mut overrides = BTreeMap::new();
        overrides.insert("kappa".to_string(), f64::INFINITY);
        assert!(matches!(
            GenotypeProfile::default().with_overrides(&overrides),
            Err(ConfigError::InvalidOverrideValue { .. })
        ));
    }

    #[test]
    fn parameter_map_lists_every_field() {
        let map = GenotypeProfile::default().to_parameter_map();
        assert_eq!(map.get("apical_dominance"), Some(&0.85));
        assert_eq!(map.get("energy_threshold"), Some(&0.2));
        assert_eq!(map.len(), 22);
    }

    #[test]
    fn partial_genotype_json_deserializes_with_defaults() {
        let json = r#"{ "apical_dominance": 0.1, "kappa": 0.02 }"#;
        let profile: GenotypeProfile = serde_json::from_str(json).expect("partial json should parse");
        assert_eq!(profile.apical_dominance, 0.1);
        assert_eq!(profile.construction_cost, 0.5);
        assert_eq!(profile.energy_threshold, 0.2);
    }

    #[test]
    fn partial_environment_json_deserializes_with_defaults() {
        let json = r#"{ "temperature_c": 12.5 }"#;
        let env: Environment = serde_json::from_str(json).expect("partial json should parse");
        assert_eq!(env.temperature_c, 12.5);
        assert_eq!(env.co2_ppm, 410.0);
        assert_eq!(env.activation_threshold, 0.6);
        assert!(env.kappa.is_none());
        assert!(env.tropism.is_none());
    }

    #[test]
    fn environment_validate_rejects_negative_kappa() {
        let env = Environment {
            kappa: Some(-0.1),
            ..Environment::default()
        };
        assert_eq!(env.validate(), Err(ConfigError::InvalidEnvironmentKappa));
    }

    #[test]
    fn at_temperature_keeps_other_fields() {
        let env = Environment {
            co2_ppm: 600.0,
            ..Environment::default()
        };
        let cold = env.at_temperature(-3.0);
        assert_eq!(cold.temperature_c, -3.0);
        assert_eq!(cold.co2_ppm, 600.0);
    }
}
