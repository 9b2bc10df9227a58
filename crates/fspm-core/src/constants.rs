/// Fraction of the step's assimilation that maintenance is scaled down to when it
/// would otherwise exceed assimilation. Tunable; no biological derivation.
pub const MAINTENANCE_CLAMP_FRACTION: f64 = 0.85;

/// Multiplier applied to `apical_dominance` when a root metamer is pruned.
pub const APICAL_RELEASE_FACTOR: f64 = 0.6;

/// Priority weights used by sink allocation (fruit > shoot > root > storage).
pub const SINK_WEIGHT_FRUIT: f64 = 4.0;
pub const SINK_WEIGHT_SHOOT: f64 = 3.0;
pub const SINK_WEIGHT_ROOT: f64 = 2.0;
pub const SINK_WEIGHT_STORAGE: f64 = 1.0;

/// Gibberellin produced per unit of carbon allocated to fruit.
pub const GIBBERELLIN_PER_FRUIT_CARBON: f64 = 0.1;

/// Threshold increase per existing child when deciding whether a bud branches again.
pub const BRANCH_ORDER_PENALTY: f64 = 0.5;

/// Threshold multiplier for buds that are already Active.
pub const ACTIVE_THRESHOLD_FACTOR: f64 = 0.8;

/// Standard gravity (m/s²), converts load mass to force for the sag model.
pub const GRAVITY: f64 = 9.81;

/// Ratio of intercellular to ambient CO₂.
pub const CI_TO_CA_RATIO: f64 = 0.7;
/// CO₂ compensation point in the absence of dark respiration (µmol/mol, 25 °C).
pub const GAMMA_STAR: f64 = 42.75;
/// Michaelis constant of Rubisco for CO₂ (µmol/mol).
pub const KC: f64 = 404.9;
/// Michaelis constant of Rubisco for O₂ (mmol/mol).
pub const KO: f64 = 278.4;
/// Intercellular O₂ partial pressure (mmol/mol).
pub const O2: f64 = 210.0;
/// Activation energies (J/mol) for the Arrhenius scaling of Vcmax and Jmax.
pub const EA_VCMAX: f64 = 65_330.0;
pub const EA_JMAX: f64 = 43_540.0;
pub const GAS_CONSTANT: f64 = 8.314;
pub const REFERENCE_TEMPERATURE_K: f64 = 298.15;
pub const KELVIN_OFFSET: f64 = 273.15;
/// Leaf absorptance and spectral correction for electron transport.
pub const LEAF_ABSORPTANCE: f64 = 0.85;
pub const SPECTRAL_CORRECTION: f64 = 0.15;
/// Curvature of the light response of electron transport.
pub const ELECTRON_TRANSPORT_CURVATURE: f64 = 0.7;
/// Respiration Q10.
pub const RESPIRATION_Q10: f64 = 2.0;

/// Upper bound on days accepted by the seasonal driver (ten years of daily steps).
pub const MAX_SEASON_DAYS: usize = 3650;
