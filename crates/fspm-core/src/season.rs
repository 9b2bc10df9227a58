use rand::Rng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, Environment};
use crate::constants::MAX_SEASON_DAYS;
use crate::metamer::{BudStatus, MetamerId};
use crate::physiology::{Physiology, SinkStrengths};
use crate::rng::create_rng;
use crate::simulation::simulate_step;
use crate::tree::{AppleTree, MetamerSnapshot};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeasonConfig {
    /// Number of daily steps.
    pub days: usize,
    /// Mean temperature of the cycle (°C).
    pub base_temperature: f64,
    /// Peak deviation from the mean (°C).
    pub seasonal_amplitude: f64,
    /// Conditions for every day; the temperature is replaced by the cycle.
    pub environment: Environment,
    /// Seed for flower induction draws.
    pub seed: u64,
    /// When set, canopy light is recomputed from this irradiance before each step.
    pub above_canopy_light: Option<f64>,
    /// Zero-based day on which buds are induced to flower.
    pub flower_induction_day: Option<usize>,
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            days: 365,
            base_temperature: 15.0,
            seasonal_amplitude: 10.0,
            environment: Environment::default(),
            seed: 42,
            above_canopy_light: None,
            flower_induction_day: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeasonError {
    #[error("season must run at least one day")]
    ZeroDays,
    #[error("season of {actual} days exceeds the maximum of {max}")]
    TooManyDays { max: usize, actual: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SeasonConfig {
    pub fn validate(&self) -> Result<(), SeasonError> {
        if self.days == 0 {
            return Err(SeasonError::ZeroDays);
        }
        if self.days > MAX_SEASON_DAYS {
            return Err(SeasonError::TooManyDays {
                max: MAX_SEASON_DAYS,
                actual: self.days,
            });
        }
        if !self.base_temperature.is_finite() {
            return Err(ConfigError::InvalidBaseTemperature.into());
        }
        if !(self.seasonal_amplitude.is_finite() && self.seasonal_amplitude >= 0.0) {
            return Err(ConfigError::InvalidSeasonalAmplitude.into());
        }
        if let Some(light) = self.above_canopy_light {
            if !(light.is_finite() && light >= 0.0) {
                return Err(ConfigError::InvalidCanopyLight.into());
            }
        }
        if let Some(day) = self.flower_induction_day {
            if day >= self.days {
                return Err(ConfigError::InvalidFlowerInductionDay {
                    day,
                    days: self.days,
                }
                .into());
            }
        }
        self.environment.validate()?;
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub total_assimilation: f64,
    pub new_metamers: Vec<MetamerSnapshot>,
    pub daily_temperature: Vec<f64>,
    pub daily_assimilation: Vec<f64>,
    pub flowers_induced: usize,
    /// Statuses changed by the closing winter dormancy.
    pub dormancy_reset: usize,
    pub apical_dominance_released: bool,
}

/// Temperature on `day` of a `days`-long sinusoidal cycle.
pub fn seasonal_temperature(day: usize, days: usize, base: f64, amplitude: f64) -> f64 {
    if days == 0 {
        return base;
    }
    let phase = 2.0 * std::f64::consts::PI * day as f64 / days as f64;
    base + amplitude * phase.sin()
}

/// Step `tree` once per day, then apply winter dormancy and the apical release check.
pub fn simulate_season(
    tree: &mut AppleTree,
    config: &SeasonConfig,
) -> Result<SeasonSummary, SeasonError> {
    config.validate()?;
    let mut rng = create_rng(config.seed);
    let mut physiology = Physiology::new(tree.genotype());
    let mut summary = SeasonSummary {
        daily_temperature: Vec::with_capacity(config.days),
        daily_assimilation: Vec::with_capacity(config.days),
        ..SeasonSummary::default()
    };

    for day in 0..config.days {
        let temperature = seasonal_temperature(
            day,
            config.days,
            config.base_temperature,
            config.seasonal_amplitude,
        );
        let env = config.environment.at_temperature(temperature);
        if let Some(light) = config.above_canopy_light {
            physiology.apply_canopy_light(tree, light);
        }

        let step = simulate_step(tree, &env);
        summary.total_assimilation += step.total_assimilation;
        summary.daily_temperature.push(temperature);
        summary.daily_assimilation.push(step.total_assimilation);
        summary.new_metamers.extend(step.new_metamers);

        if config.flower_induction_day == Some(day) {
            summary.flowers_induced =
                induce_flowering(tree, &mut physiology, step.net_assimilation, &mut rng);
        }
    }

    summary.dormancy_reset = tree.apply_winter_dormancy();
    summary.apical_dominance_released = tree.apply_apical_release();
    info!(
        days = config.days,
        assimilation = summary.total_assimilation,
        spawned = summary.new_metamers.len(),
        flowers = summary.flowers_induced,
        "season complete"
    );
    Ok(summary)
}

/// Turn childless, non-root buds into flowers with the gibberellin-adjusted
/// flowering probability. Returns how many flowered.
fn induce_flowering(
    tree: &mut AppleTree,
    physiology: &mut Physiology,
    net_assimilation: f64,
    rng: &mut ChaCha12Rng,
) -> usize {
    let strengths = SinkStrengths::from_tree(tree);
    physiology.allocate_resources(net_assimilation.max(0.0), &strengths);
    let probability = physiology.flowering_probability(tree.genotype().flower_rate);

    let candidates: Vec<MetamerId> = tree
        .iter_active()
        .filter(|m| !m.is_root() && m.children().is_empty() && m.bud_status.can_branch())
        .map(|m| m.id())
        .collect();
    let mut induced = 0;
    for id in candidates {
        // One draw per candidate keeps the stream aligned across probabilities.
        let draw: f64 = rng.random();
        if draw < probability {
            if let Some(m) = tree.find_mut(id) {
                m.bud_status = BudStatus::Flower;
                induced += 1;
            }
        }
    }
    debug!(probability, induced, gibberellin = physiology.gibberellin_level(), "induced flowering");
    induced
}
