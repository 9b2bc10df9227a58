use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Environment;
use crate::physiology::Physiology;
use crate::tree::{AppleTree, MetamerSnapshot};

/// What one call to [`simulate_step`] produced.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    /// Sum of per-metamer gross assimilation, each floored at zero.
    pub total_assimilation: f64,
    /// Activation potential of every live metamer, in traversal order.
    pub activation_potentials: Vec<f64>,
    pub new_metamers: Vec<MetamerSnapshot>,
    /// Maintenance charged after the conservation clamp.
    pub maintenance: f64,
    pub net_assimilation: f64,
    /// Maintenance exceeded assimilation and was scaled down.
    pub maintenance_clamped: bool,
}

/// Advance `tree` by one step under `env`, mutating it in place.
pub fn simulate_step(tree: &mut AppleTree, env: &Environment) -> StepSummary {
    let physiology = Physiology::new(tree.genotype());
    let mut step = Step {
        tree,
        env,
        physiology,
        summary: StepSummary::default(),
    };
    step.hormone_phase();
    step.carbon_phase();
    step.branching_phase();

    let summary = step.summary;
    debug!(
        assimilation = summary.total_assimilation,
        maintenance = summary.maintenance,
        net = summary.net_assimilation,
        spawned = summary.new_metamers.len(),
        "simulated step"
    );
    summary
}

/// Working state threaded through the phases of a single step.
struct Step<'a> {
    tree: &'a mut AppleTree,
    env: &'a Environment,
    physiology: Physiology,
    summary: StepSummary,
}

mod phases;
