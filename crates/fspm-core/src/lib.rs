pub mod config;
pub mod constants;
pub mod geometry;
pub mod metamer;
pub mod physiology;
pub mod rng;
pub mod season;
pub mod simulation;
pub mod tree;

pub use config::{ConfigError, Environment, GenotypeProfile, RootSystem};
pub use metamer::{BudStatus, Metamer, MetamerId, MetamerSpec};
pub use season::{simulate_season, SeasonConfig, SeasonError, SeasonSummary};
pub use simulation::{simulate_step, StepSummary};
pub use tree::{AppleTree, MetamerSnapshot, PruneOutcome, TreeError, TreeSnapshot, TreeSpec};
