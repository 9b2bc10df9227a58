use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{AppleTree, TreeError};
use crate::config::{GenotypeProfile, RootSystem};
use crate::metamer::{Metamer, MetamerSpec};

/// Tree construction input: a genotype (preset plus overrides), a root system
/// and the initial root metamer.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TreeSpec {
    /// Named cultivar preset to start from; defaults when absent.
    pub preset: Option<String>,
    /// Parameter overrides merged over the preset.
    pub genotype_params: BTreeMap<String, f64>,
    pub root_system: RootSystem,
    pub metamer: MetamerSpec,
}

impl TreeSpec {
    pub fn genotype(&self) -> Result<GenotypeProfile, TreeError> {
        let base = match &self.preset {
            Some(name) => GenotypeProfile::preset(name)?,
            None => GenotypeProfile::default(),
        };
        Ok(base.with_overrides(&self.genotype_params)?)
    }

    pub fn build(&self) -> Result<AppleTree, TreeError> {
        let genotype = self.genotype()?;
        let mut tree = AppleTree::new(genotype, self.root_system)?;
        if let Some(field) = self.metamer.invalid_field() {
            return Err(TreeError::InvalidMetamer {
                id: self.metamer.id,
                field,
            });
        }
        tree.add_root(Metamer::from_spec(&self.metamer))?;
        Ok(tree)
    }
}
