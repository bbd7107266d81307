//! Run configuration, loadable from TOML.
//!
//! Defaults follow the values the experiments were run with: two hidden layers of two
//! nodes, 20 000 epochs at learning rate 0.5 on XOR.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    network::Topology,
    problem::Problem,
};

/// Above this many weights an uncapped scheme enumeration runs into the millions.
pub const LARGE_SCHEME_LEN: usize = 12;

/// Inclusive range of seeds swept in steps of `step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedRange {
    pub start: u64,
    pub end: u64,
    pub step: u64,
}

impl Default for SeedRange {
    fn default() -> Self {
        Self {
            start: 100,
            end: 1000,
            step: 10,
        }
    }
}

impl SeedRange {
    pub fn seeds(&self) -> impl Iterator<Item = u64> {
        (self.start..=self.end).step_by(self.step.max(1) as usize)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub problem: Problem,
    pub hidden_layers: usize,
    pub hidden_nodes: usize,
    /// One epoch trains on one freshly drawn sample.
    pub epochs: u64,
    pub alpha: f64,
    pub seed: u64,
    /// Enumerate weight-sharing schemes instead of training one unschemed network.
    pub use_schemes: bool,
    /// Run every scheme over `seeds` instead of the single `seed`.
    pub sweep: bool,
    pub seeds: SeedRange,
    /// Caps the distinct letters of enumerated schemes.
    pub max_letters: Option<usize>,
    /// Caps the number of enumerated schemes.
    pub scheme_limit: Option<usize>,
    /// Pull tied weights together at every checkpoint.
    pub pull: bool,
    pub convergence_interval: u64,
    pub convergence_threshold: f64,
    pub checkpoints: u64,
    pub to_file: bool,
    pub output_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            problem: Problem::Xor,
            hidden_layers: 2,
            hidden_nodes: 2,
            epochs: 20_000,
            alpha: 0.5,
            seed: 1230,
            use_schemes: false,
            sweep: false,
            seeds: SeedRange::default(),
            max_letters: None,
            scheme_limit: None,
            pull: true,
            convergence_interval: 10,
            convergence_threshold: 0.1,
            checkpoints: 20,
            to_file: true,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl RunConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;

        Self::from_toml(&contents)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;

        config.validate()?;

        Ok(config)
    }

    pub fn topology(&self) -> Result<Topology> {
        Topology::new(self.problem.input_len(), self.hidden_layers, self.hidden_nodes)
    }

    /// Epochs between two checkpoints.
    pub fn checkpoint_interval(&self) -> u64 {
        (self.epochs / self.checkpoints.max(1)).max(1)
    }

    pub fn validate(&self) -> Result<()> {
        self.topology()?;

        if self.epochs == 0 {
            return Err(Error::Config("epochs must be at least 1".into()));
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(Error::Config(format!(
                "alpha must be finite and > 0, got {}",
                self.alpha
            )));
        }
        if self.seeds.step == 0 || self.seeds.start > self.seeds.end {
            return Err(Error::Config(format!(
                "seed range {}..={} step {} is empty",
                self.seeds.start, self.seeds.end, self.seeds.step
            )));
        }
        if self.max_letters == Some(0) {
            return Err(Error::Config("max_letters must be at least 1".into()));
        }
        if self.convergence_interval == 0 {
            return Err(Error::Config("convergence_interval must be at least 1".into()));
        }
        if self.checkpoints == 0 {
            return Err(Error::Config("checkpoints must be at least 1".into()));
        }
        if self.use_schemes {
            self.check_scheme_cap()?;
        }

        Ok(())
    }

    /// Refuses to enumerate every scheme of a network above [`LARGE_SCHEME_LEN`] weights.
    pub fn check_scheme_cap(&self) -> Result<()> {
        let weights = self.topology()?.weight_count();

        if weights > LARGE_SCHEME_LEN && self.max_letters.is_none() && self.scheme_limit.is_none() {
            return Err(Error::Config(format!(
                "{weights} weights give too many schemes to enumerate; \
                 set max_letters or scheme_limit (--max-letters/--limit)"
            )));
        }

        Ok(())
    }
}
