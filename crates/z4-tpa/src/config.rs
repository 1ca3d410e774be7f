//! Engine configuration

use serde::{Deserialize, Serialize};
use z4_arith::SmtConfig;

/// Accelerated BMC configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TpaConfig {
    /// Keep one incremental solver per power level instead of a fresh solver
    /// per query
    pub incremental_sessions: bool,
    /// Translate the invariant back to the predicates of the problem
    pub compute_witness: bool,
    /// Check initiation, consecution and safety of every invariant
    pub validate_invariant: bool,
    /// Give up with `Unknown` after this power
    pub max_power: Option<u32>,
    /// Largest power at which an exact fixed point is turned into an
    /// invariant
    pub max_invariant_power: u32,
    /// Give up after this many refinements of a single query
    pub max_retries_per_level: Option<usize>,
    /// Decision procedure limits
    pub smt: SmtConfig,
}

impl Default for TpaConfig {
    fn default() -> Self {
        Self {
            incremental_sessions: true,
            compute_witness: true,
            validate_invariant: true,
            max_power: None,
            max_invariant_power: 10,
            max_retries_per_level: None,
            smt: SmtConfig::default(),
        }
    }
}

impl TpaConfig {
    pub fn builder() -> TpaConfigBuilder {
        TpaConfigBuilder::default()
    }
}

/// Builder for [`TpaConfig`]
#[derive(Debug, Clone, Default)]
pub struct TpaConfigBuilder {
    config: TpaConfig,
}

impl TpaConfigBuilder {
    pub fn incremental_sessions(mut self, enabled: bool) -> Self {
        self.config.incremental_sessions = enabled;
        self
    }

    pub fn compute_witness(mut self, enabled: bool) -> Self {
        self.config.compute_witness = enabled;
        self
    }

    pub fn validate_invariant(mut self, enabled: bool) -> Self {
        self.config.validate_invariant = enabled;
        self
    }

    pub fn max_power(mut self, power: u32) -> Self {
        self.config.max_power = Some(power);
        self
    }

    pub fn max_invariant_power(mut self, power: u32) -> Self {
        self.config.max_invariant_power = power;
        self
    }

    pub fn max_retries_per_level(mut self, retries: usize) -> Self {
        self.config.max_retries_per_level = Some(retries);
        self
    }

    pub fn smt(mut self, smt: SmtConfig) -> Self {
        self.config.smt = smt;
        self
    }

    pub fn build(self) -> TpaConfig {
        self.config
    }
}
