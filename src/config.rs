//! Evolution settings.
//!
//! Every mutation-rate range and growth parameter used by the engine lives in
//! [`EvolutionConfig`], which is threaded explicitly through construction,
//! mutation and crossover calls.

use serde::{Deserialize, Serialize};

use crate::activation::Activation;

/// Invalid evolution settings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("`{field}` must be a probability in [0, 1], got {value}")]
    InvalidProbability { field: &'static str, value: f32 },

    #[error("`{field}` range is inverted: min {min} > max {max}")]
    InvertedRange {
        field: &'static str,
        min: f32,
        max: f32,
    },

    #[error("`{0}` must be positive and finite")]
    NonPositive(&'static str),

    #[error("`hidden_activations` must not be empty")]
    NoHiddenActivations,

    #[error("failed to parse evolution settings: {0}")]
    Parse(String),
}

/// Tunable parameters for genome growth and mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Probability that a disabled synapse chosen during crossover is re-enabled.
    pub global_mutation_chance: f32,
    /// Lower bound for structural (bias and IO) neuron mutation rates.
    pub min_mutation_chance: f32,
    /// Upper bound for structural (bias and IO) neuron mutation rates.
    pub max_mutation_chance: f32,
    /// Lower bound of the genome-level mutation-rate gene.
    pub min_trait_mutation_chance: f32,
    /// Upper bound of the genome-level mutation-rate gene.
    pub max_trait_mutation_chance: f32,
    /// Lower bound for regulator sensor and hidden neuron mutation rates.
    pub min_regulation_mutation_chance: f32,
    /// Upper bound for regulator sensor and hidden neuron mutation rates.
    pub max_regulation_mutation_chance: f32,
    /// Initial mutation rate of a freshly created network genome.
    pub structural_mutation_chance: f32,
    /// Number of `mutate` calls applied to a freshly wired GRN.
    pub initial_grn_mutations: usize,
    /// Probability that a regulator is left unwired from a control gene.
    pub initial_genome_connectivity: f32,
    /// Hidden neurons a GRN may hold before splits turn into reweights.
    pub max_grn_hidden: usize,
    /// Synapse weights are sampled uniformly from `[-weight_range, weight_range]`.
    pub weight_range: f32,
    /// Activation kinds a hidden neuron may mutate to.
    pub hidden_activations: Vec<Activation>,
    /// Whether individuals grow a gene regulatory network.
    pub grn_enabled: bool,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            global_mutation_chance: 0.01,
            min_mutation_chance: 0.0001,
            max_mutation_chance: 0.05,
            min_trait_mutation_chance: 0.001,
            max_trait_mutation_chance: 0.05,
            min_regulation_mutation_chance: 0.001,
            max_regulation_mutation_chance: 0.05,
            structural_mutation_chance: 0.1,
            initial_grn_mutations: 10,
            initial_genome_connectivity: 0.5,
            max_grn_hidden: 16,
            weight_range: 1.0,
            hidden_activations: Activation::HIDDEN.to_vec(),
            grn_enabled: true,
        }
    }
}

impl EvolutionConfig {
    /// Settings without gene regulatory networks; genes resolve to their stored values.
    #[must_use]
    pub fn without_grn() -> Self {
        Self {
            grn_enabled: false,
            ..Default::default()
        }
    }

    /// Parse and validate settings from JSON. Absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every probability and range is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            ("global_mutation_chance", self.global_mutation_chance),
            ("min_mutation_chance", self.min_mutation_chance),
            ("max_mutation_chance", self.max_mutation_chance),
            ("min_trait_mutation_chance", self.min_trait_mutation_chance),
            ("max_trait_mutation_chance", self.max_trait_mutation_chance),
            (
                "min_regulation_mutation_chance",
                self.min_regulation_mutation_chance,
            ),
            (
                "max_regulation_mutation_chance",
                self.max_regulation_mutation_chance,
            ),
            ("structural_mutation_chance", self.structural_mutation_chance),
            (
                "initial_genome_connectivity",
                self.initial_genome_connectivity,
            ),
        ];
        for (field, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { field, value });
            }
        }

        let ranges = [
            (
                "mutation_chance",
                self.min_mutation_chance,
                self.max_mutation_chance,
            ),
            (
                "trait_mutation_chance",
                self.min_trait_mutation_chance,
                self.max_trait_mutation_chance,
            ),
            (
                "regulation_mutation_chance",
                self.min_regulation_mutation_chance,
                self.max_regulation_mutation_chance,
            ),
        ];
        for (field, min, max) in ranges {
            if min > max {
                return Err(ConfigError::InvertedRange { field, min, max });
            }
        }

        if !(self.weight_range.is_finite() && self.weight_range > 0.0) {
            return Err(ConfigError::NonPositive("weight_range"));
        }
        if self.hidden_activations.is_empty() {
            return Err(ConfigError::NoHiddenActivations);
        }
        Ok(())
    }
}
