//! Error types shared across the crate.
//!
//! Contract violations (bad declarations, values of the wrong variant,
//! references to genes or setters that do not exist) surface as
//! [`GeneticsError`]. Structural-mutation dead-ends are not errors; the
//! mutation operators simply skip them.

use crate::config::ConfigError;

/// Errors raised while declaring, resolving, evolving or binding genomes.
#[derive(Debug, thiserror::Error)]
pub enum GeneticsError {
    /// A gene declaration or gene operation broke its contract.
    #[error("{kind} gene `{gene}` failed to {operation}: {reason}")]
    ContractViolation {
        gene: String,
        kind: &'static str,
        operation: &'static str,
        reason: String,
    },

    /// A gene name was resolved that the genome does not contain.
    #[error("gene `{0}` does not exist in this genome")]
    UnknownGene(String),

    /// A gene declares a dependency that is not part of the genome.
    #[error("gene `{gene}` depends on `{dependency}`, which is not declared")]
    MissingDependency { gene: String, dependency: String },

    /// Resolving a gene re-entered a gene already on the resolution chain.
    #[error("dependency cycle detected while resolving `{0}`")]
    DependencyCycle(String),

    /// A gene is bound to a setter that the target's registry does not define.
    #[error("gene `{gene}` is bound to setter #{setter} which `{target}` does not define")]
    UnboundSetter {
        gene: String,
        target: String,
        setter: usize,
    },

    /// A typed setter received a value of a different variant.
    #[error("setter for `{gene}` expected a {expected} value but received a {found}")]
    ValueMismatch {
        gene: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A synapse gene references a neuron gene missing from its genome.
    #[error("synapse {innovation} references neuron {neuron}, which is not in the genome")]
    DanglingSynapse { innovation: u64, neuron: u32 },

    /// Two synapse genes of one network genome carry the same innovation.
    #[error("innovation {0} appears on more than one synapse gene")]
    DuplicateInnovation(u64),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GeneticsError>;

impl GeneticsError {
    pub(crate) fn contract(
        gene: impl Into<String>,
        kind: &'static str,
        operation: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::ContractViolation {
            gene: gene.into(),
            kind,
            operation,
            reason: reason.into(),
        }
    }
}
