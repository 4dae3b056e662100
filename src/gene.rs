//! Neuron and synapse genes of a gene regulatory network.
//!
//! - [`NeuronGene`]: a sensor, hidden or output neuron, identified by a small
//!   integer id that doubles as its index in the compiled network
//! - [`SynapseGene`]: a weighted edge between two neuron ids, stamped with an
//!   innovation number used to align genes during crossover

use serde::{Deserialize, Serialize};

use crate::activation::Activation;

/// The role of a neuron in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NeuronType {
    /// Receives values pushed in from outside the network.
    Sensor,
    /// Internal neuron inserted by splitting a synapse.
    Hidden,
    /// Exposes a value read back out of the network.
    Output,
}

/// Records which part of a genome a sensor or output neuron stands for.
///
/// Keys are gene or regulator names and are resolved against the live genome
/// when needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeuronTag {
    /// Constant `1.0` input.
    Bias,
    /// Fresh uniform noise in `[-1, 1]` every tick.
    RandomSource,
    /// Normalised value of a named regulator signal.
    Regulator(String),
    /// Current value of a named gene.
    GeneInput(String),
    /// Value that overrides a named gene when resolved.
    GeneOutput(String),
}

/// A neuron in the genotype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuronGene {
    /// Index of this neuron in the compiled network.
    pub id: u32,
    pub neuron_type: NeuronType,
    pub activation: Activation,
    /// Name used to push inputs and read outputs, e.g. `"Radius:Output"`.
    pub label: Option<String>,
    pub tags: Vec<NeuronTag>,
    /// Overrides the genome's mutation rate for this neuron when set.
    pub mutation_rate: Option<f32>,
}

impl NeuronGene {
    /// Create a sensor neuron.
    #[must_use]
    pub fn sensor(id: u32, label: impl Into<String>, activation: Activation) -> Self {
        Self {
            id,
            neuron_type: NeuronType::Sensor,
            activation,
            label: Some(label.into()),
            tags: Vec::new(),
            mutation_rate: None,
        }
    }

    /// Create an output neuron.
    #[must_use]
    pub fn output(id: u32, label: impl Into<String>, activation: Activation) -> Self {
        Self {
            id,
            neuron_type: NeuronType::Output,
            activation,
            label: Some(label.into()),
            tags: Vec::new(),
            mutation_rate: None,
        }
    }

    /// Create an unlabelled hidden neuron.
    #[must_use]
    pub fn hidden(id: u32, activation: Activation) -> Self {
        Self {
            id,
            neuron_type: NeuronType::Hidden,
            activation,
            label: None,
            tags: Vec::new(),
            mutation_rate: None,
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: NeuronTag) -> Self {
        self.tags.push(tag);
        self
    }

    #[must_use]
    pub fn with_mutation_rate(mut self, rate: f32) -> Self {
        self.mutation_rate = Some(rate);
        self
    }

    /// Whether this neuron carries the given label.
    #[inline]
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.label.as_deref() == Some(label)
    }
}

/// A weighted connection between two neurons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynapseGene {
    /// Structural identifier shared by equivalent synapses across a lineage.
    pub innovation: u64,
    pub source: u32,
    pub dest: u32,
    pub weight: f32,
    /// Disabled synapses are skipped by the phenotype but kept for crossover.
    pub enabled: bool,
}

impl SynapseGene {
    /// Create a new enabled synapse.
    #[must_use]
    pub fn new(innovation: u64, source: u32, dest: u32, weight: f32) -> Self {
        Self {
            innovation,
            source,
            dest,
            weight,
            enabled: true,
        }
    }

    /// Whether this synapse links `source` to `dest`.
    #[inline]
    #[must_use]
    pub fn connects(&self, source: u32, dest: u32) -> bool {
        self.source == source && self.dest == dest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neuron_gene_creation() {
        let sensor = NeuronGene::sensor(0, "Bias", Activation::Linear).with_tag(NeuronTag::Bias);
        assert_eq!(sensor.neuron_type, NeuronType::Sensor);
        assert!(sensor.has_label("Bias"));
        assert_eq!(sensor.tags, vec![NeuronTag::Bias]);

        let output = NeuronGene::output(1, "Size:Output", Activation::Sign).with_mutation_rate(0.02);
        assert_eq!(output.neuron_type, NeuronType::Output);
        assert_eq!(output.mutation_rate, Some(0.02));

        let hidden = NeuronGene::hidden(2, Activation::Tanh);
        assert_eq!(hidden.neuron_type, NeuronType::Hidden);
        assert!(hidden.label.is_none());
    }

    #[test]
    fn test_synapse_gene_creation() {
        let synapse = SynapseGene::new(100, 0, 1, 0.5);
        assert!(synapse.connects(0, 1));
        assert!(!synapse.connects(1, 0));
        assert!((synapse.weight - 0.5).abs() < 1e-6);
        assert!(synapse.enabled);
    }
}
