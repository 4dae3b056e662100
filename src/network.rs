//! The NEAT-style genome of a gene regulatory network.
//!
//! A [`NetworkGenome`] keeps its neuron genes partitioned into sensors, hidden
//! neurons and outputs (each sorted by id) next to a flat list of synapse
//! genes. Structural mutation grows the graph one synapse or one split at a
//! time; crossover aligns synapse genes of two parents by innovation number.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::activation::Activation;
use crate::config::EvolutionConfig;
use crate::error::{GeneticsError, Result};
use crate::gene::{NeuronGene, NeuronType, SynapseGene};
use crate::innovation::{synapse_innovation, NeuronIdAllocator};
use crate::phenotype::NeuralNetwork;

/// Genotype of a gene regulatory network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkGenome {
    /// Sensor neuron genes, sorted by id.
    pub sensors: Vec<NeuronGene>,
    /// Hidden neuron genes, sorted by id.
    pub hidden: Vec<NeuronGene>,
    /// Output neuron genes, sorted by id.
    pub outputs: Vec<NeuronGene>,
    /// Synapse genes in creation order.
    pub synapses: Vec<SynapseGene>,
    /// Per-neuron probability of a structural mutation in [`mutate`](Self::mutate).
    pub mutation_rate: f32,
    ids: NeuronIdAllocator,
}

impl NetworkGenome {
    /// Create an empty genome.
    #[must_use]
    pub fn new(mutation_rate: f32) -> Self {
        Self {
            sensors: Vec::new(),
            hidden: Vec::new(),
            outputs: Vec::new(),
            synapses: Vec::new(),
            mutation_rate,
            ids: NeuronIdAllocator::default(),
        }
    }

    /// Add a labelled sensor neuron and return it for further configuration.
    pub fn add_sensor(&mut self, label: impl Into<String>, activation: Activation) -> &mut NeuronGene {
        let id = self.ids.allocate();
        self.sensors.push(NeuronGene::sensor(id, label, activation));
        let last = self.sensors.len() - 1;
        &mut self.sensors[last]
    }

    /// Add a labelled output neuron and return it for further configuration.
    pub fn add_output(&mut self, label: impl Into<String>, activation: Activation) -> &mut NeuronGene {
        let id = self.ids.allocate();
        self.outputs.push(NeuronGene::output(id, label, activation));
        let last = self.outputs.len() - 1;
        &mut self.outputs[last]
    }

    /// Add an unlabelled hidden neuron and return it for further configuration.
    pub fn add_hidden(&mut self, activation: Activation) -> &mut NeuronGene {
        let id = self.ids.allocate();
        self.hidden.push(NeuronGene::hidden(id, activation));
        let last = self.hidden.len() - 1;
        &mut self.hidden[last]
    }

    /// Append a new enabled synapse and return its innovation number.
    ///
    /// The innovation accounts for earlier synapse genes of the same pair, so a
    /// pair regrown after its synapse was disabled gets a new innovation. The
    /// occurrence starts at the pair's gene count and skips every innovation
    /// the genome already holds, since crossover can drop an older gene of the
    /// pair while keeping a newer one.
    pub fn add_synapse(&mut self, source: u32, dest: u32, weight: f32) -> u64 {
        let taken: HashSet<u64> = self
            .synapses
            .iter()
            .filter(|s| s.connects(source, dest))
            .map(|s| s.innovation)
            .collect();
        let mut occurrence = taken.len();
        while taken.contains(&synapse_innovation(source, dest, occurrence)) {
            occurrence += 1;
        }
        let innovation = synapse_innovation(source, dest, occurrence);
        self.synapses
            .push(SynapseGene::new(innovation, source, dest, weight));
        innovation
    }

    /// All neuron genes: sensors, then hidden neurons, then outputs.
    pub fn neurons(&self) -> impl Iterator<Item = &NeuronGene> + '_ {
        self.sensors
            .iter()
            .chain(self.hidden.iter())
            .chain(self.outputs.iter())
    }

    #[must_use]
    pub fn neuron_count(&self) -> usize {
        self.sensors.len() + self.hidden.len() + self.outputs.len()
    }

    #[must_use]
    pub fn enabled_synapse_count(&self) -> usize {
        self.synapses.iter().filter(|s| s.enabled).count()
    }

    /// Largest neuron id in use, if any.
    #[must_use]
    pub fn max_neuron_id(&self) -> Option<u32> {
        self.neurons().map(|n| n.id).max()
    }

    /// Look up a neuron gene by id.
    #[must_use]
    pub fn neuron(&self, id: u32) -> Option<&NeuronGene> {
        self.neurons().find(|n| n.id == id)
    }

    fn neuron_mut(&mut self, id: u32) -> Option<&mut NeuronGene> {
        self.sensors
            .iter_mut()
            .chain(self.hidden.iter_mut())
            .chain(self.outputs.iter_mut())
            .find(|n| n.id == id)
    }

    /// Look up a neuron gene by label.
    #[must_use]
    pub fn neuron_by_label(&self, label: &str) -> Option<&NeuronGene> {
        self.neurons().find(|n| n.has_label(label))
    }

    /// Mutable lookup of a neuron gene by label.
    pub fn neuron_by_label_mut(&mut self, label: &str) -> Option<&mut NeuronGene> {
        self.sensors
            .iter_mut()
            .chain(self.hidden.iter_mut())
            .chain(self.outputs.iter_mut())
            .find(|n| n.has_label(label))
    }

    #[must_use]
    pub fn has_sensor(&self, label: &str) -> bool {
        self.sensors.iter().any(|n| n.has_label(label))
    }

    #[must_use]
    pub fn has_output(&self, label: &str) -> bool {
        self.outputs.iter().any(|n| n.has_label(label))
    }

    /// Index of the enabled synapse from `source` to `dest`, if there is one.
    #[must_use]
    pub fn enabled_synapse(&self, source: u32, dest: u32) -> Option<usize> {
        self.synapses
            .iter()
            .position(|s| s.enabled && s.connects(source, dest))
    }

    /// Check that every synapse references neurons of this genome and that no
    /// two synapse genes share an innovation number.
    pub fn validate(&self) -> Result<()> {
        let ids: HashSet<u32> = self.neurons().map(|n| n.id).collect();
        let mut innovations = HashSet::with_capacity(self.synapses.len());
        for synapse in &self.synapses {
            if !innovations.insert(synapse.innovation) {
                return Err(GeneticsError::DuplicateInnovation(synapse.innovation));
            }
            for neuron in [synapse.source, synapse.dest] {
                if !ids.contains(&neuron) {
                    return Err(GeneticsError::DanglingSynapse {
                        innovation: synapse.innovation,
                        neuron,
                    });
                }
            }
        }
        Ok(())
    }

    /// Compile this genome into an executable network.
    pub fn phenotype(&self) -> Result<NeuralNetwork> {
        NeuralNetwork::compile(self)
    }

    /// Apply structural mutations.
    ///
    /// Every neuron gene present when the call starts mutates with probability
    /// equal to its own mutation rate, or the genome's rate if it has none:
    ///
    /// | Neuron | Action |
    /// |---|---|
    /// | sensor | connect to a random hidden or output neuron |
    /// | output | connect from a random sensor or hidden neuron |
    /// | hidden | 50/50: connect to a random hidden or output neuron, or change activation |
    pub fn mutate<R: Rng>(&mut self, config: &EvolutionConfig, rng: &mut R) {
        let snapshot: Vec<(u32, NeuronType, f32)> = self
            .neurons()
            .map(|n| {
                (
                    n.id,
                    n.neuron_type,
                    n.mutation_rate.unwrap_or(self.mutation_rate),
                )
            })
            .collect();

        for (id, neuron_type, rate) in snapshot {
            if rng.random::<f32>() < rate {
                self.mutate_neuron(id, neuron_type, config, rng);
            }
        }
    }

    fn mutate_neuron<R: Rng>(
        &mut self,
        id: u32,
        neuron_type: NeuronType,
        config: &EvolutionConfig,
        rng: &mut R,
    ) {
        match neuron_type {
            NeuronType::Sensor => {
                if let Some(dest) = self.random_downstream(rng) {
                    self.mutate_connection(id, dest, config, rng);
                }
            }
            NeuronType::Output => {
                if let Some(source) = self.random_upstream(rng) {
                    self.mutate_connection(source, id, config, rng);
                }
            }
            NeuronType::Hidden => {
                if rng.random::<bool>() {
                    if let Some(dest) = self.random_downstream(rng) {
                        self.mutate_connection(id, dest, config, rng);
                    }
                } else if !config.hidden_activations.is_empty() {
                    let activation = config.hidden_activations
                        [rng.random_range(0..config.hidden_activations.len())];
                    if let Some(neuron) = self.neuron_mut(id) {
                        trace!(neuron = id, ?activation, "hidden activation mutated");
                        neuron.activation = activation;
                    }
                }
            }
        }
    }

    /// A uniformly chosen hidden or output neuron id.
    fn random_downstream<R: Rng>(&self, rng: &mut R) -> Option<u32> {
        let count = self.hidden.len() + self.outputs.len();
        if count == 0 {
            return None;
        }
        let pick = rng.random_range(0..count);
        self.hidden.iter().chain(&self.outputs).nth(pick).map(|n| n.id)
    }

    /// A uniformly chosen sensor or hidden neuron id.
    fn random_upstream<R: Rng>(&self, rng: &mut R) -> Option<u32> {
        let count = self.sensors.len() + self.hidden.len();
        if count == 0 {
            return None;
        }
        let pick = rng.random_range(0..count);
        self.sensors.iter().chain(&self.hidden).nth(pick).map(|n| n.id)
    }

    /// Grow or adjust the connection from `source` to `dest`.
    ///
    /// Without an enabled synapse for the pair a new one is appended. With one,
    /// a coin flip either splits it through a new hidden neuron or resamples its
    /// weight. Splits become reweights once the hidden cap is reached.
    pub fn mutate_connection<R: Rng>(
        &mut self,
        source: u32,
        dest: u32,
        config: &EvolutionConfig,
        rng: &mut R,
    ) {
        match self.enabled_synapse(source, dest) {
            None => {
                let weight = random_weight(config, rng);
                let innovation = self.add_synapse(source, dest, weight);
                trace!(source, dest, innovation, "synapse added");
            }
            Some(index) => {
                if rng.random::<bool>() && self.hidden.len() < config.max_grn_hidden {
                    self.split_synapse(index, config, rng);
                } else {
                    self.synapses[index].weight = random_weight(config, rng);
                    trace!(
                        innovation = self.synapses[index].innovation,
                        "synapse reweighted"
                    );
                }
            }
        }
    }

    /// Insert a hidden neuron into the enabled synapse at `index`.
    ///
    /// The original synapse is disabled and kept. The new neuron receives the
    /// signal with weight 1.0 and forwards it with the original weight.
    /// Returns the new neuron's id, or `None` if the synapse is missing or disabled.
    pub fn split_synapse<R: Rng>(
        &mut self,
        index: usize,
        config: &EvolutionConfig,
        rng: &mut R,
    ) -> Option<u32> {
        let synapse = self.synapses.get_mut(index)?;
        if !synapse.enabled {
            return None;
        }
        synapse.enabled = false;
        let (source, dest, weight) = (synapse.source, synapse.dest, synapse.weight);

        let rate = rng.random_range(
            config.min_regulation_mutation_chance..=config.max_regulation_mutation_chance,
        );
        let hidden = {
            let neuron = self.add_hidden(Activation::Linear);
            neuron.mutation_rate = Some(rate);
            neuron.id
        };
        self.add_synapse(source, hidden, 1.0);
        self.add_synapse(hidden, dest, weight);
        trace!(source, dest, hidden, "synapse split");
        Some(hidden)
    }

    /// Produce a child by aligning both parents' synapse genes by innovation.
    ///
    /// - Matching genes come from either parent by coin flip. A disabled pick is
    ///   re-enabled with probability `global_mutation_chance`.
    /// - A gene found in only one parent is kept if its source is a sensor,
    ///   otherwise with probability 0.5.
    ///
    /// The child's neurons are exactly those referenced by its synapses. If two
    /// enabled synapses end up linking the same pair, only the one with the
    /// lowest innovation stays enabled.
    #[must_use]
    pub fn crossover<R: Rng>(&self, other: &Self, config: &EvolutionConfig, rng: &mut R) -> Self {
        let mine: BTreeMap<u64, &SynapseGene> =
            self.synapses.iter().map(|s| (s.innovation, s)).collect();
        let theirs: BTreeMap<u64, &SynapseGene> =
            other.synapses.iter().map(|s| (s.innovation, s)).collect();
        let innovations: BTreeSet<u64> = mine.keys().chain(theirs.keys()).copied().collect();

        let mut synapses = Vec::new();
        let mut neurons: BTreeMap<u32, NeuronGene> = BTreeMap::new();
        let mut enabled_pairs: HashSet<(u32, u32)> = HashSet::new();

        for innovation in innovations {
            let (mut gene, parent) = match (mine.get(&innovation), theirs.get(&innovation)) {
                (Some(&a), Some(&b)) => {
                    let (gene, parent) = if rng.random::<bool>() {
                        (a, self)
                    } else {
                        (b, other)
                    };
                    let mut gene = gene.clone();
                    if !gene.enabled && rng.random::<f32>() < config.global_mutation_chance {
                        gene.enabled = true;
                    }
                    (gene, parent)
                }
                (Some(&a), None) if self.keeps_disjoint(a, rng) => (a.clone(), self),
                (None, Some(&b)) if other.keeps_disjoint(b, rng) => (b.clone(), other),
                _ => continue,
            };

            let (Some(source), Some(dest)) = (parent.neuron(gene.source), parent.neuron(gene.dest))
            else {
                continue;
            };
            neurons.entry(source.id).or_insert_with(|| source.clone());
            neurons.entry(dest.id).or_insert_with(|| dest.clone());

            if gene.enabled && !enabled_pairs.insert((gene.source, gene.dest)) {
                gene.enabled = false;
            }
            synapses.push(gene);
        }

        let mut child = Self {
            mutation_rate: if rng.random::<bool>() {
                self.mutation_rate
            } else {
                other.mutation_rate
            },
            ids: NeuronIdAllocator::merged(self.ids, other.ids),
            ..Self::new(0.0)
        };
        for (_, neuron) in neurons {
            child.ids.reserve_through(neuron.id);
            match neuron.neuron_type {
                NeuronType::Sensor => child.sensors.push(neuron),
                NeuronType::Hidden => child.hidden.push(neuron),
                NeuronType::Output => child.outputs.push(neuron),
            }
        }
        child.synapses = synapses;

        debug!(
            neurons = child.neuron_count(),
            synapses = child.synapses.len(),
            enabled = child.enabled_synapse_count(),
            "network genomes crossed"
        );
        child
    }

    /// Disjoint rule: keep genes leaving a sensor, others on a coin flip.
    fn keeps_disjoint<R: Rng>(&self, gene: &SynapseGene, rng: &mut R) -> bool {
        let from_sensor = self
            .neuron(gene.source)
            .is_some_and(|n| n.neuron_type == NeuronType::Sensor);
        from_sensor || rng.random::<bool>()
    }
}

/// Uniform weight in `[-weight_range, weight_range]`.
pub(crate) fn random_weight<R: Rng>(config: &EvolutionConfig, rng: &mut R) -> f32 {
    rng.random_range(-config.weight_range..=config.weight_range)
}
