//! Executable gene regulatory networks.
//!
//! [`NeuralNetwork::compile`] turns a [`NetworkGenome`] into a flat array of
//! [`Neuron`]s indexed by neuron-gene id. Each neuron holds its resolved
//! inputs, the parallel weights and its last output. Evaluation visits the
//! non-sensor neurons in non-decreasing depth order and updates them in
//! place, so feed-forward signals cross the whole network in one tick while a
//! recurrent synapse reads its source's value from the previous tick.
//!
//! Inputs are stored in innovation order so the floating-point summation order
//! does not depend on the mutation history.

use std::collections::HashMap;

use tracing::debug;

use crate::activation::Activation;
use crate::error::{GeneticsError, Result};
use crate::gene::{NeuronTag, NeuronType};
use crate::network::NetworkGenome;
use crate::topology::GraphTopology;

/// One compiled neuron.
#[derive(Debug, Clone, PartialEq)]
pub struct Neuron {
    pub id: u32,
    pub neuron_type: NeuronType,
    pub activation: Activation,
    pub label: Option<String>,
    pub tags: Vec<NeuronTag>,
    /// Ids of the neurons feeding this one.
    pub inputs: Vec<u32>,
    /// Weights parallel to `inputs`.
    pub weights: Vec<f32>,
    /// Output after the last update.
    pub state: f32,
    /// Longest path from a sensor, ignoring recurrent synapses.
    pub depth: u32,
}

/// A compiled, directly executable network.
#[derive(Debug, Clone)]
pub struct NeuralNetwork {
    /// Indexed by neuron id; gaps left by ids absent from the genome are `None`.
    neurons: Vec<Option<Neuron>>,
    /// Non-sensor neuron ids sorted by `(depth, id)`.
    eval_order: Vec<u32>,
    /// Label to neuron id.
    labels: HashMap<String, u32>,
    depth: u32,
    /// Forward passes since compilation or the last reset.
    ticks: u64,
}

impl NeuralNetwork {
    /// Compile a network genome.
    ///
    /// # Errors
    ///
    /// Returns [`GeneticsError::DanglingSynapse`] if an enabled synapse gene
    /// references a neuron that is not in the genome.
    pub fn compile(genome: &NetworkGenome) -> Result<Self> {
        let size = genome.max_neuron_id().map_or(0, |id| id as usize + 1);
        let mut neurons: Vec<Option<Neuron>> = vec![None; size];
        let mut labels = HashMap::new();

        let mut enabled: Vec<_> = genome.synapses.iter().filter(|s| s.enabled).collect();
        enabled.sort_by_key(|s| s.innovation);

        // Count incoming synapses so every input array is allocated once.
        let mut in_counts = vec![0usize; size];
        for synapse in &enabled {
            for neuron in [synapse.source, synapse.dest] {
                if genome.neuron(neuron).is_none() {
                    return Err(GeneticsError::DanglingSynapse {
                        innovation: synapse.innovation,
                        neuron,
                    });
                }
            }
            in_counts[synapse.dest as usize] += 1;
        }

        for gene in genome.neurons() {
            let capacity = match gene.neuron_type {
                NeuronType::Sensor => 0,
                _ => in_counts[gene.id as usize],
            };
            if let Some(label) = &gene.label {
                labels.insert(label.clone(), gene.id);
            }
            neurons[gene.id as usize] = Some(Neuron {
                id: gene.id,
                neuron_type: gene.neuron_type,
                activation: gene.activation,
                label: gene.label.clone(),
                tags: gene.tags.clone(),
                inputs: Vec::with_capacity(capacity),
                weights: Vec::with_capacity(capacity),
                state: 0.0,
                depth: 0,
            });
        }

        for synapse in &enabled {
            if let Some(dest) = neurons[synapse.dest as usize].as_mut() {
                if dest.neuron_type != NeuronType::Sensor {
                    dest.inputs.push(synapse.source);
                    dest.weights.push(synapse.weight);
                }
            }
        }

        let topology = GraphTopology::from_genome(genome);
        let depths = topology.compute_depths();
        let mut depth = 0;
        for (idx, &d) in depths.iter().enumerate() {
            if let Some(neuron) = topology
                .neuron_id(idx)
                .and_then(|id| neurons[id as usize].as_mut())
            {
                neuron.depth = d;
                depth = depth.max(d);
            }
        }

        let mut eval_order: Vec<(u32, u32)> = neurons
            .iter()
            .flatten()
            .filter(|n| n.neuron_type != NeuronType::Sensor)
            .map(|n| (n.depth, n.id))
            .collect();
        eval_order.sort_unstable();

        debug!(
            neurons = genome.neuron_count(),
            synapses = enabled.len(),
            depth,
            "network compiled"
        );

        Ok(Self {
            neurons,
            eval_order: eval_order.into_iter().map(|(_, id)| id).collect(),
            labels,
            depth,
            ticks: 0,
        })
    }

    /// Run one forward pass over every non-sensor neuron.
    pub fn tick(&mut self) {
        for i in 0..self.eval_order.len() {
            let idx = self.eval_order[i] as usize;
            let Some(neuron) = &self.neurons[idx] else {
                continue;
            };
            let sum: f32 = neuron
                .inputs
                .iter()
                .zip(&neuron.weights)
                .map(|(&source, &weight)| self.state(source).unwrap_or(0.0) * weight)
                .sum();
            if let Some(neuron) = self.neurons[idx].as_mut() {
                neuron.state = neuron.activation.apply(sum);
            }
        }
        self.ticks += 1;
    }

    /// Push a value into the labelled sensor through its activation.
    ///
    /// Returns `false` if no sensor carries the label.
    pub fn set_input(&mut self, label: &str, value: f32) -> bool {
        let Some(&id) = self.labels.get(label) else {
            return false;
        };
        match self.neurons[id as usize].as_mut() {
            Some(neuron) if neuron.neuron_type == NeuronType::Sensor => {
                neuron.state = neuron.activation.apply(value);
                true
            }
            _ => false,
        }
    }

    /// Current value of the labelled output neuron.
    #[must_use]
    pub fn output(&self, label: &str) -> Option<f32> {
        let id = *self.labels.get(label)?;
        self.neurons[id as usize]
            .as_ref()
            .filter(|n| n.neuron_type == NeuronType::Output)
            .map(|n| n.state)
    }

    /// Current value of any neuron by id.
    #[inline]
    #[must_use]
    pub fn state(&self, id: u32) -> Option<f32> {
        self.neurons.get(id as usize)?.as_ref().map(|n| n.state)
    }

    #[must_use]
    pub fn has_sensor(&self, label: &str) -> bool {
        self.neuron_by_label(label)
            .is_some_and(|n| n.neuron_type == NeuronType::Sensor)
    }

    #[must_use]
    pub fn has_output(&self, label: &str) -> bool {
        self.neuron_by_label(label)
            .is_some_and(|n| n.neuron_type == NeuronType::Output)
    }

    #[must_use]
    pub fn neuron_by_label(&self, label: &str) -> Option<&Neuron> {
        let id = *self.labels.get(label)?;
        self.neurons[id as usize].as_ref()
    }

    /// All compiled neurons in id order.
    pub fn neurons(&self) -> impl Iterator<Item = &Neuron> + '_ {
        self.neurons.iter().flatten()
    }

    /// Length of the neuron array, i.e. the largest neuron id plus one.
    #[must_use]
    pub fn size(&self) -> usize {
        self.neurons.len()
    }

    /// Largest neuron depth.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Forward passes run since compilation or the last [`reset`](Self::reset).
    ///
    /// Outputs of a network that has never ticked hold no signal.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Zero every neuron's state.
    pub fn reset(&mut self) {
        for neuron in self.neurons.iter_mut().flatten() {
            neuron.state = 0.0;
        }
        self.ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sensors x (id 0) and y (id 1), tanh hidden h (id 2), sigmoid output (id 3).
    ///
    /// h = tanh(0.5 x - 1.5 y), out = sigmoid(2 h + 0.25 x)
    fn hand_built() -> NetworkGenome {
        let mut genome = NetworkGenome::new(0.0);
        let x = genome.add_sensor("x", Activation::Linear).id;
        let y = genome.add_sensor("y", Activation::Linear).id;
        let h = genome.add_hidden(Activation::Tanh).id;
        let out = genome.add_output("out", Activation::Sigmoid).id;
        genome.add_synapse(x, h, 0.5);
        genome.add_synapse(y, h, -1.5);
        genome.add_synapse(h, out, 2.0);
        genome.add_synapse(x, out, 0.25);
        genome
    }

    fn expected(x: f32, y: f32) -> f32 {
        let h = (0.5 * x - 1.5 * y).tanh();
        1.0 / (1.0 + (-(2.0 * h + 0.25 * x)).exp())
    }

    #[test]
    fn test_forward_pass_matches_manual_computation() {
        let mut network = NeuralNetwork::compile(&hand_built()).unwrap();
        for (x, y) in [(0.0, 0.0), (1.0, -1.0), (0.3, 0.7), (-2.0, 0.5)] {
            assert!(network.set_input("x", x));
            assert!(network.set_input("y", y));
            network.tick();
            let out = network.output("out").unwrap();
            assert!((out - expected(x, y)).abs() < 1e-5, "{out} vs {}", expected(x, y));
        }
    }

    #[test]
    fn test_array_is_indexed_by_id() {
        let network = NeuralNetwork::compile(&hand_built()).unwrap();
        assert_eq!(network.size(), 4);
        assert_eq!(network.depth(), 2);
        let h = network.neurons().find(|n| n.id == 2).unwrap();
        assert_eq!(h.inputs.len(), 2);
        assert_eq!(h.depth, 1);
    }

    #[test]
    fn test_disabled_synapses_are_not_compiled() {
        let mut genome = hand_built();
        genome.synapses[3].enabled = false;
        let mut network = NeuralNetwork::compile(&genome).unwrap();
        network.set_input("x", 1.0);
        network.set_input("y", 0.0);
        network.tick();
        let h = 0.5f32.tanh();
        let want = 1.0 / (1.0 + (-(2.0 * h)).exp());
        assert!((network.output("out").unwrap() - want).abs() < 1e-5);
    }

    #[test]
    fn test_dangling_synapse_is_an_error() {
        let mut genome = hand_built();
        genome.add_synapse(0, 42, 1.0);
        assert!(matches!(
            NeuralNetwork::compile(&genome),
            Err(GeneticsError::DanglingSynapse { neuron: 42, .. })
        ));
    }

    #[test]
    fn test_recurrent_synapse_reads_previous_tick() {
        let mut genome = NetworkGenome::new(0.0);
        let s = genome.add_sensor("s", Activation::Linear).id;
        let o = genome.add_output("o", Activation::Linear).id;
        genome.add_synapse(s, o, 1.0);
        genome.add_synapse(o, o, 0.5);
        let mut network = NeuralNetwork::compile(&genome).unwrap();

        network.set_input("s", 1.0);
        network.tick();
        assert!((network.output("o").unwrap() - 1.0).abs() < 1e-6);
        network.tick();
        assert!((network.output("o").unwrap() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_labels() {
        let mut network = NeuralNetwork::compile(&hand_built()).unwrap();
        assert!(!network.set_input("missing", 1.0));
        assert!(!network.set_input("out", 1.0));
        assert!(network.output("x").is_none());
        assert!(network.has_sensor("x"));
        assert!(network.has_output("out"));
    }

    #[test]
    fn test_sensor_activation_scales_input() {
        let mut genome = NetworkGenome::new(0.0);
        genome.add_sensor("size", Activation::Normalize { min: 0.0, max: 10.0 });
        let mut network = NeuralNetwork::compile(&genome).unwrap();
        network.set_input("size", 7.5);
        let state = network.neuron_by_label("size").unwrap().state;
        assert!((state - 0.5).abs() < 1e-6);
        network.reset();
        assert!(network.neuron_by_label("size").unwrap().state.abs() < 1e-6);
    }

    #[test]
    fn test_tick_count() {
        let mut network = NeuralNetwork::compile(&hand_built()).unwrap();
        assert_eq!(network.ticks(), 0);
        network.tick();
        network.tick();
        assert_eq!(network.ticks(), 2);
        network.reset();
        assert_eq!(network.ticks(), 0);
    }
}
