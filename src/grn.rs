//! Gene-regulatory wiring.
//!
//! Derives the sensors and outputs of a [`NetworkGenome`] from a genome's
//! genes and regulators. Labels tie the two together:
//!
//! | Neuron | Label | Activation |
//! |---|---|---|
//! | bias sensor | `"Bias"` | linear, fed `1.0` |
//! | noise sensor | `"Random Source"` | linear, fed uniform `[-1, 1]` |
//! | regulator sensor | regulator name | linear, fed the normalised signal |
//! | gene sensor | `"<gene>:Input"` | cyclic remap of the gene range to `[-1, 1]` |
//! | gene output | `"<gene>:Output"` | remap to the gene range, or sign for booleans |
//!
//! [`create_io`] is idempotent apart from refreshing activations, so it runs
//! again on every clone to pick up genes the network has not seen yet.

use rand::Rng;
use tracing::debug;

use crate::activation::Activation;
use crate::config::EvolutionConfig;
use crate::expression::Genome;
use crate::gene::NeuronTag;
use crate::network::{random_weight, NetworkGenome};
use crate::traits::Trait;

pub const BIAS: &str = "Bias";
pub const RANDOM_SOURCE: &str = "Random Source";

/// Label of the sensor carrying a gene's current value.
#[must_use]
pub fn input_label(gene: &str) -> String {
    format!("{gene}:Input")
}

/// Label of the output overriding a gene's value.
#[must_use]
pub fn output_label(gene: &str) -> String {
    format!("{gene}:Output")
}

/// Wire a fresh network genome for `genome` and apply the initial mutations.
#[must_use]
pub fn create_network_genome<R: Rng>(
    genome: &Genome,
    config: &EvolutionConfig,
    rng: &mut R,
) -> NetworkGenome {
    let mut network = NetworkGenome::new(config.structural_mutation_chance);
    create_io(&mut network, genome, config, rng);
    for _ in 0..config.initial_grn_mutations {
        network.mutate(config, rng);
    }
    debug!(
        type_name = genome.type_name(),
        neurons = network.neuron_count(),
        synapses = network.enabled_synapse_count(),
        "gene regulatory network created"
    );
    network
}

/// Ensure every sensor and output `genome` needs is present in `network`.
///
/// Missing gene outputs are connected from the bias sensor, or for control
/// genes from the regulator sensors. Activations of existing gene neurons are
/// refreshed, since an increment window moves with the gene's value.
pub fn create_io<R: Rng>(
    network: &mut NetworkGenome,
    genome: &Genome,
    config: &EvolutionConfig,
    rng: &mut R,
) {
    let bias = ensure_sensor(network, BIAS, NeuronTag::Bias, structural_rate(config, rng));
    ensure_sensor(
        network,
        RANDOM_SOURCE,
        NeuronTag::RandomSource,
        structural_rate(config, rng),
    );
    for name in genome.regulators().keys() {
        let rate = rng.random_range(
            config.min_regulation_mutation_chance..=config.max_regulation_mutation_chance,
        );
        ensure_sensor(network, name, NeuronTag::Regulator(name.clone()), rate);
    }

    for (name, node) in genome.genes() {
        if node.gene.is_regulated() {
            wire_gene(network, name, &node.gene, bias, config, rng);
        }
    }
}

fn structural_rate<R: Rng>(config: &EvolutionConfig, rng: &mut R) -> f32 {
    rng.random_range(config.min_mutation_chance..=config.max_mutation_chance)
}

/// Id of the sensor labelled `label`, adding it if absent.
fn ensure_sensor(network: &mut NetworkGenome, label: &str, tag: NeuronTag, rate: f32) -> u32 {
    if let Some(existing) = network.sensors.iter().find(|n| n.has_label(label)) {
        return existing.id;
    }
    let sensor = network.add_sensor(label, Activation::Linear);
    sensor.tags.push(tag);
    sensor.mutation_rate = Some(rate);
    sensor.id
}

fn wire_gene<R: Rng>(
    network: &mut NetworkGenome,
    name: &str,
    gene: &Trait,
    bias: u32,
    config: &EvolutionConfig,
    rng: &mut R,
) {
    if let Some(activation) = gene.input_activation() {
        let label = input_label(name);
        match network.neuron_by_label_mut(&label) {
            Some(sensor) => sensor.activation = activation,
            None => {
                let rate = structural_rate(config, rng);
                let sensor = network.add_sensor(label, activation);
                sensor.tags.push(NeuronTag::GeneInput(name.to_string()));
                sensor.mutation_rate = Some(rate);
            }
        }
    }

    let Some(activation) = gene.output_activation() else {
        return;
    };
    let label = output_label(name);
    if let Some(output) = network.neuron_by_label_mut(&label) {
        output.activation = activation;
        return;
    }

    let rate = rng.random_range(config.min_trait_mutation_chance..=config.max_trait_mutation_chance);
    let output = {
        let neuron = network.add_output(label, activation);
        neuron.tags.push(NeuronTag::GeneOutput(name.to_string()));
        neuron.mutation_rate = Some(rate);
        neuron.id
    };

    if gene.is_control() {
        let regulators: Vec<u32> = network
            .sensors
            .iter()
            .filter(|n| n.tags.iter().any(|t| matches!(t, NeuronTag::Regulator(_))))
            .map(|n| n.id)
            .collect();
        for regulator in regulators {
            if rng.random::<f32>() < config.initial_genome_connectivity {
                continue;
            }
            let weight = random_weight(config, rng);
            network.add_synapse(regulator, output, weight);
        }
    } else {
        let weight = random_weight(config, rng);
        network.add_synapse(bias, output, weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::GeneNode;
    use crate::gene::NeuronType;
    use crate::registry::RegulatorSpec;
    use crate::traits::{FloatTrait, IntMutation, IntegerTrait};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn genome() -> Genome {
        let mut genome = Genome::new("Cell", &EvolutionConfig::default());
        genome.add_gene("Radius", GeneNode::new(Trait::Float(FloatTrait::new(0.5, 2.0, 1.0))));
        genome.add_gene("Glowing", GeneNode::new(Trait::Boolean(true)));
        genome.add_gene(
            "Hidden",
            GeneNode::new(Trait::Float(FloatTrait {
                regulated: false,
                ..FloatTrait::new(0.0, 1.0, 0.5)
            })),
        );
        genome.add_regulator("Age", RegulatorSpec { min: 0.0, max: 100.0 });
        genome
    }

    #[test]
    fn test_io_neurons_are_created() {
        let mut network = NetworkGenome::new(0.1);
        create_io(&mut network, &genome(), &EvolutionConfig::default(), &mut test_rng());

        for label in [BIAS, RANDOM_SOURCE, "Age", "Radius:Input", "Glowing:Input"] {
            assert!(network.has_sensor(label), "missing sensor {label}");
        }
        assert!(network.has_output("Radius:Output"));
        assert!(network.has_output("Glowing:Output"));
        assert!(!network.has_output("Hidden:Output"));
        assert!(!network.has_sensor("Hidden:Input"));

        let radius = network.neuron_by_label("Radius:Output").unwrap();
        assert_eq!(radius.activation, Activation::Remap { min: 0.5, max: 2.0 });
        let glowing = network.neuron_by_label("Glowing:Output").unwrap();
        assert_eq!(glowing.activation, Activation::Sign);

        // one bias synapse per gene output
        let bias = network.neuron_by_label(BIAS).unwrap().id;
        assert_eq!(network.synapses.iter().filter(|s| s.source == bias).count(), 2);
        assert!(network.validate().is_ok());
    }

    #[test]
    fn test_create_io_is_idempotent() {
        let genome = genome();
        let config = EvolutionConfig::default();
        let mut rng = test_rng();
        let mut network = NetworkGenome::new(0.1);
        create_io(&mut network, &genome, &config, &mut rng);
        let snapshot = network.clone();
        create_io(&mut network, &genome, &config, &mut rng);
        assert_eq!(network.neuron_count(), snapshot.neuron_count());
        assert_eq!(network.synapses, snapshot.synapses);
    }

    #[test]
    fn test_new_genes_are_picked_up() {
        let mut genome = genome();
        let config = EvolutionConfig::default();
        let mut rng = test_rng();
        let mut network = NetworkGenome::new(0.1);
        create_io(&mut network, &genome, &config, &mut rng);
        genome.add_gene("Tail", GeneNode::new(Trait::Boolean(false)));
        create_io(&mut network, &genome, &config, &mut rng);
        assert!(network.has_sensor("Tail:Input"));
        assert!(network.has_output("Tail:Output"));
    }

    #[test]
    fn test_increment_window_is_refreshed() {
        let mut genome = Genome::new("Cell", &EvolutionConfig::default());
        let gene = IntegerTrait {
            method: IntMutation::IncrementAnyDir,
            max_increment: 1,
            ..IntegerTrait::new(0, 10, 5)
        };
        genome.add_gene("Legs", GeneNode::new(Trait::Integer(gene.clone())));
        let config = EvolutionConfig::default();
        let mut rng = test_rng();
        let mut network = NetworkGenome::new(0.1);
        create_io(&mut network, &genome, &config, &mut rng);
        assert_eq!(
            network.neuron_by_label("Legs:Output").unwrap().activation,
            Activation::Remap { min: 4.0, max: 6.0 }
        );

        genome.add_gene(
            "Legs",
            GeneNode::new(Trait::Integer(IntegerTrait { value: 9, ..gene })),
        );
        create_io(&mut network, &genome, &config, &mut rng);
        assert_eq!(
            network.neuron_by_label("Legs:Output").unwrap().activation,
            Activation::Remap { min: 8.0, max: 10.0 }
        );
        assert_eq!(
            network.neuron_by_label("Legs:Input").unwrap().activation,
            Activation::Normalize { min: 8.0, max: 10.0 }
        );
    }

    #[test]
    fn test_control_gene_is_wired_from_regulators_only() {
        let mut genome = Genome::new("Cell", &EvolutionConfig::default());
        genome.add_regulator("Light", RegulatorSpec { min: 0.0, max: 1.0 });
        genome.add_regulator("Heat", RegulatorSpec { min: 0.0, max: 1.0 });
        genome.add_gene(
            "Growth",
            GeneNode::new(Trait::Float(FloatTrait {
                control: true,
                ..FloatTrait::new(0.0, 1.0, 0.5)
            })),
        );
        let config = EvolutionConfig {
            initial_genome_connectivity: 0.0,
            ..Default::default()
        };
        let mut network = NetworkGenome::new(0.1);
        create_io(&mut network, &genome, &config, &mut test_rng());

        assert!(!network.has_sensor("Growth:Input"));
        let output = network.neuron_by_label("Growth:Output").unwrap().id;
        let sources: Vec<u32> = network
            .synapses
            .iter()
            .filter(|s| s.dest == output)
            .map(|s| s.source)
            .collect();
        assert_eq!(sources.len(), 2);
        for source in sources {
            let sensor = network.neuron(source).unwrap();
            assert_eq!(sensor.neuron_type, NeuronType::Sensor);
            assert!(matches!(sensor.tags[0], NeuronTag::Regulator(_)));
        }
    }

    #[test]
    fn test_network_genome_gets_initial_mutations() {
        let genome = genome();
        let quiet = EvolutionConfig {
            initial_grn_mutations: 0,
            ..Default::default()
        };
        let busy = EvolutionConfig {
            initial_grn_mutations: 50,
            structural_mutation_chance: 1.0,
            min_mutation_chance: 1.0,
            max_mutation_chance: 1.0,
            ..Default::default()
        };
        let bare = create_network_genome(&genome, &quiet, &mut test_rng());
        let grown = create_network_genome(&genome, &busy, &mut test_rng());
        assert!(grown.synapses.len() > bare.synapses.len());
        assert!(grown.validate().is_ok());
    }
}
