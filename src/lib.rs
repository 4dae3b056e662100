//! # Symbios GRN
//!
//! Evolvable traits, gene expression functions and NEAT-style gene regulatory
//! networks for artificial-life organisms.
//!
//! ## Features
//!
//! - **Typed Genes**: bounded floats, integers with resample or increment
//!   mutation, booleans, nested sub-genomes and collections of sub-genomes,
//!   all variants of one closed [`Trait`] enum
//! - **Static Registry**: a consumer type declares its genes once through
//!   [`Evolvable::register`]; bad declarations fail when the registry is built
//! - **Gene Expression Functions**: [`Genome`] resolves genes through their
//!   dependencies and pushes changed values onto a live instance
//! - **Gene Regulatory Networks**: every regulated gene gets a sensor and an
//!   output in a [`NetworkGenome`] that grows by structural mutation and
//!   crosses over by innovation number
//! - **Depth-Ordered Phenotypes**: [`NeuralNetwork`] evaluates neurons in
//!   depth order, so recurrent synapses read the previous tick
//!
//! ## Quick Start
//!
//! ```rust
//! use symbios_grn::{EvolutionConfig, Evolvable, Individual, TraitRegistry, TraitSpec};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! #[derive(Debug, Default)]
//! struct Cell {
//!     radius: f32,
//!     flagella: i32,
//!     energy: f32,
//! }
//!
//! impl Evolvable for Cell {
//!     fn register(registry: &mut TraitRegistry<Self>) {
//!         registry
//!             .bind_float(TraitSpec::float("Radius", 0.5, 2.0), |c, v| c.radius = v)
//!             .bind_int(TraitSpec::integer("Flagella", 0, 4).can_disable(0), |c, v| c.flagella = v)
//!             .regulator("Energy", 0.0, 100.0, |c| c.energy);
//!     }
//! }
//!
//! let registry = TraitRegistry::<Cell>::build().unwrap();
//! let config = EvolutionConfig::default();
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//!
//! let mut parent = Individual::create_new(&registry, &config, &mut rng).unwrap();
//! let child = parent.asexual_clone(&registry, &config, &mut rng).unwrap();
//! parent.tick(&registry, &mut rng).unwrap();
//!
//! assert!((0.5..=2.0).contains(&child.instance().radius));
//! ```
//!
//! ## Architecture
//!
//! ### Hash-Based Innovation
//!
//! A synapse gene's innovation number is a hash of its endpoint ids and of how
//! many synapse genes for that pair already exist, so identical structural
//! mutations in related genomes align in crossover without a global counter.
//!
//! ### Index-Based Storage
//!
//! Genes live in a `SlotMap` keyed by name, neuron and synapse genes in flat
//! vectors referenced by id. No record points at another, so every clone and
//! crossover is a deep copy that shares no mutable state with its parents.

pub mod activation;
pub mod config;
pub mod error;
pub mod evolvable;
pub mod expression;
pub mod gene;
pub mod grn;
pub mod innovation;
pub mod network;
pub mod phenotype;
pub mod registry;
pub mod topology;
pub mod traits;

// Re-exports for convenience
pub use activation::Activation;
pub use config::{ConfigError, EvolutionConfig};
pub use error::{GeneticsError, Result};
pub use evolvable::{express, Evolvable, Individual};
pub use expression::{Binding, GeneKey, GeneNode, GeneRecord, Genome};
pub use gene::{NeuronGene, NeuronTag, NeuronType, SynapseGene};
pub use grn::{create_io, create_network_genome};
pub use innovation::{synapse_innovation, NeuronIdAllocator};
pub use network::NetworkGenome;
pub use phenotype::{NeuralNetwork, Neuron};
pub use registry::{GenomeSchema, RegulatorSpec, RegulatorValues, TraitKind, TraitRegistry, TraitSpec};
pub use topology::GraphTopology;
pub use traits::{IntMutation, Trait, TraitValue};
