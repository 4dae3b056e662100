//! Gene expression functions.
//!
//! A [`Genome`] is a named collection of [`GeneNode`]s stored in a
//! [`SlotMap`] and indexed by gene name. Nodes reference their dependencies
//! by name, so cloning a genome is a plain deep copy and no node ever points
//! at another genome's state.
//!
//! Resolution walks dependencies recursively without memoisation. When a
//! compiled GRN declares an output for a gene, that output overrides the
//! stored value unless the gene is disabled. A network that has not ticked
//! since it was compiled overrides nothing.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, warn};

use crate::config::EvolutionConfig;
use crate::error::{GeneticsError, Result};
use crate::grn::{self, input_label, output_label, BIAS, RANDOM_SOURCE};
use crate::network::NetworkGenome;
use crate::phenotype::NeuralNetwork;
use crate::registry::{RegulatorSpec, RegulatorValues, TraitRegistry};
use crate::traits::{
    disable_gene_name, disabled_flag_string, Dependencies, FloatTrait, Trait, TraitValue,
};

new_key_type! {
    /// Stable handle of a gene node inside one genome.
    pub struct GeneKey;
}

/// Where a resolved gene value is pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Type name of the instance the setter belongs to.
    pub target: String,
    /// Index into that type's registry setters.
    pub setter: usize,
}

/// One gene plus its wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneNode {
    pub gene: Trait,
    /// Names of genes whose resolved values this gene reads.
    pub dependencies: Vec<String>,
    /// Names of genes that read this one.
    pub dependents: Vec<String>,
    pub binding: Option<Binding>,
    /// How many times this gene has mutated along its lineage.
    pub mutations: u32,
    /// Value pushed through the binding on the last bind.
    #[serde(skip)]
    last_bound: Option<TraitValue>,
}

impl GeneNode {
    #[must_use]
    pub fn new(gene: Trait) -> Self {
        Self {
            gene,
            dependencies: Vec::new(),
            dependents: Vec::new(),
            binding: None,
            mutations: 0,
            last_bound: None,
        }
    }

    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    #[must_use]
    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.binding = Some(binding);
        self
    }

    /// Same gene and wiring, without the record of the last bind.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self {
            last_bound: None,
            ..self.clone()
        }
    }

    /// A copy holding a mutated gene.
    pub fn mutate<R: Rng>(&self, name: &str, config: &EvolutionConfig, rng: &mut R) -> Result<Self> {
        Ok(Self {
            gene: self.gene.mutate(name, config, rng)?,
            mutations: self.mutations + 1,
            ..self.copy()
        })
    }
}

/// One exported gene row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneRecord {
    pub name: String,
    pub value: String,
    /// `"0"` when disabled, `"1"` otherwise.
    pub enabled: String,
}

/// A named collection of gene nodes, regulators and an optional GRN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genome {
    type_name: String,
    nodes: SlotMap<GeneKey, GeneNode>,
    index: BTreeMap<String, GeneKey>,
    /// Per-node probability of mutation in [`clone_with_mutation`](Self::clone_with_mutation).
    mutation_rate: FloatTrait,
    regulators: BTreeMap<String, RegulatorSpec>,
    grn: Option<NetworkGenome>,
    #[serde(skip)]
    network: Option<NeuralNetwork>,
}

impl PartialEq for Genome {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
            && self.mutation_rate == other.mutation_rate
            && self.regulators == other.regulators
            && self.grn == other.grn
            && self.index.len() == other.index.len()
            && self.genes().zip(other.genes()).all(|((na, a), (nb, b))| {
                na == nb
                    && a.gene == b.gene
                    && a.dependencies == b.dependencies
                    && a.binding == b.binding
            })
    }
}

impl Genome {
    /// Empty genome whose mutation rate sits at the middle of `config`'s
    /// trait mutation range.
    #[must_use]
    pub fn new(type_name: impl Into<String>, config: &EvolutionConfig) -> Self {
        let (min, max) = (
            config.min_trait_mutation_chance,
            config.max_trait_mutation_chance,
        );
        Self::with_mutation_rate(type_name, FloatTrait::new(min, max, (min + max) / 2.0))
    }

    #[must_use]
    pub fn with_mutation_rate(type_name: impl Into<String>, mutation_rate: FloatTrait) -> Self {
        Self {
            type_name: type_name.into(),
            nodes: SlotMap::with_key(),
            index: BTreeMap::new(),
            mutation_rate,
            regulators: BTreeMap::new(),
            grn: None,
            network: None,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn mutation_rate(&self) -> f32 {
        self.mutation_rate.value
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&GeneNode> {
        self.index.get(name).map(|&key| &self.nodes[key])
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Gene nodes in name order.
    pub fn genes(&self) -> impl Iterator<Item = (&str, &GeneNode)> + '_ {
        self.index
            .iter()
            .map(|(name, &key)| (name.as_str(), &self.nodes[key]))
    }

    pub fn gene_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.index.keys().map(String::as_str)
    }

    #[must_use]
    pub fn regulators(&self) -> &BTreeMap<String, RegulatorSpec> {
        &self.regulators
    }

    pub fn add_regulator(&mut self, name: impl Into<String>, spec: RegulatorSpec) {
        self.regulators.insert(name.into(), spec);
    }

    #[must_use]
    pub fn network_genome(&self) -> Option<&NetworkGenome> {
        self.grn.as_ref()
    }

    #[must_use]
    pub fn network(&self) -> Option<&NeuralNetwork> {
        self.network.as_ref()
    }

    /// Insert or replace a node without touching the disable wiring.
    fn insert_node(&mut self, name: String, node: GeneNode) {
        match self.index.get(&name) {
            Some(&key) => self.nodes[key] = node,
            None => {
                let key = self.nodes.insert(node);
                self.index.insert(name, key);
            }
        }
    }

    /// Register a gene node under `name`, replacing any node of that name.
    ///
    /// A gene that can be disabled gets a `"Disable <name>"` boolean gene
    /// (created only when absent) wired as its dependency.
    pub fn add_gene(&mut self, name: impl Into<String>, mut node: GeneNode) {
        let name = name.into();
        if node.gene.can_disable() {
            let disable = disable_gene_name(&name);
            if !node.dependencies.contains(&disable) {
                node.dependencies.push(disable.clone());
            }
            if !self.index.contains_key(&disable) {
                self.insert_node(disable, GeneNode::new(Trait::Boolean(false)));
            }
        }
        for dependency in &node.dependencies {
            if let Some(&key) = self.index.get(dependency) {
                let dependents = &mut self.nodes[key].dependents;
                if !dependents.contains(&name) {
                    dependents.push(name.clone());
                }
            }
        }
        self.insert_node(name, node);
    }

    /// Replace the stored value of a gene.
    ///
    /// # Errors
    ///
    /// [`GeneticsError::UnknownGene`], or a contract violation if `value` is
    /// of another variant or outside the gene's bounds.
    pub fn set_value(&mut self, name: &str, value: TraitValue) -> Result<()> {
        let key = *self
            .index
            .get(name)
            .ok_or_else(|| GeneticsError::UnknownGene(name.to_string()))?;
        let node = &mut self.nodes[key];
        if let Some(reason) = node.gene.misfit(&value) {
            return Err(GeneticsError::contract(name, node.gene.kind(), "take value", reason));
        }
        if let Some(gene) = node.gene.with_value(value) {
            node.gene = gene;
        }
        Ok(())
    }

    /// Mutate one gene in place.
    pub fn mutate_gene<R: Rng>(&mut self, name: &str, config: &EvolutionConfig, rng: &mut R) -> Result<()> {
        let key = *self
            .index
            .get(name)
            .ok_or_else(|| GeneticsError::UnknownGene(name.to_string()))?;
        self.nodes[key] = self.nodes[key].mutate(name, config, rng)?;
        Ok(())
    }

    /// Resolve the current value of a gene.
    ///
    /// # Errors
    ///
    /// [`GeneticsError::UnknownGene`], [`GeneticsError::MissingDependency`] or
    /// [`GeneticsError::DependencyCycle`].
    pub fn resolve(&self, name: &str) -> Result<TraitValue> {
        self.resolve_chain(name, &mut Vec::new())
    }

    /// Whether the gene's `"Disable <name>"` gene currently resolves to `true`.
    pub fn is_disabled(&self, name: &str) -> Result<bool> {
        let node = self
            .get(name)
            .ok_or_else(|| GeneticsError::UnknownGene(name.to_string()))?;
        self.disabled_in_chain(name, node, &mut vec![name.to_string()])
    }

    fn resolve_chain(&self, name: &str, chain: &mut Vec<String>) -> Result<TraitValue> {
        let node = self
            .get(name)
            .ok_or_else(|| GeneticsError::UnknownGene(name.to_string()))?;
        if chain.iter().any(|n| n == name) {
            return Err(GeneticsError::DependencyCycle(name.to_string()));
        }
        chain.push(name.to_string());
        let value = self.resolve_node(name, node, chain);
        chain.pop();
        value
    }

    fn resolve_node(&self, name: &str, node: &GeneNode, chain: &mut Vec<String>) -> Result<TraitValue> {
        if let Some(output) = self.grn_output(name) {
            if !self.disabled_in_chain(name, node, chain)? {
                if let Some(value) = node.gene.from_network_output(output) {
                    return Ok(value);
                }
            }
        }
        let mut dependencies = Dependencies::new();
        for dependency in &node.dependencies {
            if !self.index.contains_key(dependency) {
                return Err(GeneticsError::MissingDependency {
                    gene: name.to_string(),
                    dependency: dependency.clone(),
                });
            }
            let value = self.resolve_chain(dependency, chain)?;
            dependencies.insert(dependency.clone(), value);
        }
        Ok(node.gene.evaluate(name, &dependencies))
    }

    fn disabled_in_chain(&self, name: &str, node: &GeneNode, chain: &mut Vec<String>) -> Result<bool> {
        if !node.gene.can_disable() {
            return Ok(false);
        }
        let flag = self.resolve_chain(&disable_gene_name(name), chain)?;
        Ok(flag == TraitValue::Boolean(true))
    }

    fn grn_output(&self, name: &str) -> Option<f32> {
        let network = self.network.as_ref().filter(|n| n.ticks() > 0)?;
        network.output(&output_label(name))
    }

    /// Resolve every bound gene and push changed values onto `target`.
    ///
    /// Genes bound to another type are skipped. Returns the number of setters
    /// called.
    pub fn bind_all<T: 'static>(&mut self, registry: &TraitRegistry<T>, target: &mut T) -> Result<usize> {
        let bound: Vec<(String, GeneKey, Binding)> = self
            .index
            .iter()
            .filter_map(|(name, &key)| {
                let binding = self.nodes[key].binding.clone()?;
                (binding.target == registry.type_name()).then(|| (name.clone(), key, binding))
            })
            .collect();

        let mut pushed = 0;
        for (name, key, binding) in bound {
            let value = self.resolve(&name)?;
            if self.nodes[key].last_bound.as_ref() == Some(&value) {
                continue;
            }
            registry.apply(&name, &binding, target, &value)?;
            self.nodes[key].last_bound = Some(value);
            pushed += 1;
        }
        Ok(pushed)
    }

    /// A mutated deep copy.
    ///
    /// Every node mutates with probability equal to this genome's mutation
    /// rate, and so does the rate itself. An attached GRN is extended with IO
    /// for any new genes, mutated and recompiled. The recompiled network has
    /// not ticked, so the child resolves its stored values until
    /// [`settle`](Self::settle) or [`tick`](Self::tick) runs.
    pub fn clone_with_mutation<R: Rng>(&self, config: &EvolutionConfig, rng: &mut R) -> Result<Self> {
        let rate = self.mutation_rate.value;
        let mutation_rate = if rng.random::<f32>() < rate {
            let (min, max) = (self.mutation_rate.min, self.mutation_rate.max);
            FloatTrait {
                value: rng.random_range(min..=max),
                ..self.mutation_rate.clone()
            }
        } else {
            self.mutation_rate.clone()
        };

        let mut child = Self::with_mutation_rate(self.type_name.clone(), mutation_rate);
        child.regulators = self.regulators.clone();
        for (name, node) in self.genes() {
            let next = if rng.random::<f32>() < rate {
                node.mutate(name, config, rng)?
            } else {
                node.copy()
            };
            child.insert_node(name.to_string(), next);
        }

        if let Some(grn) = &self.grn {
            let mut grn = grn.clone();
            grn::create_io(&mut grn, &child, config, rng);
            grn.mutate(config, rng);
            child.network = Some(grn.phenotype()?);
            child.grn = Some(grn);
        }
        Ok(child)
    }

    /// Union with `other`; its genes and regulators win on name collisions.
    pub fn merge(&mut self, other: &Genome) {
        for (name, node) in other.genes() {
            self.insert_node(name.to_string(), node.copy());
        }
        self.regulators.extend(
            other
                .regulators
                .iter()
                .map(|(name, spec)| (name.clone(), spec.clone())),
        );
    }

    /// Cross two parents and mutate the result.
    ///
    /// Genes and regulators present in both parents are picked by coin flip,
    /// the rest are inherited from whichever parent has them. GRNs are crossed
    /// by innovation number.
    pub fn crossover_child<R: Rng>(
        a: &Genome,
        b: &Genome,
        config: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let mutation_rate = if rng.random::<bool>() {
            a.mutation_rate.clone()
        } else {
            b.mutation_rate.clone()
        };
        let mut child = Self::with_mutation_rate(a.type_name.clone(), mutation_rate);

        let names: BTreeSet<&String> = a.index.keys().chain(b.index.keys()).collect();
        for name in names {
            let node = match (a.get(name), b.get(name)) {
                (Some(x), Some(y)) => {
                    if rng.random::<bool>() {
                        x
                    } else {
                        y
                    }
                }
                (Some(x), None) | (None, Some(x)) => x,
                (None, None) => continue,
            };
            child.add_gene(name.clone(), node.copy());
        }

        let regulators: BTreeSet<&String> =
            a.regulators.keys().chain(b.regulators.keys()).collect();
        for name in regulators {
            let spec = match (a.regulators.get(name), b.regulators.get(name)) {
                (Some(x), Some(y)) => {
                    if rng.random::<bool>() {
                        x
                    } else {
                        y
                    }
                }
                (Some(x), None) | (None, Some(x)) => x,
                (None, None) => continue,
            };
            child.regulators.insert(name.clone(), spec.clone());
        }

        child.grn = match (&a.grn, &b.grn) {
            (Some(x), Some(y)) => Some(x.crossover(y, config, rng)),
            (Some(x), None) | (None, Some(x)) => Some(x.clone()),
            (None, None) => None,
        };

        debug!(
            type_name = %child.type_name,
            genes = child.len(),
            grn = child.grn.is_some(),
            "genome crossover"
        );
        child.clone_with_mutation(config, rng)
    }

    /// Grow, compile and settle a fresh GRN for this genome.
    ///
    /// The network is ticked `depth + 1` times so signals have crossed it
    /// before the first resolution.
    pub fn build_grn<R: Rng>(
        &mut self,
        regulators: &RegulatorValues,
        config: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<()> {
        let grn = grn::create_network_genome(self, config, rng);
        self.network = Some(grn.phenotype()?);
        self.grn = Some(grn);
        self.settle(regulators, rng)
    }

    /// Tick the GRN `depth + 1` times so signals have crossed it.
    pub fn settle<R: Rng>(&mut self, regulators: &RegulatorValues, rng: &mut R) -> Result<()> {
        let depth = self.network.as_ref().map_or(0, NeuralNetwork::depth);
        for _ in 0..=depth {
            self.tick(regulators, rng)?;
        }
        Ok(())
    }

    /// Recompile the GRN, e.g. after deserialisation.
    pub fn rebuild_network(&mut self) -> Result<()> {
        self.network = self.grn.as_ref().map(NetworkGenome::phenotype).transpose()?;
        Ok(())
    }

    /// Feed gene values and regulators into the GRN, run it once, and feed the
    /// gene values again.
    pub fn tick<R: Rng>(&mut self, regulators: &RegulatorValues, rng: &mut R) -> Result<()> {
        if self.network.is_none() {
            return Ok(());
        }
        self.push_inputs(regulators, rng)?;
        if let Some(network) = self.network.as_mut() {
            network.tick();
        }
        self.push_inputs(regulators, rng)
    }

    fn push_inputs<R: Rng>(&mut self, regulators: &RegulatorValues, rng: &mut R) -> Result<()> {
        let mut inputs = vec![
            (BIAS.to_string(), 1.0),
            (RANDOM_SOURCE.to_string(), rng.random_range(-1.0..=1.0)),
        ];
        for (name, node) in self.genes() {
            let Some(raw) = node.gene.network_input() else {
                continue;
            };
            let value = if self.is_disabled(name)? { 0.0 } else { raw };
            inputs.push((input_label(name), value));
        }
        for name in self.regulators.keys() {
            match regulators.get(name) {
                Some(&value) => inputs.push((name.clone(), value)),
                None => warn!(regulator = %name, "no signal for regulator sensor"),
            }
        }

        if let Some(network) = self.network.as_mut() {
            for (label, value) in inputs {
                network.set_input(&label, value);
            }
        }
        Ok(())
    }

    /// One row per gene: name, stored value and enabled flag.
    pub fn records(&self) -> Result<Vec<GeneRecord>> {
        self.genes()
            .map(|(name, node)| {
                Ok(GeneRecord {
                    name: name.to_string(),
                    value: node.gene.value_string(),
                    enabled: disabled_flag_string(self.is_disabled(name)?).to_string(),
                })
            })
            .collect()
    }

    /// Total mutations over all genes, including nested sub-genomes.
    #[must_use]
    pub fn mutation_count(&self) -> u32 {
        self.genes()
            .map(|(_, node)| {
                node.mutations
                    + match &node.gene {
                        Trait::Nested(t) => t.genome.mutation_count(),
                        Trait::Collection(t) => t.elements.iter().map(Genome::mutation_count).sum(),
                        _ => 0,
                    }
            })
            .sum()
    }

    /// Mean of this genome's mutation rate and those of its sub-genomes.
    #[must_use]
    pub fn mean_mutation_rate(&self) -> f32 {
        let (sum, count) = self.mutation_rate_totals();
        sum / count as f32
    }

    fn mutation_rate_totals(&self) -> (f32, usize) {
        let mut totals = (self.mutation_rate.value, 1);
        for (_, node) in self.genes() {
            let subs: &[Genome] = match &node.gene {
                Trait::Nested(t) => std::slice::from_ref(&*t.genome),
                Trait::Collection(t) => &t.elements,
                _ => &[],
            };
            for sub in subs {
                let (sum, count) = sub.mutation_rate_totals();
                totals.0 += sum;
                totals.1 += count;
            }
        }
        totals
    }
}
