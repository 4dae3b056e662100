//! Static trait declarations.
//!
//! A consumer type lists its evolvable attributes once, in
//! [`Evolvable::register`](crate::Evolvable::register), producing a
//! [`TraitRegistry`]. The registry splits into two halves:
//!
//! - [`GenomeSchema`]: plain data (names, bounds, mutation policy,
//!   dependencies, setter indices and regulator ranges). Genomes, nested
//!   genes and collection genes share it through an `Arc`.
//! - setter closures and regulator read-functions, indexed by integer and
//!   applied to live instances.
//!
//! Validation happens once, in [`TraitRegistry::build`], so a bad declaration
//! fails at construction time instead of mid-simulation.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EvolutionConfig;
use crate::error::{GeneticsError, Result};
use crate::evolvable::Evolvable;
use crate::expression::{Binding, GeneNode, Genome};
use crate::traits::{
    disable_gene_name, CollectionTrait, FloatTrait, IntMutation, IntegerTrait, NestedTrait, Trait,
    TraitValue,
};

/// Regulator values already normalised to `[-1, 1]`, keyed by regulator name.
pub type RegulatorValues = BTreeMap<String, f32>;

/// Pushes a resolved value onto an attribute of `T`.
pub type Setter<T> = Arc<dyn Fn(&mut T, &TraitValue) -> Result<()> + Send + Sync>;

/// Reads a raw regulator signal from a live `T`.
pub type RegulatorFn<T> = Arc<dyn Fn(&T) -> f32 + Send + Sync>;

/// Bounds of an external signal fed to the GRN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulatorSpec {
    pub min: f32,
    pub max: f32,
}

impl RegulatorSpec {
    /// Map a raw reading from `[min, max]` to `[-1, 1]`.
    #[must_use]
    pub fn normalise(&self, value: f32) -> f32 {
        if self.max == self.min {
            return 0.0;
        }
        2.0 * (value - self.min) / (self.max - self.min) - 1.0
    }
}

/// Kind, bounds and mutation policy of a declared gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TraitKind {
    Float {
        min: f32,
        max: f32,
        regulated: bool,
        control: bool,
    },
    Integer {
        min: i32,
        max: i32,
        method: IntMutation,
        max_increment: i32,
        regulated: bool,
        disable_value: Option<i32>,
    },
    Boolean,
    Nested {
        schema: Arc<GenomeSchema>,
    },
    Collection {
        schema: Arc<GenomeSchema>,
        min_size: usize,
        max_size: usize,
        initial_size: Option<usize>,
    },
}

impl TraitKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Float { .. } => "float",
            Self::Integer { .. } => "integer",
            Self::Boolean => "boolean",
            Self::Nested { .. } => "nested",
            Self::Collection { .. } => "collection",
        }
    }
}

/// One declared gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitSpec {
    pub name: String,
    pub kind: TraitKind,
    /// Fixed starting value; a random one is drawn when absent.
    pub initial: Option<TraitValue>,
    pub dependencies: Vec<String>,
    /// Index of the setter in the owning registry.
    pub setter: Option<usize>,
}

impl TraitSpec {
    fn new(name: impl Into<String>, kind: TraitKind) -> Self {
        Self {
            name: name.into(),
            kind,
            initial: None,
            dependencies: Vec::new(),
            setter: None,
        }
    }

    /// Float gene in `[min, max]`.
    #[must_use]
    pub fn float(name: impl Into<String>, min: f32, max: f32) -> Self {
        Self::new(
            name,
            TraitKind::Float {
                min,
                max,
                regulated: true,
                control: false,
            },
        )
    }

    /// Integer gene in `[min, max]`, resampled uniformly by default.
    #[must_use]
    pub fn integer(name: impl Into<String>, min: i32, max: i32) -> Self {
        Self::new(
            name,
            TraitKind::Integer {
                min,
                max,
                method: IntMutation::RandomSample,
                max_increment: 1,
                regulated: true,
                disable_value: None,
            },
        )
    }

    #[must_use]
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, TraitKind::Boolean)
    }

    /// Gene holding one sub-genome of the given schema.
    #[must_use]
    pub fn nested(name: impl Into<String>, schema: Arc<GenomeSchema>) -> Self {
        Self::new(name, TraitKind::Nested { schema })
    }

    /// Gene holding between `min_size` and `max_size` sub-genomes of the given schema.
    #[must_use]
    pub fn collection(
        name: impl Into<String>,
        schema: Arc<GenomeSchema>,
        min_size: usize,
        max_size: usize,
    ) -> Self {
        Self::new(
            name,
            TraitKind::Collection {
                schema,
                min_size,
                max_size,
                initial_size: None,
            },
        )
    }

    #[must_use]
    pub fn initial(mut self, value: TraitValue) -> Self {
        self.initial = Some(value);
        self
    }

    /// Number of elements a fresh collection starts with.
    #[must_use]
    pub fn initial_size(mut self, size: usize) -> Self {
        if let TraitKind::Collection { initial_size, .. } = &mut self.kind {
            *initial_size = Some(size);
        }
        self
    }

    #[must_use]
    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(names.into_iter().map(Into::into));
        self
    }

    /// Integer mutation strategy and its step bound.
    #[must_use]
    pub fn method(mut self, strategy: IntMutation, step: i32) -> Self {
        if let TraitKind::Integer {
            method,
            max_increment,
            ..
        } = &mut self.kind
        {
            *method = strategy;
            *max_increment = step;
        }
        self
    }

    /// Let an integer gene be switched off, yielding `value` while disabled.
    #[must_use]
    pub fn can_disable(mut self, value: i32) -> Self {
        if let TraitKind::Integer { disable_value, .. } = &mut self.kind {
            *disable_value = Some(value);
        }
        self
    }

    /// Keep this gene out of the GRN.
    #[must_use]
    pub fn unregulated(mut self) -> Self {
        match &mut self.kind {
            TraitKind::Float { regulated, .. } | TraitKind::Integer { regulated, .. } => {
                *regulated = false;
            }
            _ => {}
        }
        self
    }

    /// Make a float gene a control gene, driven by regulator sensors only.
    #[must_use]
    pub fn control(mut self) -> Self {
        if let TraitKind::Float { control, .. } = &mut self.kind {
            *control = true;
        }
        self
    }

    fn violation(&self, reason: impl Into<String>) -> GeneticsError {
        GeneticsError::contract(self.name.clone(), self.kind.name(), "declare", reason)
    }

    /// Check bounds, initial value and nested schemas.
    pub fn validate(&self) -> Result<()> {
        match &self.kind {
            TraitKind::Float { min, max, .. } => {
                if !(min.is_finite() && max.is_finite()) {
                    return Err(self.violation("bounds must be finite"));
                }
                if min > max {
                    return Err(self.violation(format!("min {min} exceeds max {max}")));
                }
                match &self.initial {
                    None => {}
                    Some(TraitValue::Float(v)) if (*min..=*max).contains(v) => {}
                    Some(other) => {
                        return Err(self.violation(format!("initial value {other} is out of bounds")))
                    }
                }
            }
            TraitKind::Integer {
                min,
                max,
                max_increment,
                ..
            } => {
                if min > max {
                    return Err(self.violation(format!("min {min} exceeds max {max}")));
                }
                if *max_increment < 0 {
                    return Err(self.violation("increment must not be negative"));
                }
                match &self.initial {
                    None => {}
                    Some(TraitValue::Integer(v)) if (*min..=*max).contains(v) => {}
                    Some(other) => {
                        return Err(self.violation(format!("initial value {other} is out of bounds")))
                    }
                }
            }
            TraitKind::Boolean => {
                if let Some(other) = self.initial.as_ref().filter(|v| v.as_bool().is_none()) {
                    return Err(self.violation(format!("initial value {other} is not a boolean")));
                }
            }
            TraitKind::Nested { schema } => schema.validate()?,
            TraitKind::Collection {
                schema,
                min_size,
                max_size,
                initial_size,
            } => {
                if min_size > max_size {
                    return Err(
                        self.violation(format!("min size {min_size} exceeds max size {max_size}"))
                    );
                }
                if let Some(size) = initial_size.filter(|s| !(*min_size..=*max_size).contains(s)) {
                    return Err(self.violation(format!("initial size {size} is out of bounds")));
                }
                schema.validate()?;
            }
        }
        Ok(())
    }

    /// Grow a gene from this declaration.
    pub fn instantiate<R: Rng>(&self, config: &EvolutionConfig, rng: &mut R) -> Result<Trait> {
        Ok(match &self.kind {
            TraitKind::Float {
                min,
                max,
                regulated,
                control,
            } => {
                let value = match self.initial.as_ref().and_then(TraitValue::as_f32) {
                    Some(v) => v,
                    None => rng.random_range(*min..=*max),
                };
                Trait::Float(FloatTrait {
                    regulated: *regulated,
                    control: *control,
                    ..FloatTrait::new(*min, *max, value)
                })
            }
            TraitKind::Integer {
                min,
                max,
                method,
                max_increment,
                regulated,
                disable_value,
            } => {
                let value = match self.initial.as_ref().and_then(TraitValue::as_i32) {
                    Some(v) => v,
                    None => rng.random_range(*min..=*max),
                };
                Trait::Integer(IntegerTrait {
                    method: *method,
                    max_increment: *max_increment,
                    regulated: *regulated,
                    disable_value: *disable_value,
                    ..IntegerTrait::new(*min, *max, value)
                })
            }
            TraitKind::Boolean => Trait::Boolean(match self.initial.as_ref() {
                Some(TraitValue::Boolean(v)) => *v,
                _ => rng.random::<bool>(),
            }),
            TraitKind::Nested { schema } => Trait::Nested(NestedTrait {
                schema: Arc::clone(schema),
                genome: Box::new(schema.instantiate(config, rng)?),
            }),
            TraitKind::Collection {
                schema,
                min_size,
                max_size,
                initial_size,
            } => {
                let size = match initial_size {
                    Some(size) => *size,
                    None => rng.random_range(*min_size..=*max_size),
                };
                let elements = (0..size)
                    .map(|_| schema.instantiate(config, rng))
                    .collect::<Result<Vec<_>>>()?;
                Trait::Collection(CollectionTrait {
                    schema: Arc::clone(schema),
                    min_size: *min_size,
                    max_size: *max_size,
                    elements,
                })
            }
        })
    }
}

/// Declarations of one consumer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeSchema {
    type_name: String,
    traits: Vec<TraitSpec>,
    regulators: BTreeMap<String, RegulatorSpec>,
}

impl GenomeSchema {
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            traits: Vec::new(),
            regulators: BTreeMap::new(),
        }
    }

    /// Declarations of an evolvable type, unvalidated.
    #[must_use]
    pub fn of<T: Evolvable>() -> Arc<Self> {
        Arc::clone(TraitRegistry::<T>::declared().schema())
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn traits(&self) -> &[TraitSpec] {
        &self.traits
    }

    #[must_use]
    pub fn regulators(&self) -> &BTreeMap<String, RegulatorSpec> {
        &self.regulators
    }

    /// Append a declaration.
    pub fn push(&mut self, spec: TraitSpec) {
        self.traits.push(spec);
    }

    pub fn add_regulator(&mut self, name: impl Into<String>, spec: RegulatorSpec) {
        self.regulators.insert(name.into(), spec);
    }

    /// Check every declaration, name uniqueness and dependency targets.
    pub fn validate(&self) -> Result<()> {
        let mut names: HashSet<String> = HashSet::new();
        for spec in &self.traits {
            spec.validate()?;
            if !names.insert(spec.name.clone()) {
                return Err(spec.violation("name is declared twice"));
            }
            if matches!(
                spec.kind,
                TraitKind::Integer {
                    disable_value: Some(_),
                    ..
                }
            ) {
                names.insert(disable_gene_name(&spec.name));
            }
        }
        for spec in &self.traits {
            if let Some(missing) = spec.dependencies.iter().find(|d| !names.contains(*d)) {
                return Err(GeneticsError::MissingDependency {
                    gene: spec.name.clone(),
                    dependency: missing.clone(),
                });
            }
        }
        for (name, regulator) in &self.regulators {
            if !(regulator.min.is_finite() && regulator.max.is_finite()) || regulator.min > regulator.max {
                return Err(GeneticsError::contract(
                    name.clone(),
                    "regulator",
                    "declare",
                    format!("invalid range [{}, {}]", regulator.min, regulator.max),
                ));
            }
        }
        Ok(())
    }

    /// Grow a fresh genome with a value drawn for every declared gene.
    pub fn instantiate<R: Rng>(&self, config: &EvolutionConfig, rng: &mut R) -> Result<Genome> {
        let rate = rng.random_range(
            config.min_trait_mutation_chance..=config.max_trait_mutation_chance,
        );
        let mut genome = Genome::with_mutation_rate(
            self.type_name.clone(),
            FloatTrait::new(
                config.min_trait_mutation_chance,
                config.max_trait_mutation_chance,
                rate,
            ),
        );
        for spec in &self.traits {
            let mut node =
                GeneNode::new(spec.instantiate(config, rng)?).with_dependencies(spec.dependencies.clone());
            if let Some(setter) = spec.setter {
                node = node.with_binding(Binding {
                    target: self.type_name.clone(),
                    setter,
                });
            }
            genome.add_gene(spec.name.clone(), node);
        }
        for (name, regulator) in &self.regulators {
            genome.add_regulator(name.clone(), regulator.clone());
        }
        debug!(
            type_name = %self.type_name,
            genes = genome.len(),
            regulators = self.regulators.len(),
            "genome instantiated"
        );
        Ok(genome)
    }
}

/// Declarations of `T` plus the closures that apply them to instances.
pub struct TraitRegistry<T> {
    schema: Arc<GenomeSchema>,
    setters: Vec<Setter<T>>,
    regulators: Vec<(String, RegulatorFn<T>)>,
}

impl<T> fmt::Debug for TraitRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraitRegistry")
            .field("schema", &self.schema)
            .field("setters", &self.setters.len())
            .field(
                "regulators",
                &self.regulators.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<T: 'static> TraitRegistry<T> {
    /// Empty registry for a type called `type_name`.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            schema: Arc::new(GenomeSchema::new(type_name)),
            setters: Vec::new(),
            regulators: Vec::new(),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<GenomeSchema> {
        &self.schema
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        self.schema.type_name()
    }

    #[must_use]
    pub fn setter_count(&self) -> usize {
        self.setters.len()
    }

    /// Declare a gene that is not pushed onto `T`.
    pub fn declare(&mut self, spec: TraitSpec) -> &mut Self {
        Arc::make_mut(&mut self.schema).push(spec);
        self
    }

    fn bind(&mut self, mut spec: TraitSpec, setter: Setter<T>) -> &mut Self {
        spec.setter = Some(self.setters.len());
        self.setters.push(setter);
        self.declare(spec)
    }

    /// Declare a float gene and the setter receiving its resolved value.
    pub fn bind_float<F>(&mut self, spec: TraitSpec, set: F) -> &mut Self
    where
        F: Fn(&mut T, f32) + Send + Sync + 'static,
    {
        let gene = spec.name.clone();
        self.bind(
            spec,
            Arc::new(move |target: &mut T, value: &TraitValue| match value {
                TraitValue::Float(v) => {
                    set(target, *v);
                    Ok(())
                }
                other => Err(mismatch(&gene, "float", other)),
            }),
        )
    }

    /// Declare an integer gene and the setter receiving its resolved value.
    pub fn bind_int<F>(&mut self, spec: TraitSpec, set: F) -> &mut Self
    where
        F: Fn(&mut T, i32) + Send + Sync + 'static,
    {
        let gene = spec.name.clone();
        self.bind(
            spec,
            Arc::new(move |target: &mut T, value: &TraitValue| match value {
                TraitValue::Integer(v) => {
                    set(target, *v);
                    Ok(())
                }
                other => Err(mismatch(&gene, "integer", other)),
            }),
        )
    }

    /// Declare a boolean gene and the setter receiving its resolved value.
    pub fn bind_bool<F>(&mut self, spec: TraitSpec, set: F) -> &mut Self
    where
        F: Fn(&mut T, bool) + Send + Sync + 'static,
    {
        let gene = spec.name.clone();
        self.bind(
            spec,
            Arc::new(move |target: &mut T, value: &TraitValue| match value {
                TraitValue::Boolean(v) => {
                    set(target, *v);
                    Ok(())
                }
                other => Err(mismatch(&gene, "boolean", other)),
            }),
        )
    }

    /// Declare a nested gene and the setter receiving its sub-genome.
    pub fn bind_genome<F>(&mut self, spec: TraitSpec, set: F) -> &mut Self
    where
        F: Fn(&mut T, &Genome) + Send + Sync + 'static,
    {
        let gene = spec.name.clone();
        self.bind(
            spec,
            Arc::new(move |target: &mut T, value: &TraitValue| match value {
                TraitValue::Genome(genome) => {
                    set(target, genome);
                    Ok(())
                }
                other => Err(mismatch(&gene, "genome", other)),
            }),
        )
    }

    /// Declare a collection gene and the setter receiving its element genomes.
    pub fn bind_collection<F>(&mut self, spec: TraitSpec, set: F) -> &mut Self
    where
        F: Fn(&mut T, &[Genome]) + Send + Sync + 'static,
    {
        let gene = spec.name.clone();
        self.bind(
            spec,
            Arc::new(move |target: &mut T, value: &TraitValue| match value {
                TraitValue::Collection(elements) => {
                    set(target, elements);
                    Ok(())
                }
                other => Err(mismatch(&gene, "collection", other)),
            }),
        )
    }

    /// Declare a named signal in `[min, max]` read from live instances.
    pub fn regulator<F>(&mut self, name: impl Into<String>, min: f32, max: f32, read: F) -> &mut Self
    where
        F: Fn(&T) -> f32 + Send + Sync + 'static,
    {
        let name = name.into();
        Arc::make_mut(&mut self.schema).add_regulator(name.clone(), RegulatorSpec { min, max });
        let read: RegulatorFn<T> = Arc::new(read);
        self.regulators.push((name, read));
        self
    }

    /// Push `value` through the setter named by `binding`.
    ///
    /// # Errors
    ///
    /// [`GeneticsError::UnboundSetter`] if the index is unknown, or the
    /// setter's own [`GeneticsError::ValueMismatch`].
    pub fn apply(&self, gene: &str, binding: &Binding, target: &mut T, value: &TraitValue) -> Result<()> {
        let setter = self
            .setters
            .get(binding.setter)
            .ok_or_else(|| GeneticsError::UnboundSetter {
                gene: gene.to_string(),
                target: self.type_name().to_string(),
                setter: binding.setter,
            })?;
        setter(target, value)
    }

    /// Current regulator readings of `target`, normalised to `[-1, 1]`.
    #[must_use]
    pub fn read_regulators(&self, target: &T) -> RegulatorValues {
        self.regulators
            .iter()
            .map(|(name, read)| {
                let raw = read(target);
                let value = self
                    .schema
                    .regulators()
                    .get(name)
                    .map_or(raw, |spec| spec.normalise(raw));
                (name.clone(), value)
            })
            .collect()
    }
}

impl<T: Evolvable + 'static> TraitRegistry<T> {
    /// Collect `T`'s declarations without validating them.
    #[must_use]
    pub fn declared() -> Self {
        let mut registry = Self::new(short_type_name::<T>());
        T::register(&mut registry);
        registry
    }

    /// Collect and validate `T`'s declarations.
    ///
    /// # Errors
    ///
    /// A contract violation or missing dependency naming the offending gene.
    pub fn build() -> Result<Self> {
        let registry = Self::declared();
        registry.schema.validate()?;
        debug!(
            type_name = registry.type_name(),
            traits = registry.schema.traits().len(),
            setters = registry.setters.len(),
            "trait registry built"
        );
        Ok(registry)
    }
}

fn mismatch(gene: &str, expected: &'static str, found: &TraitValue) -> GeneticsError {
    GeneticsError::ValueMismatch {
        gene: gene.to_string(),
        expected,
        found: found.kind(),
    }
}

/// `std::any::type_name` without the module path.
fn short_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[derive(Debug, Default)]
    struct Cell {
        radius: f32,
        spikes: i32,
        age: f32,
    }

    impl Evolvable for Cell {
        fn register(registry: &mut TraitRegistry<Self>) {
            registry
                .bind_float(TraitSpec::float("Radius", 0.5, 2.0), |c, v| c.radius = v)
                .bind_int(
                    TraitSpec::integer("Spikes", 0, 8).can_disable(0),
                    |c, v| c.spikes = v,
                )
                .regulator("Age", 0.0, 100.0, |c| c.age);
        }
    }

    #[test]
    fn test_build_collects_declarations() {
        let registry = TraitRegistry::<Cell>::build().unwrap();
        assert_eq!(registry.type_name(), "Cell");
        assert_eq!(registry.schema().traits().len(), 2);
        assert_eq!(registry.setter_count(), 2);
        assert!(registry.schema().regulators().contains_key("Age"));
    }

    #[test]
    fn test_regulators_are_normalised() {
        let registry = TraitRegistry::<Cell>::build().unwrap();
        let cell = Cell {
            age: 75.0,
            ..Default::default()
        };
        let values = registry.read_regulators(&cell);
        assert!((values["Age"] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_bounds_are_contract_violations() {
        let mut schema = GenomeSchema::new("Bad");
        schema.push(TraitSpec::float("Size", 3.0, 1.0));
        match schema.validate() {
            Err(GeneticsError::ContractViolation { gene, kind, .. }) => {
                assert_eq!(gene, "Size");
                assert_eq!(kind, "float");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_dependency_is_rejected() {
        let mut schema = GenomeSchema::new("Bad");
        schema.push(TraitSpec::boolean("Armoured").depends_on(["Thickness"]));
        assert!(matches!(
            schema.validate(),
            Err(GeneticsError::MissingDependency { .. })
        ));
    }

    #[test]
    fn test_implicit_disable_gene_counts_as_declared() {
        let mut schema = GenomeSchema::new("Ok");
        schema.push(TraitSpec::integer("Spikes", 0, 4).can_disable(0));
        schema.push(TraitSpec::boolean("Wary").depends_on(["Disable Spikes"]));
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut schema = GenomeSchema::new("Bad");
        schema.push(TraitSpec::boolean("Twin"));
        schema.push(TraitSpec::boolean("Twin"));
        assert!(matches!(
            schema.validate(),
            Err(GeneticsError::ContractViolation { .. })
        ));
    }

    #[test]
    fn test_instantiate_respects_initial_values() {
        let mut schema = GenomeSchema::new("Fixed");
        schema.push(TraitSpec::integer("Legs", 0, 10).initial(TraitValue::Integer(6)));
        schema.push(TraitSpec::boolean("Green").initial(TraitValue::Boolean(true)));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let genome = schema.instantiate(&EvolutionConfig::default(), &mut rng).unwrap();
        assert_eq!(genome.resolve("Legs").unwrap(), TraitValue::Integer(6));
        assert_eq!(genome.resolve("Green").unwrap(), TraitValue::Boolean(true));
    }

    #[test]
    fn test_setter_rejects_wrong_variant() {
        let registry = TraitRegistry::<Cell>::build().unwrap();
        let binding = Binding {
            target: "Cell".into(),
            setter: 0,
        };
        let mut cell = Cell::default();
        assert!(matches!(
            registry.apply("Radius", &binding, &mut cell, &TraitValue::Boolean(true)),
            Err(GeneticsError::ValueMismatch { .. })
        ));
        let unknown = Binding {
            target: "Cell".into(),
            setter: 9,
        };
        assert!(matches!(
            registry.apply("Radius", &unknown, &mut cell, &TraitValue::Float(1.0)),
            Err(GeneticsError::UnboundSetter { setter: 9, .. })
        ));
    }
}
