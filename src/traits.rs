//! Evolvable gene values.
//!
//! Every gene variant is one arm of the closed [`Trait`] enum, so each
//! primitive (`value`, `random_value`, `with_value`, `mutate`, `crossover`)
//! is a single `match`. Scalar variants carry their bounds; composite variants
//! carry the schema of their element type so fresh elements can be grown.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::activation::Activation;
use crate::config::EvolutionConfig;
use crate::error::{GeneticsError, Result};
use crate::expression::Genome;
use crate::registry::GenomeSchema;

/// Resolved values of a gene's dependencies, keyed by gene name.
pub type Dependencies = BTreeMap<String, TraitValue>;

/// Name of the boolean gene that disables `gene`.
#[must_use]
pub fn disable_gene_name(gene: &str) -> String {
    format!("Disable {gene}")
}

/// How an integer gene draws its next value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntMutation {
    /// Uniform over the whole `[min, max]` range.
    #[default]
    RandomSample,
    /// Uniform within `max_increment` of the current value, either direction.
    IncrementAnyDir,
    /// Uniform between the current value and `max_increment` above it.
    IncrementOnlyUp,
}

/// A value held by or resolved from a gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TraitValue {
    Float(f32),
    Integer(i32),
    Boolean(bool),
    Genome(Box<Genome>),
    Collection(Vec<Genome>),
}

impl TraitValue {
    /// Variant name, for error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Integer(_) => "integer",
            Self::Boolean(_) => "boolean",
            Self::Genome(_) => "genome",
            Self::Collection(_) => "collection",
        }
    }

    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Self::Float(v) => Some(v),
            Self::Integer(v) => Some(v as f32),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Self::Integer(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Boolean(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for TraitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Genome(genome) => write!(f, "{}", genome.type_name()),
            Self::Collection(elements) => write!(f, "[{}]", elements.len()),
        }
    }
}

/// Float gene in `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatTrait {
    pub min: f32,
    pub max: f32,
    pub value: f32,
    /// Whether the GRN may read and override this gene.
    pub regulated: bool,
    /// Control genes are driven by regulators only and have no input sensor.
    pub control: bool,
}

impl FloatTrait {
    #[must_use]
    pub fn new(min: f32, max: f32, value: f32) -> Self {
        Self {
            min,
            max,
            value,
            regulated: true,
            control: false,
        }
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> f32 {
        rng.random_range(self.min..=self.max)
    }
}

/// Integer gene in `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegerTrait {
    pub min: i32,
    pub max: i32,
    pub value: i32,
    pub method: IntMutation,
    /// Step bound for the increment methods.
    pub max_increment: i32,
    pub regulated: bool,
    /// Value yielded while disabled; `None` if the gene cannot be disabled.
    pub disable_value: Option<i32>,
}

impl IntegerTrait {
    #[must_use]
    pub fn new(min: i32, max: i32, value: i32) -> Self {
        Self {
            min,
            max,
            value,
            method: IntMutation::RandomSample,
            max_increment: 1,
            regulated: true,
            disable_value: None,
        }
    }

    /// Range the next value is drawn from, always inside `[min, max]`.
    #[must_use]
    pub fn window(&self) -> (i32, i32) {
        match self.method {
            IntMutation::RandomSample => (self.min, self.max),
            IntMutation::IncrementAnyDir => {
                let value = self.value.clamp(self.min, self.max);
                (
                    value.saturating_sub(self.max_increment).max(self.min),
                    value.saturating_add(self.max_increment).min(self.max),
                )
            }
            IntMutation::IncrementOnlyUp => {
                let value = self.value.clamp(self.min, self.max);
                (value, value.saturating_add(self.max_increment).min(self.max))
            }
        }
    }
}

/// Gene holding a whole sub-genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedTrait {
    pub schema: Arc<GenomeSchema>,
    pub genome: Box<Genome>,
}

/// Gene holding an ordered list of sub-genomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionTrait {
    pub schema: Arc<GenomeSchema>,
    pub min_size: usize,
    pub max_size: usize,
    pub elements: Vec<Genome>,
}

/// Structural outcome of one collection mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionChange {
    Removed(usize),
    Added,
    Unchanged,
}

impl CollectionTrait {
    /// Decide the structural change for a uniform draw `p` in `[0, 1)`.
    ///
    /// Removal is chosen for `p < 1/3` and addition for `p < 2/3`, each only
    /// when the size stays within bounds; otherwise the next legal branch runs.
    #[must_use]
    pub fn plan_change(&self, p: f32) -> CollectionChange {
        let size = self.elements.len();
        let remove = size > self.min_size && p < 1.0 / 3.0;
        let add = size < self.max_size && !remove && p < 2.0 / 3.0;
        if remove {
            CollectionChange::Removed(0)
        } else if add {
            CollectionChange::Added
        } else {
            CollectionChange::Unchanged
        }
    }

    /// Elements after one mutation: at most one removed or added, every
    /// retained element mutated.
    fn mutated_elements<R: Rng>(
        &self,
        config: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<Vec<Genome>> {
        let change = match self.plan_change(rng.random::<f32>()) {
            CollectionChange::Removed(_) => {
                CollectionChange::Removed(rng.random_range(0..self.elements.len()))
            }
            other => other,
        };

        let mut elements = Vec::with_capacity(self.elements.len() + 1);
        for (i, element) in self.elements.iter().enumerate() {
            if change == CollectionChange::Removed(i) {
                continue;
            }
            elements.push(element.clone_with_mutation(config, rng)?);
        }
        if change == CollectionChange::Added {
            elements.push(self.schema.instantiate(config, rng)?);
        }
        if change != CollectionChange::Unchanged {
            debug!(
                schema = self.schema.type_name(),
                from = self.elements.len(),
                to = elements.len(),
                "collection resized"
            );
        }
        Ok(elements)
    }
}

/// An evolvable gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Trait {
    Float(FloatTrait),
    Integer(IntegerTrait),
    Boolean(bool),
    Nested(NestedTrait),
    Collection(CollectionTrait),
}

impl Trait {
    /// Variant name, for error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Integer(_) => "integer",
            Self::Boolean(_) => "boolean",
            Self::Nested(_) => "nested",
            Self::Collection(_) => "collection",
        }
    }

    /// The stored value.
    #[must_use]
    pub fn value(&self) -> TraitValue {
        match self {
            Self::Float(t) => TraitValue::Float(t.value),
            Self::Integer(t) => TraitValue::Integer(t.value),
            Self::Boolean(v) => TraitValue::Boolean(*v),
            Self::Nested(t) => TraitValue::Genome(t.genome.clone()),
            Self::Collection(t) => TraitValue::Collection(t.elements.clone()),
        }
    }

    /// Draw a candidate value under this gene's mutation rule.
    ///
    /// Scalars resample within bounds. A nested genome returns a mutated clone
    /// of itself, and a collection applies one remove/add/keep step.
    pub fn random_value<R: Rng>(
        &self,
        config: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<TraitValue> {
        Ok(match self {
            Self::Float(t) => TraitValue::Float(t.sample(rng)),
            Self::Integer(t) => {
                let (lo, hi) = t.window();
                TraitValue::Integer(rng.random_range(lo..=hi))
            }
            Self::Boolean(_) => TraitValue::Boolean(rng.random::<bool>()),
            Self::Nested(t) => {
                TraitValue::Genome(Box::new(t.genome.clone_with_mutation(config, rng)?))
            }
            Self::Collection(t) => TraitValue::Collection(t.mutated_elements(config, rng)?),
        })
    }

    /// Why `value` cannot be stored in this gene, or `None` if it can.
    ///
    /// Scalars must lie within the gene's bounds and collections within its
    /// size limits.
    #[must_use]
    pub fn misfit(&self, value: &TraitValue) -> Option<String> {
        match (self, value) {
            (Self::Float(t), &TraitValue::Float(v)) => (!(t.min..=t.max).contains(&v))
                .then(|| format!("{v} is outside [{}, {}]", t.min, t.max)),
            (Self::Integer(t), &TraitValue::Integer(v)) => (!(t.min..=t.max).contains(&v))
                .then(|| format!("{v} is outside [{}, {}]", t.min, t.max)),
            (Self::Boolean(_), TraitValue::Boolean(_)) | (Self::Nested(_), TraitValue::Genome(_)) => {
                None
            }
            (Self::Collection(t), TraitValue::Collection(elements)) => {
                (!(t.min_size..=t.max_size).contains(&elements.len())).then(|| {
                    format!(
                        "{} elements is outside [{}, {}]",
                        elements.len(),
                        t.min_size,
                        t.max_size
                    )
                })
            }
            _ => Some(format!("a {} value does not fit", value.kind())),
        }
    }

    /// A copy of this gene holding `value`, or `None` if [`misfit`](Self::misfit)
    /// rejects it.
    #[must_use]
    pub fn with_value(&self, value: TraitValue) -> Option<Self> {
        if self.misfit(&value).is_some() {
            return None;
        }
        Some(match (self, value) {
            (Self::Float(t), TraitValue::Float(v)) => Self::Float(FloatTrait {
                value: v,
                ..t.clone()
            }),
            (Self::Integer(t), TraitValue::Integer(v)) => Self::Integer(IntegerTrait {
                value: v,
                ..t.clone()
            }),
            (Self::Boolean(_), TraitValue::Boolean(v)) => Self::Boolean(v),
            (Self::Nested(t), TraitValue::Genome(genome)) => Self::Nested(NestedTrait {
                schema: Arc::clone(&t.schema),
                genome,
            }),
            (Self::Collection(t), TraitValue::Collection(elements)) => {
                Self::Collection(CollectionTrait {
                    schema: Arc::clone(&t.schema),
                    min_size: t.min_size,
                    max_size: t.max_size,
                    elements,
                })
            }
            _ => return None,
        })
    }

    /// `with_value(random_value())`.
    ///
    /// # Errors
    ///
    /// A value that does not fit this gene is a contract violation naming `gene`.
    pub fn mutate<R: Rng>(&self, gene: &str, config: &EvolutionConfig, rng: &mut R) -> Result<Self> {
        let value = self.random_value(config, rng)?;
        let found = value.kind();
        self.with_value(value).ok_or_else(|| {
            GeneticsError::contract(
                gene,
                self.kind(),
                "mutate",
                format!("random value of kind {found} does not fit"),
            )
        })
    }

    /// Pick `self` or `other` with equal probability.
    #[must_use]
    pub fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        if rng.random::<bool>() {
            self.clone()
        } else {
            other.clone()
        }
    }

    /// Raw evaluation from stored state and resolved dependencies.
    ///
    /// A disableable integer yields its disable value while its
    /// `"Disable <gene>"` dependency resolves to `true`.
    #[must_use]
    pub fn evaluate(&self, gene: &str, dependencies: &Dependencies) -> TraitValue {
        if let Self::Integer(IntegerTrait {
            disable_value: Some(disabled),
            ..
        }) = self
        {
            if dependencies.get(&disable_gene_name(gene)) == Some(&TraitValue::Boolean(true)) {
                return TraitValue::Integer(*disabled);
            }
        }
        self.value()
    }

    /// Whether this gene gets an implicit `"Disable <name>"` gene.
    #[must_use]
    pub fn can_disable(&self) -> bool {
        matches!(
            self,
            Self::Integer(IntegerTrait {
                disable_value: Some(_),
                ..
            })
        )
    }

    /// Whether the GRN wires this gene at all.
    #[must_use]
    pub fn is_regulated(&self) -> bool {
        match self {
            Self::Float(t) => t.regulated || t.control,
            Self::Integer(t) => t.regulated,
            Self::Boolean(_) => true,
            Self::Nested(_) | Self::Collection(_) => false,
        }
    }

    /// Whether this is a control gene, driven by regulators without an input sensor.
    #[must_use]
    pub fn is_control(&self) -> bool {
        matches!(self, Self::Float(FloatTrait { control: true, .. }))
    }

    /// Activation of this gene's GRN input sensor.
    #[must_use]
    pub fn input_activation(&self) -> Option<Activation> {
        match self {
            Self::Float(t) if !t.control => Some(Activation::Normalize {
                min: t.min,
                max: t.max,
            }),
            Self::Integer(t) => {
                let (lo, hi) = t.window();
                Some(Activation::Normalize {
                    min: lo as f32,
                    max: hi as f32,
                })
            }
            Self::Boolean(_) => Some(Activation::Linear),
            _ => None,
        }
    }

    /// Activation of this gene's GRN output neuron.
    #[must_use]
    pub fn output_activation(&self) -> Option<Activation> {
        match self {
            Self::Float(t) => Some(Activation::Remap {
                min: t.min,
                max: t.max,
            }),
            Self::Integer(t) => {
                let (lo, hi) = t.window();
                Some(Activation::Remap {
                    min: lo as f32,
                    max: hi as f32,
                })
            }
            Self::Boolean(_) => Some(Activation::Sign),
            _ => None,
        }
    }

    /// Sensor value for the GRN.
    #[must_use]
    pub fn network_input(&self) -> Option<f32> {
        match self {
            Self::Float(t) => Some(t.value),
            Self::Integer(t) => Some(t.value as f32),
            Self::Boolean(v) => Some(if *v { 1.0 } else { -1.0 }),
            _ => None,
        }
    }

    /// Convert a GRN output back into this gene's native type and bounds.
    #[must_use]
    pub fn from_network_output(&self, output: f32) -> Option<TraitValue> {
        if output.is_nan() {
            return None;
        }
        match self {
            Self::Float(t) => Some(TraitValue::Float(output.clamp(t.min, t.max))),
            Self::Integer(t) => Some(TraitValue::Integer(
                (output.round() as i32).clamp(t.min, t.max),
            )),
            Self::Boolean(_) => Some(TraitValue::Boolean(output > 0.0)),
            _ => None,
        }
    }

    /// Stored value rendered for export.
    #[must_use]
    pub fn value_string(&self) -> String {
        self.value().to_string()
    }
}

/// `"0"` when disabled, `"1"` otherwise.
#[must_use]
pub fn disabled_flag_string(disabled: bool) -> &'static str {
    if disabled {
        "0"
    } else {
        "1"
    }
}
