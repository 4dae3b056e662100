//! Evolvable consumer types and the individuals built from them.
//!
//! A type opts in by implementing [`Evolvable`]: it declares its genes once in
//! [`Evolvable::register`]. An [`Individual`] pairs a live instance with the
//! genome that produced it and offers the three ways of making one: from
//! scratch, by asexual cloning and by sexual crossover.

use rand::Rng;

use crate::config::EvolutionConfig;
use crate::error::Result;
use crate::expression::Genome;
use crate::registry::TraitRegistry;

/// A type whose attributes are driven by a genome.
pub trait Evolvable: Default + Sized + 'static {
    /// Declare genes, setters and regulators.
    fn register(registry: &mut TraitRegistry<Self>);

    /// Called once, after the first values have been bound.
    fn build(&mut self) {}
}

/// Build an instance of `T` with `genome`'s resolved values.
///
/// The genome is expressed as-is; it is not ticked and keeps no record of
/// the push.
pub fn express<T: Evolvable>(genome: &Genome, registry: &TraitRegistry<T>) -> Result<T> {
    let mut instance = T::default();
    genome.clone().bind_all(registry, &mut instance)?;
    instance.build();
    Ok(instance)
}

/// A live instance and its genome.
#[derive(Debug, Clone)]
pub struct Individual<T> {
    instance: T,
    genome: Genome,
}

impl<T: Evolvable> Individual<T> {
    /// Grow a random genome for `T` and express it.
    pub fn create_new<R: Rng>(
        registry: &TraitRegistry<T>,
        config: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let genome = registry.schema().instantiate(config, rng)?;
        Self::from_genome(genome, registry, config, rng)
    }

    /// Offspring of this individual alone.
    pub fn asexual_clone<R: Rng>(
        &self,
        registry: &TraitRegistry<T>,
        config: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let genome = self.genome.clone_with_mutation(config, rng)?;
        Self::from_genome(genome, registry, config, rng)
    }

    /// Offspring of two parent genomes.
    pub fn sexual_cross<R: Rng>(
        a: &Genome,
        b: &Genome,
        registry: &TraitRegistry<T>,
        config: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let genome = Genome::crossover_child(a, b, config, rng)?;
        Self::from_genome(genome, registry, config, rng)
    }

    /// Express `genome` as a new instance.
    ///
    /// A GRN is grown when enabled and the genome has none yet; an inherited
    /// one is settled. Either way the network has run before values are bound
    /// and [`Evolvable::build`] is called.
    pub fn from_genome<R: Rng>(
        mut genome: Genome,
        registry: &TraitRegistry<T>,
        config: &EvolutionConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let mut instance = T::default();
        let regulators = registry.read_regulators(&instance);
        if config.grn_enabled && genome.network_genome().is_none() {
            genome.build_grn(&regulators, config, rng)?;
        } else {
            genome.settle(&regulators, rng)?;
        }
        genome.bind_all(registry, &mut instance)?;
        instance.build();
        Ok(Self { instance, genome })
    }

    /// Read regulators, tick the GRN and push changed values onto the instance.
    ///
    /// Returns the number of setters called.
    pub fn tick<R: Rng>(&mut self, registry: &TraitRegistry<T>, rng: &mut R) -> Result<usize> {
        let regulators = registry.read_regulators(&self.instance);
        self.genome.tick(&regulators, rng)?;
        self.genome.bind_all(registry, &mut self.instance)
    }
}

impl<T> Individual<T> {
    #[must_use]
    pub fn instance(&self) -> &T {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut T {
        &mut self.instance
    }

    #[must_use]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    #[must_use]
    pub fn into_parts(self) -> (T, Genome) {
        (self.instance, self.genome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TraitSpec;
    use crate::traits::TraitValue;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[derive(Debug, Default, Clone)]
    struct Shell {
        thickness: f32,
        ridges: i32,
        striped: bool,
        built: bool,
        /// Thickness seen by `build`.
        built_thickness: f32,
    }

    impl Evolvable for Shell {
        fn register(registry: &mut TraitRegistry<Self>) {
            registry
                .bind_float(TraitSpec::float("Thickness", 1.0, 3.0), |s, v| s.thickness = v)
                .bind_int(TraitSpec::integer("Ridges", 0, 12), |s, v| s.ridges = v)
                .bind_bool(
                    TraitSpec::boolean("Striped").initial(TraitValue::Boolean(true)),
                    |s, v| s.striped = v,
                );
        }

        fn build(&mut self) {
            self.built = true;
            self.built_thickness = self.thickness;
        }
    }

    #[test]
    fn test_create_new_binds_values() {
        let registry = TraitRegistry::<Shell>::build().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let shell = Individual::create_new(&registry, &EvolutionConfig::without_grn(), &mut rng).unwrap();
        let instance = shell.instance();
        assert!(instance.built);
        assert!(instance.striped);
        assert!((1.0..=3.0).contains(&instance.thickness));
        assert!((0..=12).contains(&instance.ridges));
        assert_eq!(
            shell.genome().resolve("Thickness").unwrap(),
            TraitValue::Float(instance.thickness)
        );
    }

    #[test]
    fn test_unchanged_values_are_not_pushed_again() {
        let registry = TraitRegistry::<Shell>::build().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut shell = Individual::create_new(&registry, &EvolutionConfig::without_grn(), &mut rng).unwrap();
        shell.instance_mut().thickness = -1.0;
        assert_eq!(shell.tick(&registry, &mut rng).unwrap(), 0);
        assert!((shell.instance().thickness + 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_offspring_keep_type() {
        let registry = TraitRegistry::<Shell>::build().unwrap();
        let config = EvolutionConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let a = Individual::create_new(&registry, &config, &mut rng).unwrap();
        let b = Individual::create_new(&registry, &config, &mut rng).unwrap();
        let clone = a.asexual_clone(&registry, &config, &mut rng).unwrap();
        let child = Individual::sexual_cross(a.genome(), b.genome(), &registry, &config, &mut rng).unwrap();
        for individual in [&clone, &child] {
            assert_eq!(individual.genome().type_name(), "Shell");
            assert!(individual.genome().network().is_some());
            assert!((1.0..=3.0).contains(&individual.instance().thickness));
        }
    }

    #[test]
    fn test_offspring_build_sees_settled_grn_values() {
        let registry = TraitRegistry::<Shell>::build().unwrap();
        let config = EvolutionConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let parent = Individual::create_new(&registry, &config, &mut rng).unwrap();
        let mate = Individual::create_new(&registry, &config, &mut rng).unwrap();

        let mut seen = Vec::new();
        for _ in 0..25 {
            let clone = parent.asexual_clone(&registry, &config, &mut rng).unwrap();
            let child =
                Individual::sexual_cross(parent.genome(), mate.genome(), &registry, &config, &mut rng)
                    .unwrap();
            for offspring in [clone, child] {
                let network = offspring.genome().network().unwrap();
                assert!(network.ticks() > u64::from(network.depth()));
                let instance = offspring.instance();
                assert!(instance.built);
                assert!((instance.built_thickness - instance.thickness).abs() < f32::EPSILON);
                assert_eq!(
                    offspring.genome().resolve("Thickness").unwrap(),
                    TraitValue::Float(instance.built_thickness)
                );
                seen.push(instance.built_thickness);
            }
        }
        // an unsettled network would pin every offspring to the lower bound
        assert!(seen.iter().any(|&t| t > 1.0));
    }

    #[test]
    fn test_express_without_individual() {
        let registry = TraitRegistry::<Shell>::build().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let genome = registry
            .schema()
            .instantiate(&EvolutionConfig::without_grn(), &mut rng)
            .unwrap();
        let shell = express(&genome, &registry).unwrap();
        assert!(shell.built);
        assert_eq!(genome.resolve("Ridges").unwrap(), TraitValue::Integer(shell.ridges));
    }
}
