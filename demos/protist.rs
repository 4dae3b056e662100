//! Evolves a small population of protists and prints the fittest genome.
//!
//! Fitness rewards large cells with few flagella that keep their spikes
//! short. Run with `RUST_LOG=symbios_grn=debug` to watch genomes being
//! built and crossed.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use symbios_grn::{
    express, EvolutionConfig, Evolvable, Genome, Individual, IntMutation, Result, TraitRegistry,
    TraitSpec,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Spike {
    length: f32,
}

impl Evolvable for Spike {
    fn register(registry: &mut TraitRegistry<Self>) {
        registry.bind_float(TraitSpec::float("Length", 0.1, 1.5), |s, v| s.length = v);
    }
}

#[derive(Debug, Default)]
struct Protist {
    radius: f32,
    flagella: i32,
    lobes: i32,
    spike_genomes: Vec<Genome>,
    energy: f32,
}

impl Evolvable for Protist {
    fn register(registry: &mut TraitRegistry<Self>) {
        registry
            .bind_float(TraitSpec::float("Radius", 0.5, 2.0), |p, v| p.radius = v)
            .bind_int(
                TraitSpec::integer("Flagella", 0, 6).can_disable(0),
                |p, v| p.flagella = v,
            )
            .bind_int(
                TraitSpec::integer("Lobes", 1, 9).method(IntMutation::IncrementAnyDir, 1),
                |p, v| p.lobes = v,
            )
            .bind_collection(
                TraitSpec::collection("Spikes", symbios_grn::GenomeSchema::of::<Spike>(), 0, 4),
                |p, genomes| p.spike_genomes = genomes.to_vec(),
            )
            .regulator("Energy", 0.0, 10.0, |p| p.energy);
    }
}

fn fitness(protist: &Protist, spikes: &TraitRegistry<Spike>) -> Result<f32> {
    let mut spike_length = 0.0;
    for genome in &protist.spike_genomes {
        spike_length += express(genome, spikes)?.length;
    }
    Ok(protist.radius * 2.0 + protist.lobes as f32 * 0.1
        - protist.flagella as f32 * 0.25
        - spike_length * 0.5)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = TraitRegistry::<Protist>::build()?;
    let spikes = TraitRegistry::<Spike>::build()?;
    let config = EvolutionConfig::default();
    config.validate()?;
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let mut population = (0..24)
        .map(|_| Individual::create_new(&registry, &config, &mut rng))
        .collect::<Result<Vec<_>>>()?;

    for generation in 0..30 {
        for protist in &mut population {
            protist.instance_mut().energy = rng.random_range(0.0..10.0);
            protist.tick(&registry, &mut rng)?;
        }

        let mut scored = population
            .into_iter()
            .map(|p| Ok((fitness(p.instance(), &spikes)?, p)))
            .collect::<Result<Vec<_>>>()?;
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        info!(generation, best = scored[0].0, "generation scored");

        scored.truncate(8);
        let parents: Vec<Individual<Protist>> = scored.into_iter().map(|(_, p)| p).collect();
        let mut next = Vec::with_capacity(24);
        for i in 0..16 {
            let a = &parents[i % parents.len()];
            let b = &parents[rng.random_range(0..parents.len())];
            next.push(Individual::sexual_cross(a.genome(), b.genome(), &registry, &config, &mut rng)?);
        }
        for parent in &parents {
            next.push(parent.asexual_clone(&registry, &config, &mut rng)?);
        }
        population = next;
    }

    let best = population
        .iter()
        .max_by(|a, b| {
            let fa = fitness(a.instance(), &spikes).unwrap_or(f32::MIN);
            let fb = fitness(b.instance(), &spikes).unwrap_or(f32::MIN);
            fa.total_cmp(&fb)
        })
        .map(Individual::genome);

    if let Some(genome) = best {
        for record in genome.records()? {
            println!("{:<20} {:>10} {}", record.name, record.value, record.enabled);
        }
        if let Some(network) = genome.network() {
            println!("GRN: {} neurons, depth {}", network.neurons().count(), network.depth());
        }
    }
    Ok(())
}
