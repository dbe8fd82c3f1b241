use ferroneat::genomics::{ActivationType, GeneticConfig, Genome};
use ferroneat::logging::{EvolutionLogger, Stats};
use ferroneat::networks::FeedForwardNetwork;
use ferroneat::{Evaluation, Population, PopulationConfig};

use std::num::NonZeroUsize;

const ERROR_MARGIN: f32 = 0.3;
const SOLVED_FITNESS: f32 = 16.0;

fn evaluate_xor(genome: &Genome) -> f32 {
    let mut network = FeedForwardNetwork::new(genome);

    let values = [
        ([0.0, 0.0], 0.0),
        ([0.0, 1.0], 1.0),
        ([1.0, 0.0], 1.0),
        ([1.0, 1.0], 0.0),
    ];

    let mut errors = [0.0; 4];
    for (i, (input, output)) in values.iter().enumerate() {
        errors[i] = (network.activate(input)[0] - output).abs();
        if errors[i] < ERROR_MARGIN {
            errors[i] = 0.0;
        }
    }

    (4.0 - errors.iter().copied().sum::<f32>()).powf(2.0)
}

fn main() {
    env_logger::init();

    let genetic_config = GeneticConfig {
        input_count: NonZeroUsize::new(2).unwrap(),
        output_count: NonZeroUsize::new(1).unwrap(),
        initial_connections: 2,
        hidden_activation_types: vec![ActivationType::Sigmoid],
        output_activation_types: vec![ActivationType::Sigmoid],
        weight_bound: 5.0,
        weight_perturb_power: 2.5,
        add_node_chance: 0.03,
        add_connection_chance: 0.05,
        ..GeneticConfig::default()
    };
    let population_config = PopulationConfig {
        size: NonZeroUsize::new(150).unwrap(),
        distance_threshold: 3.0,
        elitism: 1,
        survival_fraction: 0.2,
        stagnation_limit: 15,
        max_generations: 100,
        fitness_threshold: Some(SOLVED_FITNESS),
        evaluation: Evaluation::Parallel,
        ..PopulationConfig::default()
    };

    stress_test(&genetic_config, &population_config);
    single_run(&genetic_config, &population_config);
}

/// Solves XOR repeatedly, reporting how many
/// generations successful runs took.
fn stress_test(genetic_config: &GeneticConfig, population_config: &PopulationConfig) {
    const ITERATIONS: usize = 100;

    let generations: Vec<Option<usize>> = (0..ITERATIONS)
        .map(|_| {
            let mut population =
                match Population::new(population_config.clone(), genetic_config.clone()) {
                    Ok(population) => population,
                    Err(e) => {
                        log::error!("{}", e);
                        return None;
                    }
                };
            match population.start(&evaluate_xor, &mut |_| {}) {
                Ok(best) if best.fitness() >= Some(SOLVED_FITNESS) => Some(population.generation()),
                Ok(_) => None,
                Err(e) => {
                    log::error!("{}", e);
                    None
                }
            }
        })
        .collect();

    println!(
        "Successful run generation count {:?}, {}% failure rate over {} iterations",
        Stats::from(generations.iter().filter_map(|g| g.map(|g| g as f32))),
        generations.iter().filter(|g| g.is_none()).count() as f32 * 100.0 / ITERATIONS as f32,
        ITERATIONS
    );
}

/// Solves XOR once, logging each generation
/// and printing the champion.
fn single_run(genetic_config: &GeneticConfig, population_config: &PopulationConfig) {
    let mut population = match Population::new(population_config.clone(), genetic_config.clone()) {
        Ok(population) => population,
        Err(e) => return log::error!("{}", e),
    };
    let mut logger = EvolutionLogger::new();

    match population.start(&evaluate_xor, &mut |report| logger.log(report)) {
        Ok(best) => {
            println!("{}", best);
            match ron::to_string(&best) {
                Ok(serialized) => println!("{}", serialized),
                Err(e) => log::error!("{}", e),
            }
        }
        Err(e) => log::error!("{}", e),
    }
    println!("best fitness by generation: {:?}", logger.best_fitness_history());
}
