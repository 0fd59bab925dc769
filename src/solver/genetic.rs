use super::coloring::color;
use super::{Budget, Solution, Solver, elapsed_ms, seeded_rng};
use crate::config::GeneticSettings;
use crate::cost;
use crate::data::{Algorithm, SolveStats};
use crate::problem::{Gene, Problem};
use log::{debug, info};
use rand::Rng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::time::Instant;

type Chromosome = Vec<Gene>;

/// Population-based search over gene vectors with tournament selection, two-point crossover and
/// elitism.
#[derive(Debug, Clone)]
pub struct GeneticSolver {
    settings: GeneticSettings,
    seed: Option<u64>,
}

impl GeneticSolver {
    pub fn new(settings: GeneticSettings, seed: Option<u64>) -> Self {
        Self {
            settings: settings.sanitized(),
            seed,
        }
    }
}

/// Fitness is `1 / (1 + cost)`: lower cost, fitter chromosome.
pub fn fitness(cost: f64) -> f64 {
    1.0 / (1.0 + cost.max(0.0))
}

fn evaluate(problem: &Problem, population: &[Chromosome]) -> Vec<f64> {
    population
        .par_iter()
        .map(|chromosome| cost::total(problem, chromosome))
        .collect()
}

fn best_index(costs: &[f64]) -> usize {
    costs
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(i, _)| i)
}

/// Picks `size` random members and returns the fittest.
fn tournament(costs: &[f64], size: usize, rng: &mut StdRng) -> usize {
    (0..size)
        .map(|_| rng.random_range(0..costs.len()))
        .min_by(|&a, &b| costs[a].total_cmp(&costs[b]))
        .unwrap_or(0)
}

/// Swaps the genes between two random cut points.
fn crossover(a: &mut Chromosome, b: &mut Chromosome, rng: &mut StdRng) {
    let len = a.len();
    let mut from = rng.random_range(0..=len);
    let mut to = rng.random_range(0..=len);
    if from > to {
        std::mem::swap(&mut from, &mut to);
    }
    a[from..to].swap_with_slice(&mut b[from..to]);
}

fn mutate(problem: &Problem, chromosome: &mut Chromosome, rng: &mut StdRng) {
    let course = rng.random_range(0..chromosome.len());
    chromosome[course] = problem.random_gene(course, rng);
}

impl Solver for GeneticSolver {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Genetic
    }

    fn solve(&self, problem: &Problem, budget: &Budget) -> Solution {
        let start_time = Instant::now();
        let settings = &self.settings;
        let mut rng = seeded_rng(self.seed);

        // one coloring seed for a good start, the rest random for diversity
        let mut population: Vec<Chromosome> = Vec::with_capacity(settings.population_size);
        population.push(color(problem));
        while population.len() < settings.population_size {
            population.push(problem.random_genes(&mut rng));
        }
        let mut costs = evaluate(problem, &population);

        let first = best_index(&costs);
        let initial_cost = costs[first];
        let mut best = population[first].clone();
        let mut best_cost = initial_cost;

        info!(
            "Starting genetic search with {} chromosomes, best initial cost {:.2}.",
            population.len(),
            initial_cost
        );

        let mut generation = 0;
        let mut stall = 0;
        let mut interrupted = budget.is_exhausted();
        while !interrupted && generation < settings.generations && best_cost > 0.0 {
            let mut ranked: Vec<usize> = (0..population.len()).collect();
            ranked.sort_by(|&a, &b| costs[a].total_cmp(&costs[b]));

            let mut next: Vec<Chromosome> = ranked
                .iter()
                .take(settings.elite_count)
                .map(|&i| population[i].clone())
                .collect();
            while next.len() < settings.population_size {
                let parent_a = tournament(&costs, settings.tournament_size, &mut rng);
                let parent_b = tournament(&costs, settings.tournament_size, &mut rng);
                let mut child_a = population[parent_a].clone();
                let mut child_b = population[parent_b].clone();
                if rng.random_bool(settings.crossover_rate) {
                    crossover(&mut child_a, &mut child_b, &mut rng);
                }
                for child in [&mut child_a, &mut child_b] {
                    if rng.random_bool(settings.mutation_rate) {
                        mutate(problem, child, &mut rng);
                    }
                }
                next.push(child_a);
                if next.len() < settings.population_size {
                    next.push(child_b);
                }
            }

            population = next;
            costs = evaluate(problem, &population);
            generation += 1;

            let leader = best_index(&costs);
            if costs[leader] < best_cost {
                best_cost = costs[leader];
                best.clone_from(&population[leader]);
                stall = 0;
            } else {
                stall += 1;
            }
            if generation % 50 == 0 {
                debug!(
                    "Generation {}, best fitness {:.6} (cost {:.2})",
                    generation,
                    fitness(best_cost),
                    best_cost
                );
            }
            if settings.stall_generations > 0 && stall >= settings.stall_generations {
                debug!("No improvement for {} generations, stopping.", stall);
                break;
            }
            interrupted = budget.is_exhausted();
        }

        info!(
            "Genetic search finished after {} generations in {:.2?}. Final cost: {:.2}",
            generation,
            start_time.elapsed(),
            best_cost
        );
        Solution {
            genes: best,
            stats: SolveStats {
                initial_cost,
                final_cost: best_cost,
                iterations: generation,
                elapsed_ms: elapsed_ms(start_time),
                interrupted,
            },
        }
    }
}
