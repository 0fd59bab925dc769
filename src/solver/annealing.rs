use super::coloring::color;
use super::{Budget, Solution, Solver, elapsed_ms, seeded_rng};
use crate::config::AnnealingSettings;
use crate::cost;
use crate::data::{Algorithm, SolveStats};
use crate::problem::Problem;
use log::{debug, info};
use rand::Rng;
use std::time::Instant;

// how often the budget is polled
const BUDGET_CHECK_INTERVAL: u64 = 64;

/// Local search over full assignments with geometric cooling.
#[derive(Debug, Clone)]
pub struct SimulatedAnnealingSolver {
    settings: AnnealingSettings,
    seed: Option<u64>,
}

impl SimulatedAnnealingSolver {
    pub fn new(settings: AnnealingSettings, seed: Option<u64>) -> Self {
        Self {
            settings: settings.sanitized(),
            seed,
        }
    }
}

impl Solver for SimulatedAnnealingSolver {
    fn algorithm(&self) -> Algorithm {
        Algorithm::SimulatedAnnealing
    }

    fn solve(&self, problem: &Problem, budget: &Budget) -> Solution {
        let start_time = Instant::now();
        let settings = &self.settings;
        let mut rng = seeded_rng(self.seed);

        let mut current = if settings.seed_with_coloring {
            color(problem)
        } else {
            problem.random_genes(&mut rng)
        };
        let mut current_cost = cost::total(problem, &current);
        let initial_cost = current_cost;
        let mut best = current.clone();
        let mut best_cost = current_cost;

        info!(
            "Starting simulated annealing from cost {:.2} (T0 = {}, alpha = {}).",
            initial_cost, settings.initial_temperature, settings.cooling_rate
        );

        let mut temperature = settings.initial_temperature;
        let mut iterations = 0;
        let mut interrupted = budget.is_exhausted();
        while !interrupted
            && iterations < settings.max_iterations
            && temperature > settings.min_temperature
            && best_cost > 0.0
        {
            if iterations % BUDGET_CHECK_INTERVAL == BUDGET_CHECK_INTERVAL - 1
                && budget.is_exhausted()
            {
                interrupted = true;
                break;
            }

            // move one course to a random legal slot and room
            let course = rng.random_range(0..current.len());
            let previous = current[course];
            current[course] = problem.random_gene(course, &mut rng);

            let candidate_cost = cost::total(problem, &current);
            let delta = candidate_cost - current_cost;
            if delta < 0.0 || rng.random::<f64>() < (-delta / temperature).exp() {
                current_cost = candidate_cost;
                if current_cost < best_cost {
                    best_cost = current_cost;
                    best.clone_from(&current);
                }
            } else {
                current[course] = previous;
            }

            iterations += 1;
            if iterations % settings.steps_per_temperature == 0 {
                temperature *= settings.cooling_rate;
            }
            if iterations % 1000 == 0 {
                debug!(
                    "Iteration {}, temperature {:.3}, best cost {:.2}",
                    iterations, temperature, best_cost
                );
            }
        }

        info!(
            "Simulated annealing finished after {} iterations in {:.2?}. Final cost: {:.2}",
            iterations,
            start_time.elapsed(),
            best_cost
        );
        Solution {
            genes: best,
            stats: SolveStats {
                initial_cost,
                final_cost: best_cost,
                iterations,
                elapsed_ms: elapsed_ms(start_time),
                interrupted,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::tests::department_problem;

    fn settings(seed_with_coloring: bool) -> AnnealingSettings {
        AnnealingSettings {
            max_iterations: 3_000,
            seed_with_coloring,
            ..AnnealingSettings::default()
        }
    }

    #[test]
    fn test_random_start_improves() {
        let problem = department_problem();
        let solver = SimulatedAnnealingSolver::new(settings(false), Some(7));
        let solution = solver.solve(&problem, &Budget::unlimited());

        assert!(solution.stats.final_cost <= solution.stats.initial_cost);
        assert_eq!(
            cost::total(&problem, &solution.genes),
            solution.stats.final_cost
        );
        assert!(solution.stats.iterations > 0);
    }

    #[test]
    fn test_coloring_start_never_gets_worse() {
        let problem = department_problem();
        let seeded = cost::total(&problem, &color(&problem));
        let solver = SimulatedAnnealingSolver::new(settings(true), Some(7));
        let solution = solver.solve(&problem, &Budget::unlimited());

        assert_eq!(solution.stats.initial_cost, seeded);
        assert!(solution.stats.final_cost <= seeded);
    }

    #[test]
    fn test_same_seed_same_result() {
        let problem = department_problem();
        let first = SimulatedAnnealingSolver::new(settings(false), Some(99))
            .solve(&problem, &Budget::unlimited());
        let second = SimulatedAnnealingSolver::new(settings(false), Some(99))
            .solve(&problem, &Budget::unlimited());

        assert_eq!(first.genes, second.genes);
    }
}
