//! The scheduling strategies and the interface they share.

mod annealing;
mod coloring;
mod genetic;

pub use annealing::SimulatedAnnealingSolver;
pub use coloring::GraphColoringSolver;
pub use genetic::GeneticSolver;

use crate::config::SolverSettings;
use crate::data::{Algorithm, Schedule, SolveStats};
use crate::problem::{Gene, Problem};
use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A scheduling strategy.
///
/// Every course of the problem gets exactly one gene, drawn from the legal slot space and the room
/// list. The result is best-effort: it may violate constraints, so callers re-validate it.
pub trait Solver: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    fn solve(&self, problem: &Problem, budget: &Budget) -> Solution;
}

/// A solver's answer: one gene per course, in course order.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub genes: Vec<Gene>,
    pub stats: SolveStats,
}

impl Solution {
    pub fn into_schedule(self, problem: &Problem, algorithm: Algorithm) -> Schedule {
        Schedule::new(algorithm, problem.to_assignments(&self.genes), self.stats)
    }
}

/// Limits on a solve: an optional deadline and an optional shared cancel flag.
///
/// The stochastic solvers poll it and return their best-so-far answer once it runs out.
#[derive(Debug, Clone, Default)]
pub struct Budget {
    deadline: Option<Instant>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Starts the clock on the settings' time limit, if any.
    pub fn from_settings(settings: &SolverSettings) -> Self {
        match settings.time_limit_ms {
            Some(ms) => Self::unlimited().with_time_limit(Duration::from_millis(ms)),
            None => Self::unlimited(),
        }
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.deadline = Some(Instant::now() + limit);
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }

    pub fn is_exhausted(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
            || self
                .cancelled
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Looks up the solver for an algorithm.
pub fn solver_for(algorithm: Algorithm, settings: &SolverSettings) -> Box<dyn Solver> {
    match algorithm {
        Algorithm::GraphColoring => Box::new(GraphColoringSolver),
        Algorithm::SimulatedAnnealing => Box::new(SimulatedAnnealingSolver::new(
            settings.annealing.clone(),
            settings.seed,
        )),
        Algorithm::Genetic => Box::new(GeneticSolver::new(settings.genetic.clone(), settings.seed)),
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    let seed = seed.unwrap_or_else(rand::random);
    debug!("Random seed {}", seed);
    StdRng::seed_from_u64(seed)
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{department_catalog, week_constraints};
    use crate::graph::ConflictGraph;
    use std::collections::BTreeSet;

    pub(crate) fn department_problem() -> Problem {
        let catalog = department_catalog();
        let graph = ConflictGraph::build(&catalog.courses, &catalog.enrollments);
        Problem::new(&catalog.courses, &catalog.rooms, graph, week_constraints()).unwrap()
    }

    fn quick_settings() -> SolverSettings {
        let mut settings = SolverSettings {
            seed: Some(11),
            ..SolverSettings::default()
        };
        settings.annealing.max_iterations = 2_000;
        settings.genetic.population_size = 16;
        settings.genetic.generations = 30;
        settings
    }

    #[test]
    fn test_every_solver_schedules_each_course_once() {
        let problem = department_problem();
        let settings = quick_settings();

        for algorithm in Algorithm::ALL {
            let solver = solver_for(algorithm, &settings);
            assert_eq!(solver.algorithm(), algorithm);

            let schedule = solver
                .solve(&problem, &Budget::unlimited())
                .into_schedule(&problem, algorithm);
            let codes: Vec<&str> = schedule
                .assignments
                .iter()
                .map(|a| a.course_code.as_str())
                .collect();
            let unique: BTreeSet<&str> = codes.iter().copied().collect();
            assert_eq!(codes.len(), problem.course_count(), "{algorithm}");
            assert_eq!(unique.len(), problem.course_count(), "{algorithm}");
            assert!(
                schedule
                    .assignments
                    .iter()
                    .all(|a| problem.session_index(&a.session).is_some()
                        && problem.room_index(&a.room_id).is_some())
            );
        }
    }

    #[test]
    fn test_cancelled_budget_still_returns_full_schedule() {
        let problem = department_problem();
        let flag = Arc::new(AtomicBool::new(true));
        let budget = Budget::unlimited().with_cancel_flag(flag);

        for algorithm in [Algorithm::SimulatedAnnealing, Algorithm::Genetic] {
            let solution = solver_for(algorithm, &quick_settings()).solve(&problem, &budget);
            assert_eq!(solution.genes.len(), problem.course_count());
            assert!(solution.stats.interrupted);
            assert!(solution.stats.final_cost <= solution.stats.initial_cost);
        }
    }

    #[test]
    fn test_budget_deadline() {
        assert!(!Budget::unlimited().is_exhausted());
        assert!(
            Budget::unlimited()
                .with_time_limit(Duration::ZERO)
                .is_exhausted()
        );
        let settings = SolverSettings {
            time_limit_ms: Some(60_000),
            ..SolverSettings::default()
        };
        assert!(!Budget::from_settings(&settings).is_exhausted());
    }
}
