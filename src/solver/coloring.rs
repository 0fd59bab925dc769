use super::{Budget, Solution, Solver, elapsed_ms};
use crate::cost;
use crate::data::{Algorithm, SolveStats};
use crate::problem::{Gene, Problem};
use log::{info, warn};
use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::Instant;

/// Greedy Welsh-Powell coloring of the conflict graph, with slots as colors.
///
/// Deterministic: the same problem always produces the same genes.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphColoringSolver;

impl Solver for GraphColoringSolver {
    fn algorithm(&self) -> Algorithm {
        Algorithm::GraphColoring
    }

    fn solve(&self, problem: &Problem, _budget: &Budget) -> Solution {
        let start_time = Instant::now();
        let genes = color(problem);
        let final_cost = cost::total(problem, &genes);
        info!(
            "Graph coloring placed {} courses in {:.2?} (cost {:.2}).",
            genes.len(),
            start_time.elapsed(),
            final_cost
        );
        Solution {
            genes,
            stats: SolveStats {
                initial_cost: final_cost,
                final_cost,
                iterations: problem.course_count() as u64,
                elapsed_ms: elapsed_ms(start_time),
                interrupted: false,
            },
        }
    }
}

/// Colors the conflict graph; also the starting point for the stochastic solvers.
pub(crate) fn color(problem: &Problem) -> Vec<Gene> {
    let graph = problem.graph();
    let slot_count = problem.slots().len();
    let room_count = problem.rooms().len();

    // largest degree first, ties by course code (vertex order is code order)
    let mut order: Vec<usize> = (0..problem.course_count()).collect();
    order.sort_by_key(|&v| (Reverse(graph.degree_at(v)), v));

    let mut genes: Vec<Option<Gene>> = vec![None; problem.course_count()];
    let mut occupied = vec![vec![false; room_count]; slot_count];

    for course in order {
        let forbidden: HashSet<usize> = graph
            .neighbors(course)
            .filter_map(|n| genes[n].map(|g| g.slot))
            .collect();
        let expected = problem.course(course).expected_students;
        let open: Vec<usize> = problem
            .legal_slots(course)
            .iter()
            .copied()
            .filter(|s| !forbidden.contains(s))
            .collect();

        let gene = match open
            .iter()
            .copied()
            .find(|&s| occupied[s].iter().any(|used| !used))
        {
            Some(slot) => {
                let free: Vec<usize> = problem
                    .rooms_by_capacity()
                    .iter()
                    .copied()
                    .filter(|&r| !occupied[slot][r])
                    .collect();
                Gene {
                    slot,
                    room: pick_room(problem, &free, expected),
                }
            }
            None => {
                // slots exhausted; the validator reports what this breaks
                let slot = open
                    .last()
                    .or_else(|| problem.legal_slots(course).last())
                    .copied()
                    .unwrap_or(slot_count - 1);
                warn!(
                    "No free slot left for {}; placing it in the last slot.",
                    problem.course(course).code
                );
                Gene {
                    slot,
                    room: pick_room(problem, problem.rooms_by_capacity(), expected),
                }
            }
        };

        let room = problem.room(gene.room);
        if room.capacity < expected {
            warn!(
                "{} needs {} seats, largest free room {} seats {}.",
                problem.course(course).code,
                expected,
                room.room_id,
                room.capacity
            );
        }
        occupied[gene.slot][gene.room] = true;
        genes[course] = Some(gene);
    }

    genes.into_iter().flatten().collect()
}

/// Smallest room that seats `expected`, else the largest. `candidates` is in ascending capacity.
fn pick_room(problem: &Problem, candidates: &[usize], expected: u32) -> usize {
    candidates
        .iter()
        .copied()
        .find(|&r| problem.room(r).capacity >= expected)
        .or_else(|| candidates.last().copied())
        .unwrap_or(0)
}
