use crate::data::ConflictKind;
use crate::problem::{Gene, Placement, Problem};
use crate::validate::{self, ViolationSink};
use chrono::NaiveDate;
use std::collections::BTreeMap;

// hard constraint weights
const HARD_WEIGHT: f64 = 1000.0;
const SPACING_WEIGHT: f64 = 100.0;

// soft objective weights
const SPAN_WEIGHT: f64 = 10.0;
const LOAD_WEIGHT: f64 = 5.0;

fn weight(kind: ConflictKind) -> f64 {
    match kind {
        ConflictKind::MaxExamsPerDay | ConflictKind::MinimumGap => SPACING_WEIGHT,
        _ => HARD_WEIGHT,
    }
}

/// Sums weighted violations, never builds messages.
#[derive(Debug, Default)]
struct Tally {
    total: f64,
}

impl ViolationSink for Tally {
    fn record(
        &mut self,
        kind: ConflictKind,
        _courses: &[usize],
        amount: f64,
        _message: impl FnOnce() -> String,
    ) {
        self.total += weight(kind) * amount;
    }
}

/// `num / den`, or 0 when the denominator is 0.
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

/// Cost of a candidate: weighted constraint violations plus the soft objectives.
/// Zero means feasible, compact and evenly loaded.
pub fn total(problem: &Problem, genes: &[Gene]) -> f64 {
    placements_cost(problem, &problem.placements(genes))
}

pub fn placements_cost(problem: &Problem, placements: &[Placement]) -> f64 {
    let cost = violation_cost(problem, placements) + soft_cost(problem, placements);
    if cost.is_finite() { cost } else { f64::MAX }
}

pub fn violation_cost(problem: &Problem, placements: &[Placement]) -> f64 {
    let mut tally = Tally::default();
    validate::audit(problem, placements, &mut tally);
    tally.total
}

/// Span of the used days relative to the exam window, plus the spread of the daily exam count
/// (one invigilator per exam) over the exam days in that span.
pub fn soft_cost(problem: &Problem, placements: &[Placement]) -> f64 {
    let (Some(first), Some(last)) = (
        placements.iter().map(|p| p.date).min(),
        placements.iter().map(|p| p.date).max(),
    ) else {
        return 0.0;
    };
    let slots = problem.slots();
    let window_days = match (slots.first(), slots.last()) {
        (Some(a), Some(b)) => (b.date - a.date).num_days() as f64,
        _ => 0.0,
    };
    let span = ratio((last - first).num_days() as f64, window_days);

    let mut load: BTreeMap<NaiveDate, f64> = slots
        .iter()
        .map(|s| s.date)
        .filter(|d| *d >= first && *d <= last)
        .map(|d| (d, 0.0))
        .collect();
    for p in placements {
        *load.entry(p.date).or_default() += 1.0;
    }
    let days = load.len() as f64;
    let mean = ratio(load.values().sum(), days);
    let variance = ratio(load.values().map(|l| (l - mean).powi(2)).sum(), days);
    let spread = ratio(variance, mean * mean);

    SPAN_WEIGHT * span + LOAD_WEIGHT * spread
}
