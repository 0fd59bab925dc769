use crate::data::Catalog;
use crate::error::ConfigError;
use clap::Parser;
use log::info;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const APP_NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug, Clone)]
#[command(name = APP_NAME)]
#[command(version = VERSION)]
#[command(about = "Exam timetable generator with graph-coloring, annealing and genetic solvers", long_about = None)]
pub struct Args {
    /// Address the HTTP server listens on
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// JSON file with the courses, rooms and enrollments to schedule
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// Default time limit for a single solve, in milliseconds
    #[arg(short, long)]
    pub time_limit_ms: Option<u64>,

    /// Default random seed for the stochastic solvers
    #[arg(short, long)]
    pub seed: Option<u64>,
}

impl Args {
    pub fn solver_defaults(&self) -> SolverSettings {
        SolverSettings {
            seed: self.seed,
            time_limit_ms: self.time_limit_ms,
            ..SolverSettings::default()
        }
    }
}

pub fn load_catalog(path: &Path) -> Result<Catalog, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let catalog: Catalog = serde_json::from_str(&text)?;
    info!(
        "Loaded catalog from {}: {} courses, {} rooms, {} enrollments.",
        path.display(),
        catalog.courses.len(),
        catalog.rooms.len(),
        catalog.enrollments.len()
    );
    Ok(catalog)
}

/// Tuning for the stochastic solvers. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Fixed seed for reproducible runs; drawn at random when absent.
    pub seed: Option<u64>,
    pub time_limit_ms: Option<u64>,
    pub annealing: AnnealingSettings,
    pub genetic: GeneticSettings,
}

impl SolverSettings {
    /// Fills seed and time limit from `defaults` where this request left them out.
    pub fn or_defaults(mut self, defaults: &SolverSettings) -> Self {
        self.seed = self.seed.or(defaults.seed);
        self.time_limit_ms = self.time_limit_ms.or(defaults.time_limit_ms);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnnealingSettings {
    pub initial_temperature: f64,
    /// Multiplied into the temperature every `steps_per_temperature` iterations. Must be in (0, 1).
    pub cooling_rate: f64,
    pub min_temperature: f64,
    pub steps_per_temperature: u64,
    pub max_iterations: u64,
    /// Start from the graph-coloring schedule instead of a random one.
    pub seed_with_coloring: bool,
}

impl Default for AnnealingSettings {
    fn default() -> Self {
        Self {
            initial_temperature: 1000.0,
            cooling_rate: 0.95,
            min_temperature: 0.01,
            steps_per_temperature: 100,
            max_iterations: 50_000,
            seed_with_coloring: true,
        }
    }
}

impl AnnealingSettings {
    /// Replaces values that would stall or break the cooling loop with the defaults.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        Self {
            initial_temperature: if self.initial_temperature.is_finite()
                && self.initial_temperature > 0.0
            {
                self.initial_temperature
            } else {
                defaults.initial_temperature
            },
            cooling_rate: if self.cooling_rate > 0.0 && self.cooling_rate < 1.0 {
                self.cooling_rate
            } else {
                defaults.cooling_rate
            },
            min_temperature: if self.min_temperature.is_finite() && self.min_temperature > 0.0 {
                self.min_temperature
            } else {
                defaults.min_temperature
            },
            steps_per_temperature: self.steps_per_temperature.max(1),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneticSettings {
    pub population_size: usize,
    pub generations: u64,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub tournament_size: usize,
    pub elite_count: usize,
    /// Stop after this many generations without a better chromosome. 0 disables.
    pub stall_generations: u64,
}

impl Default for GeneticSettings {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 200,
            crossover_rate: 0.8,
            mutation_rate: 0.1,
            tournament_size: 3,
            elite_count: 2,
            stall_generations: 50,
        }
    }
}

impl GeneticSettings {
    pub fn sanitized(&self) -> Self {
        let population_size = self.population_size.max(2);
        Self {
            population_size,
            crossover_rate: clamp_probability(self.crossover_rate),
            mutation_rate: clamp_probability(self.mutation_rate),
            tournament_size: self.tournament_size.max(1),
            elite_count: self.elite_count.clamp(1, population_size),
            ..self.clone()
        }
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}
