//! Exam timetable generation: conflict graph, constraint validation and three interchangeable
//! solvers behind a small HTTP API.

pub mod config;
pub mod cost;
pub mod data;
pub mod error;
pub mod graph;
pub mod problem;
pub mod scheduler;
pub mod server;
pub mod solver;
pub mod store;
pub mod validate;

#[cfg(test)]
mod fixtures;
