use crate::config::SolverSettings;
use crate::data::{Algorithm, Catalog, ConstraintSet, Course, CourseCode};
use crate::error::ScheduleError;
use crate::graph::ConflictGraph;
use crate::problem::Problem;
use crate::solver::{Budget, solver_for};
use crate::store::{Generated, ScheduleStore};
use crate::validate::validate;
use itertools::Itertools;
use log::{info, warn};
use std::collections::HashSet;
use std::sync::Arc;

/// Which courses to schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Courses(Vec<CourseCode>),
}

/// One generation request, already parsed.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub selection: Selection,
    pub algorithm: Algorithm,
    pub constraints: ConstraintSet,
    pub settings: SolverSettings,
}

/// Runs generation requests and keeps the current and previous result.
#[derive(Debug, Default)]
pub struct Scheduler {
    store: ScheduleStore,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    /// Plans a schedule and makes it the current one; the old current becomes the past schedule.
    pub fn generate(
        &self,
        catalog: &Catalog,
        request: &GenerateRequest,
        budget: &Budget,
    ) -> Result<Arc<Generated>, ScheduleError> {
        let generated = plan(catalog, request, budget)?;
        Ok(self.store.publish(generated))
    }
}

/// Builds the conflict graph, runs the requested solver and validates what it returns.
///
/// Input errors are reported before any solving. An infeasible result is not an error; its
/// violations come back in `conflicts`.
pub fn plan(
    catalog: &Catalog,
    request: &GenerateRequest,
    budget: &Budget,
) -> Result<Generated, ScheduleError> {
    let courses = select_courses(catalog, &request.selection)?;
    if catalog.rooms.is_empty() {
        return Err(ScheduleError::NoRooms);
    }

    let selected: HashSet<&str> = courses.iter().map(|c| c.code.as_str()).collect();
    let enrollments: Vec<_> = catalog
        .enrollments
        .iter()
        .filter(|e| selected.contains(e.course_code.as_str()))
        .cloned()
        .collect();
    info!(
        "Scheduling {} courses with {} enrollments and {} rooms using {}.",
        courses.len(),
        enrollments.len(),
        catalog.rooms.len(),
        request.algorithm
    );

    let graph = ConflictGraph::build(&courses, &enrollments);
    let courses = with_headcounts(courses, &graph);
    let problem = Problem::new(
        &courses,
        &catalog.rooms,
        graph,
        request.constraints.clone(),
    )?;

    let solver = solver_for(request.algorithm, &request.settings);
    let schedule = solver
        .solve(&problem, budget)
        .into_schedule(&problem, request.algorithm);
    let conflicts = validate(&schedule.assignments, &problem);

    if conflicts.is_empty() {
        info!("Schedule {} is feasible.", schedule.id);
    } else {
        warn!(
            "Schedule {} has {} unresolved conflicts.",
            schedule.id,
            conflicts.len()
        );
    }
    Ok(Generated {
        schedule,
        conflicts,
        courses,
        enrollments,
    })
}

fn select_courses(catalog: &Catalog, selection: &Selection) -> Result<Vec<Course>, ScheduleError> {
    let courses: Vec<Course> = match selection {
        Selection::All => catalog.courses.clone(),
        Selection::Courses(codes) => codes
            .iter()
            .map(|code| code.trim())
            .unique()
            .map(|code| {
                catalog
                    .courses
                    .iter()
                    .find(|c| c.code == code)
                    .cloned()
                    .ok_or_else(|| ScheduleError::UnknownCourse(code.to_string()))
            })
            .collect::<Result<_, _>>()?,
    };
    if courses.is_empty() {
        return Err(ScheduleError::EmptyCourseSet);
    }
    Ok(courses)
}

/// Courses without an expected headcount are sized by their roster.
fn with_headcounts(courses: Vec<Course>, graph: &ConflictGraph) -> Vec<Course> {
    courses
        .into_iter()
        .map(|mut course| {
            if course.expected_students == 0 {
                if let Some(vertex) = graph.index_of(&course.code) {
                    course.expected_students =
                        u32::try_from(graph.roster(vertex).len()).unwrap_or(u32::MAX);
                }
            }
            course
        })
        .collect()
}
