//! Hard-constraint checks over a candidate schedule.
//!
//! The checks are written once, against resolved [`Placement`]s, and report through a
//! [`ViolationSink`]. [`validate`] collects them as [`Conflict`]s for callers; the solvers' cost
//! function feeds the same audit into a weighted tally.

use crate::data::{Conflict, ConflictKind, ExamAssignment, MaxExamsScope};
use crate::graph::EdgeInfo;
use crate::problem::{Placement, Problem};
use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};

/// Receives every violation found by [`audit`].
pub trait ViolationSink {
    /// `amount` scales the violation for cost purposes; `message` is only built by sinks that need it.
    fn record(
        &mut self,
        kind: ConflictKind,
        courses: &[usize],
        amount: f64,
        message: impl FnOnce() -> String,
    );
}

/// Builds [`Conflict`]s for callers.
pub struct ConflictCollector<'a> {
    problem: &'a Problem,
    conflicts: Vec<Conflict>,
}

impl<'a> ConflictCollector<'a> {
    pub fn new(problem: &'a Problem) -> Self {
        Self {
            problem,
            conflicts: Vec::new(),
        }
    }

    pub fn into_conflicts(self) -> Vec<Conflict> {
        self.conflicts
    }

    fn push(&mut self, kind: ConflictKind, courses_involved: Vec<String>, message: String) {
        self.conflicts.push(Conflict {
            kind,
            message,
            courses_involved,
        });
    }
}

impl ViolationSink for ConflictCollector<'_> {
    fn record(
        &mut self,
        kind: ConflictKind,
        courses: &[usize],
        _amount: f64,
        message: impl FnOnce() -> String,
    ) {
        let codes = courses
            .iter()
            .map(|&c| self.problem.course(c).code.clone())
            .collect();
        self.push(kind, codes, message());
    }
}

/// Checks a schedule against every hard constraint and returns all violations. Empty means feasible.
pub fn validate(assignments: &[ExamAssignment], problem: &Problem) -> Vec<Conflict> {
    let mut collector = ConflictCollector::new(problem);
    let placements = resolve(assignments, problem, &mut collector);
    audit(problem, &placements, &mut collector);
    collector.into_conflicts()
}

/// Maps string-keyed assignments onto the problem's indices.
///
/// Assignments naming unknown courses, rooms or sessions, or dates outside the exam window, are
/// reported as `invalid_slot` and left out. Courses with no assignment or with more than one are
/// reported as `unscheduled`; only the first assignment of a duplicated course is kept.
pub fn resolve(
    assignments: &[ExamAssignment],
    problem: &Problem,
    sink: &mut ConflictCollector<'_>,
) -> Vec<Placement> {
    let constraints = problem.constraints();
    let mut placements: Vec<Placement> = Vec::with_capacity(assignments.len());
    let mut seen = vec![0usize; problem.course_count()];

    for assignment in assignments {
        let Some(course) = problem.graph().index_of(&assignment.course_code) else {
            sink.push(
                ConflictKind::InvalidSlot,
                vec![assignment.course_code.clone()],
                format!(
                    "{} is not one of the courses being scheduled",
                    assignment.course_code
                ),
            );
            continue;
        };
        seen[course] += 1;
        if seen[course] > 1 {
            continue;
        }

        let room = problem.room_index(&assignment.room_id);
        let session = problem.session_index(&assignment.session);
        let in_window =
            assignment.date >= constraints.start_date && assignment.date <= constraints.end_date();
        match (room, session) {
            (Some(room), Some(session)) if in_window => placements.push(Placement {
                course,
                date: assignment.date,
                session,
                room,
            }),
            _ => {
                let reason = if room.is_none() {
                    format!("room {} does not exist", assignment.room_id)
                } else if session.is_none() {
                    format!("session {} is not a configured time slot", assignment.session)
                } else {
                    format!("{} is outside the exam window", assignment.date)
                };
                sink.push(
                    ConflictKind::InvalidSlot,
                    vec![assignment.course_code.clone()],
                    format!("{}: {}", assignment.course_code, reason),
                );
            }
        }
    }

    for (course, &count) in seen.iter().enumerate() {
        let code = &problem.course(course).code;
        match count {
            0 => sink.push(
                ConflictKind::Unscheduled,
                vec![code.clone()],
                format!("{code} has no exam in the schedule"),
            ),
            1 => {}
            n => sink.push(
                ConflictKind::Unscheduled,
                vec![code.clone()],
                format!("{code} is scheduled {n} times"),
            ),
        }
    }

    placements
}

/// Runs every check over the placements. Each check is independent; nothing stops at the first hit.
pub fn audit<S: ViolationSink>(problem: &Problem, placements: &[Placement], sink: &mut S) {
    check_room_double_booking(problem, placements, sink);
    check_capacity(problem, placements, sink);
    check_conflicting_courses(problem, placements, sink);
    check_instructor_absence(problem, placements, sink);
    check_excluded_days(problem, placements, sink);
    check_exams_per_day(problem, placements, sink);
    check_minimum_gap(problem, placements, sink);
}

fn slot_label(problem: &Problem, date: NaiveDate, session: usize) -> String {
    format!("{} {}", date, problem.sessions()[session].label)
}

fn check_room_double_booking<S: ViolationSink>(
    problem: &Problem,
    placements: &[Placement],
    sink: &mut S,
) {
    let by_room: BTreeMap<(NaiveDate, usize, usize), Vec<usize>> = placements
        .iter()
        .map(|p| ((p.date, p.session, p.room), p.course))
        .into_group_map()
        .into_iter()
        .collect();

    for ((date, session, room), courses) in by_room {
        if courses.len() < 2 {
            continue;
        }
        let courses: Vec<usize> = courses.into_iter().sorted().collect();
        sink.record(
            ConflictKind::RoomDoubleBooking,
            &courses,
            (courses.len() - 1) as f64,
            || {
                format!(
                    "Room {} is booked for {} exams on {}: {}",
                    problem.room(room).room_id,
                    courses.len(),
                    slot_label(problem, date, session),
                    courses.iter().map(|&c| &problem.course(c).code).join(", ")
                )
            },
        );
    }
}

fn check_capacity<S: ViolationSink>(problem: &Problem, placements: &[Placement], sink: &mut S) {
    for p in placements {
        let course = problem.course(p.course);
        let room = problem.room(p.room);
        if course.expected_students > room.capacity {
            sink.record(ConflictKind::CapacityExceeded, &[p.course], 1.0, || {
                format!(
                    "{} expects {} students but room {} seats {}",
                    course.code, course.expected_students, room.room_id, room.capacity
                )
            });
        }
    }
}

fn describe_edge(problem: &Problem, a: usize, b: usize, info: &EdgeInfo) -> String {
    let mut reasons = Vec::new();
    if info.shared_students > 0 {
        reasons.push(format!("share {} students", info.shared_students));
    }
    if info.shared_instructor {
        reasons.push(format!("share instructor {}", problem.course(a).instructor.trim()));
    }
    format!(
        "{} and {} {}",
        problem.course(a).code,
        problem.course(b).code,
        reasons.join(" and ")
    )
}

fn placed_by_course(problem: &Problem, placements: &[Placement]) -> Vec<Option<Placement>> {
    let mut placed = vec![None; problem.course_count()];
    for p in placements {
        placed[p.course] = Some(*p);
    }
    placed
}

fn check_conflicting_courses<S: ViolationSink>(
    problem: &Problem,
    placements: &[Placement],
    sink: &mut S,
) {
    let placed = placed_by_course(problem, placements);
    for (a, b, info) in problem.graph().edge_pairs() {
        let (Some(pa), Some(pb)) = (placed[a], placed[b]) else {
            continue;
        };
        if pa.date == pb.date && pa.session == pb.session {
            sink.record(ConflictKind::ConflictingCourses, &[a, b], 1.0, || {
                format!(
                    "{} but are both scheduled on {}",
                    describe_edge(problem, a, b, info),
                    slot_label(problem, pa.date, pa.session)
                )
            });
        }
    }
}

fn check_instructor_absence<S: ViolationSink>(
    problem: &Problem,
    placements: &[Placement],
    sink: &mut S,
) {
    for p in placements {
        if problem.is_absent(p.course, p.date) {
            let course = problem.course(p.course);
            sink.record(ConflictKind::InstructorAbsent, &[p.course], 1.0, || {
                format!(
                    "{} is scheduled on {} but instructor {} is absent that day",
                    course.code,
                    p.date,
                    course.instructor.trim()
                )
            });
        }
    }
}

fn check_excluded_days<S: ViolationSink>(
    problem: &Problem,
    placements: &[Placement],
    sink: &mut S,
) {
    let excluded = &problem.constraints().excluded_days;
    for p in placements {
        if excluded.contains(&p.date.weekday()) {
            sink.record(ConflictKind::ExcludedDay, &[p.course], 1.0, || {
                format!(
                    "{} is scheduled on {} which is a {:?}, an excluded day",
                    problem.course(p.course).code,
                    p.date,
                    p.date.weekday()
                )
            });
        }
    }
}

fn check_exams_per_day<S: ViolationSink>(
    problem: &Problem,
    placements: &[Placement],
    sink: &mut S,
) {
    let constraints = problem.constraints();
    let limit = constraints.max_exams_per_day as usize;
    if limit == 0 {
        return;
    }

    match constraints.max_exams_scope {
        MaxExamsScope::Global => {
            let by_date: BTreeMap<NaiveDate, Vec<usize>> = placements
                .iter()
                .map(|p| (p.date, p.course))
                .into_group_map()
                .into_iter()
                .collect();
            for (date, courses) in by_date {
                if courses.len() <= limit {
                    continue;
                }
                let courses: Vec<usize> = courses.into_iter().sorted().collect();
                sink.record(
                    ConflictKind::MaxExamsPerDay,
                    &courses,
                    (courses.len() - limit) as f64,
                    || {
                        format!(
                            "{} exams are scheduled on {}, more than the limit of {}",
                            courses.len(),
                            date,
                            limit
                        )
                    },
                );
            }
        }
        MaxExamsScope::PerStudent => {
            let placed = placed_by_course(problem, placements);
            // (date, courses that day) -> number of students sitting all of them
            let mut overloaded: BTreeMap<(NaiveDate, Vec<usize>), usize> = BTreeMap::new();
            for (_, taken) in problem.busy_students() {
                if taken.len() <= limit {
                    continue;
                }
                let by_date: HashMap<NaiveDate, Vec<usize>> = taken
                    .iter()
                    .filter_map(|&c| placed[c].map(|p| (p.date, c)))
                    .into_group_map();
                for (date, courses) in by_date {
                    if courses.len() > limit {
                        let courses = courses.into_iter().sorted().collect();
                        *overloaded.entry((date, courses)).or_default() += 1;
                    }
                }
            }
            for ((date, courses), students) in overloaded {
                sink.record(ConflictKind::MaxExamsPerDay, &courses, 1.0, || {
                    format!(
                        "{} students have {} exams on {} ({}), more than the limit of {}",
                        students,
                        courses.len(),
                        date,
                        courses.iter().map(|&c| &problem.course(c).code).join(", "),
                        limit
                    )
                });
            }
        }
    }
}

fn check_minimum_gap<S: ViolationSink>(
    problem: &Problem,
    placements: &[Placement],
    sink: &mut S,
) {
    let min_gap_minutes = i64::from(problem.constraints().min_gap_between_exams) * 60;
    if min_gap_minutes == 0 {
        return;
    }
    let placed = placed_by_course(problem, placements);
    for (a, b, info) in problem.graph().edge_pairs() {
        let (Some(pa), Some(pb)) = (placed[a], placed[b]) else {
            continue;
        };
        // same slot is already a conflicting_courses violation
        if pa.date == pb.date && pa.session == pb.session {
            continue;
        }
        let gap = (problem.start_time(pa.date, pa.session) - problem.start_time(pb.date, pb.session))
            .num_minutes()
            .abs();
        if gap < min_gap_minutes {
            sink.record(ConflictKind::MinimumGap, &[a, b], 1.0, || {
                format!(
                    "{}: their exams start {:.1} hours apart, less than the required {}",
                    describe_edge(problem, a, b, info),
                    gap as f64 / 60.0,
                    problem.constraints().min_gap_between_exams
                )
            });
        }
    }
}
