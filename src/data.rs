use chrono::{DateTime, Duration, Local, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use uuid::Uuid;

// Type aliases for clarity
pub type CourseCode = String;
pub type RoomId = String;
pub type StudentId = String;

/// A course whose exam has to be placed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Course {
    pub code: CourseCode,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub instructor: String,
    /// Seats the exam needs. 0 means unknown; the roster size is used instead.
    #[serde(default)]
    pub expected_students: u32,
    #[serde(default)]
    pub credits: u32,
}

/// One student taking one course.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct Enrollment {
    pub student_id: StudentId,
    pub course_code: CourseCode,
}

/// Represents a physical room with a given capacity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Room {
    pub room_id: RoomId,
    pub capacity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<i32>,
}

/// Everything the scheduler reads: a snapshot of the course, room and enrollment records.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Catalog {
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
}

/// A daily exam session, e.g. `09:00`-`12:00`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionWindow {
    pub start: String,
    pub end: String,
}

impl SessionWindow {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    pub fn label(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

/// How `max_exams_per_day` is counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxExamsScope {
    /// No student sits more than the limit on one day.
    #[default]
    PerStudent,
    /// No more than the limit of exams take place on one day.
    Global,
}

/// Constraints supplied with each generation request. Missing fields take the documented defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConstraintSet {
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    /// Defaults to two weeks after `start_date`.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_exam_duration")]
    pub exam_duration_minutes: u32,
    /// 0 disables the check.
    #[serde(default = "default_max_exams_per_day")]
    pub max_exams_per_day: u32,
    #[serde(default)]
    pub max_exams_scope: MaxExamsScope,
    #[serde(default = "default_time_slots")]
    pub time_slots: Vec<SessionWindow>,
    #[serde(default = "default_excluded_days")]
    pub excluded_days: HashSet<Weekday>,
    /// Hours between the starts of two exams that share a student or instructor. 0 disables.
    #[serde(default)]
    pub min_gap_between_exams: u32,
    #[serde(default)]
    pub professor_absences: BTreeMap<String, BTreeSet<NaiveDate>>,
}

fn default_start_date() -> NaiveDate {
    Local::now().date_naive()
}

fn default_exam_duration() -> u32 {
    180
}

fn default_max_exams_per_day() -> u32 {
    2
}

fn default_time_slots() -> Vec<SessionWindow> {
    vec![
        SessionWindow::new("09:00", "12:00"),
        SessionWindow::new("14:00", "17:00"),
    ]
}

fn default_excluded_days() -> HashSet<Weekday> {
    HashSet::from([Weekday::Sat, Weekday::Sun])
}

impl Default for ConstraintSet {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            end_date: None,
            exam_duration_minutes: default_exam_duration(),
            max_exams_per_day: default_max_exams_per_day(),
            max_exams_scope: MaxExamsScope::default(),
            time_slots: default_time_slots(),
            excluded_days: default_excluded_days(),
            min_gap_between_exams: 0,
            professor_absences: BTreeMap::new(),
        }
    }
}

impl ConstraintSet {
    pub fn end_date(&self) -> NaiveDate {
        self.end_date.unwrap_or_else(|| {
            self.start_date
                .checked_add_signed(Duration::days(13))
                .unwrap_or(NaiveDate::MAX)
        })
    }
}

/// A `(date, session)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub session: String,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.session)
    }
}

/// Represents a single, scheduled exam.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ExamAssignment {
    pub course_code: CourseCode,
    pub date: NaiveDate,
    pub session: String,
    pub room_id: RoomId,
}

impl ExamAssignment {
    pub fn slot(&self) -> Slot {
        Slot {
            date: self.date,
            session: self.session.clone(),
        }
    }
}

/// The solvers offered to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    GraphColoring,
    SimulatedAnnealing,
    Genetic,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [
        Algorithm::GraphColoring,
        Algorithm::SimulatedAnnealing,
        Algorithm::Genetic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::GraphColoring => "graph_coloring",
            Algorithm::SimulatedAnnealing => "simulated_annealing",
            Algorithm::Genetic => "genetic",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Algorithm {
    type Err = crate::error::ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| crate::error::ScheduleError::UnknownAlgorithm(s.to_string()))
    }
}

/// Numbers describing how a solve went.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolveStats {
    pub initial_cost: f64,
    pub final_cost: f64,
    pub iterations: u64,
    pub elapsed_ms: u64,
    /// The time limit or a cancellation stopped the search early.
    pub interrupted: bool,
}

/// A generated exam timetable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    pub id: Uuid,
    pub algorithm: Algorithm,
    pub created_at: DateTime<Utc>,
    pub assignments: Vec<ExamAssignment>,
    pub stats: SolveStats,
}

impl Schedule {
    pub fn new(algorithm: Algorithm, assignments: Vec<ExamAssignment>, stats: SolveStats) -> Self {
        Self {
            id: Uuid::new_v4(),
            algorithm,
            created_at: Utc::now(),
            assignments,
            stats,
        }
    }
}

/// The kinds of problems the validator reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    RoomDoubleBooking,
    CapacityExceeded,
    ConflictingCourses,
    InstructorAbsent,
    ExcludedDay,
    MaxExamsPerDay,
    MinimumGap,
    InvalidSlot,
    Unscheduled,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::RoomDoubleBooking => "room_double_booking",
            ConflictKind::CapacityExceeded => "capacity_exceeded",
            ConflictKind::ConflictingCourses => "conflicting_courses",
            ConflictKind::InstructorAbsent => "instructor_absent",
            ConflictKind::ExcludedDay => "excluded_day",
            ConflictKind::MaxExamsPerDay => "max_exams_per_day",
            ConflictKind::MinimumGap => "minimum_gap",
            ConflictKind::InvalidSlot => "invalid_slot",
            ConflictKind::Unscheduled => "unscheduled",
        }
    }
}

/// A constraint violation found in a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub message: String,
    pub courses_involved: Vec<CourseCode>,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)
    }
}
