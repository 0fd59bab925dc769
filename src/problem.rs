use crate::data::{ConstraintSet, Course, ExamAssignment, Room, StudentId};
use crate::error::ScheduleError;
use crate::graph::ConflictGraph;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use itertools::Itertools;
use log::trace;
use rand::Rng;
use std::collections::{BTreeSet, HashMap};

/// Longest exam window accepted, in days, both ends included.
pub const MAX_WINDOW_DAYS: i64 = 366;

/// A parsed session window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub label: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// One entry of the legal slot sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    pub date: NaiveDate,
    pub session: usize,
}

/// A course's position in a candidate schedule: indices into the slot sequence and the room list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gene {
    pub slot: usize,
    pub room: usize,
}

/// A resolved exam placement. Unlike a [`Gene`], the date may lie outside the legal slot space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub course: usize,
    pub date: NaiveDate,
    pub session: usize,
    pub room: usize,
}

/// Everything a solver needs for one run: courses, rooms, conflict graph and the resolved slot space.
///
/// Courses are stored in the graph's vertex order, so a course index is also its vertex.
#[derive(Debug, Clone)]
pub struct Problem {
    courses: Vec<Course>,
    rooms: Vec<Room>,
    rooms_by_capacity: Vec<usize>,
    room_index: HashMap<String, usize>,
    graph: ConflictGraph,
    constraints: ConstraintSet,
    sessions: Vec<Session>,
    session_index: HashMap<String, usize>,
    slots: Vec<SlotInfo>,
    legal: Vec<Vec<usize>>,
    absences: Vec<BTreeSet<NaiveDate>>,
    busy_students: Vec<(StudentId, Vec<usize>)>,
}

impl Problem {
    pub fn new(
        courses: &[Course],
        rooms: &[Room],
        graph: ConflictGraph,
        constraints: ConstraintSet,
    ) -> Result<Self, ScheduleError> {
        if courses.is_empty() {
            return Err(ScheduleError::EmptyCourseSet);
        }
        if rooms.is_empty() {
            return Err(ScheduleError::NoRooms);
        }
        if constraints.exam_duration_minutes == 0 {
            return Err(ScheduleError::InvalidConstraints(
                "exam duration must be positive".to_string(),
            ));
        }

        let by_code: HashMap<&str, &Course> = courses.iter().map(|c| (c.code.as_str(), c)).collect();
        if let Some(missing) = courses.iter().find(|c| graph.index_of(&c.code).is_none()) {
            return Err(ScheduleError::UnknownCourse(missing.code.clone()));
        }
        let courses: Vec<Course> = graph
            .codes()
            .iter()
            .map(|code| {
                by_code
                    .get(code.as_str())
                    .map(|c| (*c).clone())
                    .ok_or_else(|| ScheduleError::UnknownCourse(code.clone()))
            })
            .collect::<Result<_, _>>()?;

        let sessions = parse_sessions(&constraints)?;
        let session_index = sessions
            .iter()
            .enumerate()
            .map(|(i, s)| (s.label.clone(), i))
            .collect();

        let end_date = constraints.end_date();
        if end_date < constraints.start_date {
            return Err(ScheduleError::InvalidConstraints(format!(
                "end date {} is before start date {}",
                end_date, constraints.start_date
            )));
        }
        let window_days = (end_date - constraints.start_date).num_days() + 1;
        if window_days > MAX_WINDOW_DAYS {
            return Err(ScheduleError::InvalidConstraints(format!(
                "exam window of {window_days} days exceeds the limit of {MAX_WINDOW_DAYS}"
            )));
        }
        let slots: Vec<SlotInfo> = constraints
            .start_date
            .iter_days()
            .take_while(|d| *d <= end_date)
            .filter(|d| !constraints.excluded_days.contains(&d.weekday()))
            .flat_map(|date| (0..sessions.len()).map(move |session| SlotInfo { date, session }))
            .collect();
        if slots.is_empty() {
            return Err(ScheduleError::InvalidConstraints(
                "no exam days left between start and end date".to_string(),
            ));
        }

        let absent_by_instructor: HashMap<String, BTreeSet<NaiveDate>> = constraints
            .professor_absences
            .iter()
            .map(|(name, dates)| (name.trim().to_lowercase(), dates.clone()))
            .collect();
        let absences: Vec<BTreeSet<NaiveDate>> = courses
            .iter()
            .map(|c| {
                absent_by_instructor
                    .get(&c.instructor.trim().to_lowercase())
                    .cloned()
                    .unwrap_or_default()
            })
            .collect();
        let legal = absences
            .iter()
            .map(|absent| {
                let open: Vec<usize> = (0..slots.len())
                    .filter(|&s| !absent.contains(&slots[s].date))
                    .collect();
                // an instructor away for the whole window still needs a slot
                if open.is_empty() {
                    (0..slots.len()).collect()
                } else {
                    open
                }
            })
            .collect();

        let rooms = rooms.to_vec();
        let rooms_by_capacity = (0..rooms.len())
            .sorted_by(|&a, &b| {
                rooms[a]
                    .capacity
                    .cmp(&rooms[b].capacity)
                    .then_with(|| rooms[a].room_id.cmp(&rooms[b].room_id))
            })
            .collect();
        let room_index = rooms
            .iter()
            .enumerate()
            .map(|(i, r)| (r.room_id.clone(), i))
            .collect();

        let busy_students = graph
            .student_courses()
            .into_iter()
            .filter(|(_, taken)| taken.len() > 1)
            .map(|(student, taken)| (student.to_string(), taken))
            .collect();

        trace!(
            "Resolved {} slots ({} sessions per day) for {} courses and {} rooms.",
            slots.len(),
            sessions.len(),
            courses.len(),
            rooms.len()
        );

        Ok(Problem {
            courses,
            rooms,
            rooms_by_capacity,
            room_index,
            graph,
            constraints,
            sessions,
            session_index,
            slots,
            legal,
            absences,
            busy_students,
        })
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn course(&self, course: usize) -> &Course {
        &self.courses[course]
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, room: usize) -> &Room {
        &self.rooms[room]
    }

    /// Room indices by ascending capacity, ties broken by room id.
    pub fn rooms_by_capacity(&self) -> &[usize] {
        &self.rooms_by_capacity
    }

    pub fn room_index(&self, room_id: &str) -> Option<usize> {
        self.room_index.get(room_id).copied()
    }

    pub fn graph(&self) -> &ConflictGraph {
        &self.graph
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn session_index(&self, label: &str) -> Option<usize> {
        self.session_index.get(label).copied()
    }

    pub fn slots(&self) -> &[SlotInfo] {
        &self.slots
    }

    pub fn slot(&self, slot: usize) -> SlotInfo {
        self.slots[slot]
    }

    /// Slots the course may use: the slot space minus its instructor's absence dates.
    pub fn legal_slots(&self, course: usize) -> &[usize] {
        &self.legal[course]
    }

    pub fn is_absent(&self, course: usize, date: NaiveDate) -> bool {
        self.absences[course].contains(&date)
    }

    /// Students taking more than one of the courses, with the courses they take.
    pub fn busy_students(&self) -> &[(StudentId, Vec<usize>)] {
        &self.busy_students
    }

    pub fn start_time(&self, date: NaiveDate, session: usize) -> NaiveDateTime {
        date.and_time(self.sessions[session].start)
    }

    pub fn placement(&self, course: usize, gene: Gene) -> Placement {
        let slot = self.slots[gene.slot];
        Placement {
            course,
            date: slot.date,
            session: slot.session,
            room: gene.room,
        }
    }

    pub fn placements(&self, genes: &[Gene]) -> Vec<Placement> {
        genes
            .iter()
            .enumerate()
            .map(|(course, gene)| self.placement(course, *gene))
            .collect()
    }

    /// A uniformly random legal slot and room for the course.
    pub fn random_gene<R: Rng + ?Sized>(&self, course: usize, rng: &mut R) -> Gene {
        let legal = &self.legal[course];
        Gene {
            slot: legal[rng.random_range(0..legal.len())],
            room: rng.random_range(0..self.rooms.len()),
        }
    }

    pub fn random_genes<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Gene> {
        (0..self.courses.len())
            .map(|course| self.random_gene(course, rng))
            .collect()
    }

    /// Converts genes into assignments ordered by date, session, room and course code.
    pub fn to_assignments(&self, genes: &[Gene]) -> Vec<ExamAssignment> {
        genes
            .iter()
            .enumerate()
            .map(|(course, gene)| {
                let slot = self.slots[gene.slot];
                (slot.date, slot.session, gene.room, course)
            })
            .sorted_by(|a, b| {
                (a.0, a.1)
                    .cmp(&(b.0, b.1))
                    .then_with(|| self.rooms[a.2].room_id.cmp(&self.rooms[b.2].room_id))
                    .then_with(|| self.courses[a.3].code.cmp(&self.courses[b.3].code))
            })
            .map(|(date, session, room, course)| ExamAssignment {
                course_code: self.courses[course].code.clone(),
                date,
                session: self.sessions[session].label.clone(),
                room_id: self.rooms[room].room_id.clone(),
            })
            .collect()
    }
}

fn parse_sessions(constraints: &ConstraintSet) -> Result<Vec<Session>, ScheduleError> {
    if constraints.time_slots.is_empty() {
        return Err(ScheduleError::InvalidConstraints(
            "at least one time slot is required".to_string(),
        ));
    }
    let parse = |value: &str| {
        NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| {
            ScheduleError::InvalidConstraints(format!("time '{}' is not in HH:MM format", value))
        })
    };
    let mut sessions = Vec::with_capacity(constraints.time_slots.len());
    for window in &constraints.time_slots {
        let start = parse(&window.start)?;
        let end = parse(&window.end)?;
        if end <= start {
            return Err(ScheduleError::InvalidConstraints(format!(
                "time slot {} ends before it starts",
                window.label()
            )));
        }
        sessions.push(Session {
            label: window.label(),
            start,
            end,
        });
    }
    sessions.sort_by_key(|s| (s.start, s.end));
    if let Some(pair) = sessions.windows(2).find(|w| w[0].label == w[1].label) {
        return Err(ScheduleError::InvalidConstraints(format!(
            "time slot {} is listed twice",
            pair[0].label
        )));
    }
    Ok(sessions)
}
