//! Builders for test data.

use crate::data::{Catalog, ConstraintSet, Course, Enrollment, Room, SessionWindow};
use chrono::NaiveDate;
use std::collections::HashSet;

const SESSIONS: [(&str, &str); 4] = [
    ("09:00", "12:00"),
    ("14:00", "17:00"),
    ("17:30", "20:30"),
    ("06:00", "08:30"),
];

pub fn course(code: &str, instructor: &str, expected_students: u32) -> Course {
    Course {
        code: code.to_string(),
        name: format!("Course {code}"),
        instructor: instructor.to_string(),
        expected_students,
        credits: 3,
    }
}

pub fn enroll(student: &str, course: &str) -> Enrollment {
    Enrollment {
        student_id: student.to_string(),
        course_code: course.to_string(),
    }
}

pub fn room(id: &str, capacity: u32) -> Room {
    Room {
        room_id: id.to_string(),
        capacity,
        building: None,
        floor: None,
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Monday 2025-07-07 only, with `sessions` sessions and every optional check switched off.
pub fn one_day_constraints(sessions: usize) -> ConstraintSet {
    ConstraintSet {
        start_date: date(2025, 7, 7),
        end_date: Some(date(2025, 7, 7)),
        exam_duration_minutes: 150,
        max_exams_per_day: 0,
        time_slots: SESSIONS
            .iter()
            .take(sessions)
            .map(|(start, end)| SessionWindow::new(start, end))
            .collect(),
        excluded_days: HashSet::new(),
        ..ConstraintSet::default()
    }
}

/// Monday 2025-07-07 to Friday 2025-07-11 with the default sessions.
pub fn week_constraints() -> ConstraintSet {
    ConstraintSet {
        start_date: date(2025, 7, 7),
        end_date: Some(date(2025, 7, 11)),
        ..ConstraintSet::default()
    }
}

/// Three courses: A and B share ten students, A and C share instructor X. One room of 60 seats.
pub fn three_course_catalog() -> Catalog {
    let mut enrollments = Vec::new();
    for i in 0..50 {
        enrollments.push(enroll(&format!("a{i:02}"), "A"));
    }
    // ten of A's students also take B
    for i in 0..10 {
        enrollments.push(enroll(&format!("a{i:02}"), "B"));
    }
    for i in 0..20 {
        enrollments.push(enroll(&format!("b{i:02}"), "B"));
    }
    for i in 0..20 {
        enrollments.push(enroll(&format!("c{i:02}"), "C"));
    }
    Catalog {
        courses: vec![
            course("A", "X", 50),
            course("B", "Y", 30),
            course("C", "X", 20),
        ],
        rooms: vec![room("R60", 60)],
        enrollments,
    }
}

/// Twelve courses over four instructors with overlapping cohorts and three rooms.
pub fn department_catalog() -> Catalog {
    let instructors = ["Rao", "Iyer", "Menon", "Das"];
    let courses: Vec<Course> = (0..12)
        .map(|i| {
            course(
                &format!("CS{:03}", 101 + i),
                instructors[i % instructors.len()],
                0,
            )
        })
        .collect();
    let mut enrollments = Vec::new();
    for student in 0..90 {
        // each student takes three consecutive courses of their cohort
        let first = (student % 10) as usize;
        for offset in 0..3 {
            let code = &courses[(first + offset) % courses.len()].code;
            enrollments.push(enroll(&format!("s{student:03}"), code));
        }
    }
    Catalog {
        courses,
        rooms: vec![room("HALL-A", 40), room("ROOM-101", 30), room("LAB-A", 20)],
        enrollments,
    }
}
