use crate::data::{Course, CourseCode, Enrollment, StudentId};
use itertools::Itertools;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Why two courses cannot share a slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeInfo {
    pub shared_students: u32,
    pub shared_instructor: bool,
}

impl EdgeInfo {
    /// Conflict weight: shared students, plus one for a shared instructor.
    pub fn weight(&self) -> u32 {
        self.shared_students + u32::from(self.shared_instructor)
    }
}

/// One edge of the graph as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictEdge {
    pub a: CourseCode,
    pub b: CourseCode,
    pub shared_students: u32,
    pub shared_instructor: bool,
}

/// Undirected graph over courses; an edge means the two exams cannot run in the same slot.
///
/// Vertices are numbered in ascending course-code order so that every traversal is deterministic.
#[derive(Debug, Clone, Default)]
pub struct ConflictGraph {
    codes: Vec<CourseCode>,
    index: HashMap<CourseCode, usize>,
    adjacency: Vec<BTreeMap<usize, EdgeInfo>>,
    rosters: Vec<BTreeSet<StudentId>>,
}

impl ConflictGraph {
    /// Builds the graph from the courses and their enrollments.
    ///
    /// Enrollments for courses that are not in `courses` are ignored, duplicate rows are counted once.
    pub fn build(courses: &[Course], enrollments: &[Enrollment]) -> Self {
        let codes: Vec<CourseCode> = courses.iter().map(|c| c.code.clone()).sorted().dedup().collect();
        let index: HashMap<CourseCode, usize> = codes
            .iter()
            .enumerate()
            .map(|(i, code)| (code.clone(), i))
            .collect();
        let mut graph = ConflictGraph {
            adjacency: vec![BTreeMap::new(); codes.len()],
            rosters: vec![BTreeSet::new(); codes.len()],
            codes,
            index,
        };

        // dedup on (student, course) before pairing
        let unique: BTreeSet<(&str, usize)> = enrollments
            .iter()
            .filter_map(|e| {
                graph
                    .index
                    .get(&e.course_code)
                    .map(|&i| (e.student_id.as_str(), i))
            })
            .collect();

        for &(student, course) in &unique {
            graph.rosters[course].insert(student.to_string());
        }

        let by_student: HashMap<&str, Vec<usize>> = unique.into_iter().into_group_map();
        for courses_taken in by_student.values() {
            for (a, b) in courses_taken.iter().tuple_combinations() {
                graph.link(*a, *b, |edge| edge.shared_students += 1);
            }
        }

        let by_instructor: HashMap<String, Vec<usize>> = courses
            .iter()
            .filter(|c| !c.instructor.trim().is_empty())
            .filter_map(|c| {
                graph
                    .index
                    .get(&c.code)
                    .map(|&i| (c.instructor.trim().to_lowercase(), i))
            })
            .into_group_map();
        for taught in by_instructor.values() {
            for (a, b) in taught.iter().sorted().dedup().tuple_combinations() {
                graph.link(*a, *b, |edge| edge.shared_instructor = true);
            }
        }

        debug!(
            "Built conflict graph with {} courses and {} edges.",
            graph.len(),
            graph.edge_count()
        );
        graph
    }

    fn link(&mut self, a: usize, b: usize, update: impl Fn(&mut EdgeInfo)) {
        if a == b {
            return;
        }
        update(self.adjacency[a].entry(b).or_default());
        update(self.adjacency[b].entry(a).or_default());
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn codes(&self) -> &[CourseCode] {
        &self.codes
    }

    pub fn index_of(&self, code: &str) -> Option<usize> {
        self.index.get(code).copied()
    }

    pub fn code(&self, vertex: usize) -> &str {
        &self.codes[vertex]
    }

    pub fn neighbors(&self, vertex: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[vertex].keys().copied()
    }

    pub fn edge(&self, a: usize, b: usize) -> Option<&EdgeInfo> {
        self.adjacency.get(a).and_then(|n| n.get(&b))
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(a), Some(b)) => self.edge(a, b).is_some(),
            _ => false,
        }
    }

    pub fn degree(&self, code: &str) -> usize {
        self.index_of(code).map_or(0, |v| self.degree_at(v))
    }

    pub fn degree_at(&self, vertex: usize) -> usize {
        self.adjacency[vertex].len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(BTreeMap::len).sum::<usize>() / 2
    }

    /// Every edge once, as `(a, b, info)` with `a < b`.
    pub fn edge_pairs(&self) -> impl Iterator<Item = (usize, usize, &EdgeInfo)> + '_ {
        self.adjacency.iter().enumerate().flat_map(|(a, neighbors)| {
            neighbors
                .range(a + 1..)
                .map(move |(&b, info)| (a, b, info))
        })
    }

    pub fn edges(&self) -> Vec<ConflictEdge> {
        self.edge_pairs()
            .map(|(a, b, info)| ConflictEdge {
                a: self.codes[a].clone(),
                b: self.codes[b].clone(),
                shared_students: info.shared_students,
                shared_instructor: info.shared_instructor,
            })
            .collect()
    }

    pub fn roster(&self, vertex: usize) -> &BTreeSet<StudentId> {
        &self.rosters[vertex]
    }

    /// Students mapped to the vertices of the courses they take.
    pub fn student_courses(&self) -> BTreeMap<&str, Vec<usize>> {
        let mut by_student: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (vertex, roster) in self.rosters.iter().enumerate() {
            for student in roster {
                by_student.entry(student.as_str()).or_default().push(vertex);
            }
        }
        by_student
    }
}
