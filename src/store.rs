use crate::data::{Conflict, Course, Enrollment, Schedule};
use log::debug;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// A schedule together with the conflicts its validation pass found.
///
/// `courses` and `enrollments` are the catalog records the schedule was built from, so lookups
/// stay consistent after the catalog is replaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generated {
    pub schedule: Schedule,
    pub conflicts: Vec<Conflict>,
    #[serde(skip)]
    pub courses: Vec<Course>,
    #[serde(skip)]
    pub enrollments: Vec<Enrollment>,
}

impl Generated {
    pub fn course(&self, code: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.code == code)
    }
}

#[derive(Debug, Default)]
struct Slots {
    current: Option<Arc<Generated>>,
    previous: Option<Arc<Generated>>,
}

/// Holds the current schedule and the one it replaced.
///
/// `publish` archives and overwrites under one lock, so concurrent generations cannot lose an update.
#[derive(Debug, Default)]
pub struct ScheduleStore {
    slots: Mutex<Slots>,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, generated: Generated) -> Arc<Generated> {
        let generated = Arc::new(generated);
        let mut slots = self.slots.lock();
        slots.previous = slots.current.replace(Arc::clone(&generated));
        debug!(
            "Published schedule {} ({} conflicts).",
            generated.schedule.id,
            generated.conflicts.len()
        );
        generated
    }

    pub fn current(&self) -> Option<Arc<Generated>> {
        self.slots.lock().current.clone()
    }

    pub fn previous(&self) -> Option<Arc<Generated>> {
        self.slots.lock().previous.clone()
    }

    /// Looks a schedule up by id among the current and the archived one.
    pub fn get(&self, id: Uuid) -> Option<Arc<Generated>> {
        let slots = self.slots.lock();
        [&slots.current, &slots.previous]
            .into_iter()
            .flatten()
            .find(|g| g.schedule.id == id)
            .cloned()
    }

    /// Number of schedules held, at most two.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock();
        usize::from(slots.current.is_some()) + usize::from(slots.previous.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Conflicts from the most recent validation pass; empty before the first generation.
    pub fn conflicts(&self) -> Vec<Conflict> {
        self.current()
            .map(|g| g.conflicts.clone())
            .unwrap_or_default()
    }
}
