//! Status-change observers.
//!
//! Observers are sinks: they format and emit, and never feed back into the
//! model. They are invoked synchronously while the student is locked, so an
//! observer must not call back into the student it is observing.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assignment::Status;

/// One status transition of one assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub student_id: Uuid,
    pub student: String,
    pub assignment: String,
    pub status: Status,
    /// Set for `pass`/`fail` events.
    #[serde(default)]
    pub grade: Option<f64>,
    pub at: DateTime<Utc>,
}

impl StatusEvent {
    /// The human-readable line for this event.
    pub fn message(&self) -> String {
        status_message(&self.student, &self.assignment, self.status)
    }
}

/// A change to a class roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RosterEvent {
    Added { student: String },
    Removed { student: String },
}

impl RosterEvent {
    pub fn message(&self) -> String {
        match self {
            RosterEvent::Added { student } => {
                format!("{student} has been added to the classlist.")
            }
            RosterEvent::Removed { student } => {
                format!("{student} has been removed from the classlist.")
            }
        }
    }
}

/// Render the notification text for a status label.
///
/// Unknown labels fall through to a generic template.
pub fn format_message(student: &str, assignment: &str, status: &str) -> String {
    match status.parse::<Status>() {
        Ok(status) => status_message(student, assignment, status),
        Err(_) => format!("{student}, {assignment} is now {status}."),
    }
}

fn status_message(student: &str, assignment: &str, status: Status) -> String {
    match status {
        Status::Released => format!("{student}, {assignment} has been released."),
        Status::Working => format!("{student} is working on {assignment}."),
        Status::Submitted => format!("{student} has submitted {assignment}."),
        Status::FinalReminder => format!("{student}, final reminder for {assignment}."),
        Status::Pass => format!("{student} has passed {assignment}"),
        Status::Fail => format!("{student} has failed {assignment}"),
    }
}

/// Receives every status change of every observed student.
pub trait Observer: Send + Sync {
    fn notify(&self, event: &StatusEvent);

    /// Called when a class list gains or loses a student.
    fn roster_changed(&self, _event: &RosterEvent) {}
}

/// Prints `Observer → <message>` lines to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleObserver;

impl Observer for ConsoleObserver {
    fn notify(&self, event: &StatusEvent) {
        println!("Observer → {}", event.message());
    }

    fn roster_changed(&self, event: &RosterEvent) {
        println!("{}", event.message());
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<StatusEvent>>,
    roster: Mutex<Vec<RosterEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// All status events received so far, in arrival order.
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn roster_events(&self) -> Vec<RosterEvent> {
        self.roster
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Statuses seen for one student/assignment pair, in order.
    pub fn statuses_for(&self, student: &str, assignment: &str) -> Vec<Status> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.student == student && e.assignment == assignment)
            .map(|e| e.status)
            .collect()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.roster
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Observer for RecordingObserver {
    fn notify(&self, event: &StatusEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }

    fn roster_changed(&self, event: &RosterEvent) {
        self.roster
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Forwards every event to each inner observer in order.
#[derive(Default, Clone)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn Observer>>,
}

impl FanoutObserver {
    pub fn new(observers: Vec<Arc<dyn Observer>>) -> Self {
        Self { observers }
    }

    pub fn with(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl Observer for FanoutObserver {
    fn notify(&self, event: &StatusEvent) {
        for observer in &self.observers {
            observer.notify(event);
        }
    }

    fn roster_changed(&self, event: &RosterEvent) {
        for observer in &self.observers {
            observer.roster_changed(event);
        }
    }
}
