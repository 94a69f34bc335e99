//! A student and the lifecycle of their assignments.
//!
//! Status transitions:
//!
//! ```text
//! released ──start_working──▶ working ──(work delay)──▶ submitted ──(grading delay)──▶ pass | fail
//!     │                          │                         ▲
//!     └──────receive_reminder────┴──▶ final_reminder ──────┘
//! ```
//!
//! Every transition notifies the observer exactly once, synchronously, while
//! the student is locked. Automatic submission and grading run as deferred
//! tasks on the Tokio runtime; each assignment has at most one pending task of
//! each kind.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;
use uuid::Uuid;

use crate::assignment::{Assignment, Status};
use crate::config::TimingConfig;
use crate::grader::{Grader, RandomGrader};
use crate::observer::{Observer, StatusEvent};
use crate::timers::{TimerKind, TimerSet, TimerTicket};

/// Result of [`Student::get_assignment_status`].
///
/// Displays as `Hasn't been assigned`, `Pass`, `Fail`, or the raw status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentStatus {
    NotAssigned,
    Pass,
    Fail,
    InProgress(Status),
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentStatus::NotAssigned => f.write_str("Hasn't been assigned"),
            AssignmentStatus::Pass => f.write_str("Pass"),
            AssignmentStatus::Fail => f.write_str("Fail"),
            AssignmentStatus::InProgress(status) => f.write_str(status.as_str()),
        }
    }
}

/// Handle to a student. Clones share the same underlying student.
#[derive(Clone)]
pub struct Student {
    inner: Arc<StudentInner>,
}

struct StudentInner {
    id: Uuid,
    observer: Option<Arc<dyn Observer>>,
    grader: Arc<dyn Grader>,
    timing: TimingConfig,
    state: Mutex<StudentState>,
}

struct StudentState {
    full_name: String,
    email: String,
    /// Creation order; names are unique.
    assignments: Vec<Assignment>,
    overall_grade: f64,
    timers: TimerSet,
    detached: bool,
}

impl StudentState {
    fn position(&self, name: &str) -> Option<usize> {
        self.assignments.iter().position(|a| a.name() == name)
    }

    fn find(&self, name: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.name() == name)
    }

    fn mean_grade(&self) -> f64 {
        let graded: Vec<f64> = self.assignments.iter().filter_map(|a| a.grade()).collect();
        if graded.is_empty() {
            0.0
        } else {
            graded.iter().sum::<f64>() / graded.len() as f64
        }
    }
}

/// Builder for [`Student`].
pub struct StudentBuilder {
    full_name: String,
    email: String,
    observer: Option<Arc<dyn Observer>>,
    grader: Option<Arc<dyn Grader>>,
    timing: TimingConfig,
}

impl StudentBuilder {
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn grader(mut self, grader: Arc<dyn Grader>) -> Self {
        self.grader = Some(grader);
        self
    }

    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    pub fn build(self) -> Student {
        Student {
            inner: Arc::new(StudentInner {
                id: Uuid::new_v4(),
                observer: self.observer,
                grader: self
                    .grader
                    .unwrap_or_else(|| Arc::new(RandomGrader::new())),
                timing: self.timing,
                state: Mutex::new(StudentState {
                    full_name: self.full_name,
                    email: self.email,
                    assignments: Vec::new(),
                    overall_grade: 0.0,
                    timers: TimerSet::new(),
                    detached: false,
                }),
            }),
        }
    }
}

impl Student {
    /// A student with default timing and random grading.
    ///
    /// Without an observer, transitions still happen but nobody is told.
    pub fn new(
        full_name: impl Into<String>,
        email: impl Into<String>,
        observer: Option<Arc<dyn Observer>>,
    ) -> Self {
        let builder = Self::builder(full_name, email);
        match observer {
            Some(observer) => builder.observer(observer).build(),
            None => builder.build(),
        }
    }

    pub fn builder(full_name: impl Into<String>, email: impl Into<String>) -> StudentBuilder {
        StudentBuilder {
            full_name: full_name.into(),
            email: email.into(),
            observer: None,
            grader: None,
            timing: TimingConfig::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn full_name(&self) -> String {
        self.lock().full_name.clone()
    }

    pub fn email(&self) -> String {
        self.lock().email.clone()
    }

    pub fn set_full_name(&self, full_name: impl Into<String>) {
        self.lock().full_name = full_name.into();
    }

    pub fn set_email(&self, email: impl Into<String>) {
        self.lock().email = email.into();
    }

    /// Mean grade as of the last grade change.
    pub fn overall_grade(&self) -> f64 {
        self.lock().overall_grade
    }

    /// Snapshot of every assignment, in the order they were first referenced.
    pub fn assignments(&self) -> Vec<Assignment> {
        self.lock().assignments.clone()
    }

    pub fn assignment(&self, name: &str) -> Option<Assignment> {
        self.lock().find(name).cloned()
    }

    /// Number of deferred tasks that have not fired yet.
    pub fn pending_timers(&self) -> usize {
        self.lock().timers.len()
    }

    pub fn is_detached(&self) -> bool {
        self.lock().detached
    }

    /// Whether both handles refer to the same student.
    pub fn same_as(&self, other: &Student) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Make sure the assignment exists and optionally grade it.
    ///
    /// A new assignment starts out `released`. A finite `grade` moves it to
    /// `pass`/`fail`, cancels its pending automatic work and recomputes the
    /// overall grade; `None` and non-finite grades leave it as is.
    pub fn update_assignment_status(&self, name: &str, grade: Option<f64>) -> Assignment {
        let mut state = self.lock();
        let idx = self.ensure_assignment(&mut state, name);

        if let Some(grade) = grade.filter(|g| g.is_finite()) {
            state.timers.cancel(name, TimerKind::AutoSubmit);
            state.timers.cancel(name, TimerKind::Grading);
            self.apply_grade(&mut state, idx, grade);
        }

        state.assignments[idx].clone()
    }

    pub fn get_assignment_status(&self, name: &str) -> AssignmentStatus {
        match self.lock().find(name).map(Assignment::status) {
            None => AssignmentStatus::NotAssigned,
            Some(Status::Pass) => AssignmentStatus::Pass,
            Some(Status::Fail) => AssignmentStatus::Fail,
            Some(status) => AssignmentStatus::InProgress(status),
        }
    }

    /// Mean of all graded assignments, or 0 if none are graded.
    pub fn get_grade(&self) -> f64 {
        self.lock().mean_grade()
    }

    /// Start working; the assignment is submitted automatically after the
    /// work delay unless something submits it first.
    ///
    /// Calling again restarts the delay. Has no effect unless the assignment
    /// is `released` or `working`, or while the student cannot run deferred
    /// work (see [`Student::detach`]).
    pub fn start_working(&self, name: &str) {
        let mut state = self.lock();
        if !self.can_schedule(&state, "start_working", name) {
            return;
        }
        let idx = self.ensure_assignment(&mut state, name);

        let status = state.assignments[idx].status();
        if !matches!(status, Status::Released | Status::Working) {
            tracing::debug!(
                "{}: ignoring start_working on '{name}' ({status})",
                state.full_name
            );
            return;
        }

        state.assignments[idx].set_status(Status::Working);
        self.emit(&state, idx);
        self.schedule_auto_submit(&mut state, name);
    }

    /// Hand in the assignment and schedule its grading.
    ///
    /// Has no effect if it is already `submitted`, `pass` or `fail`, or
    /// while the student cannot run deferred work.
    pub fn submit_assignment(&self, name: &str) {
        let mut state = self.lock();
        if !self.can_schedule(&state, "submit_assignment", name) {
            return;
        }
        self.submit_locked(&mut state, name);
    }

    /// Final reminder: the assignment passes through `final_reminder` and is
    /// submitted straight away. Graded assignments are left alone.
    ///
    /// Returns `true` if the reminder was acted on.
    pub fn receive_reminder(&self, name: &str) -> bool {
        let mut state = self.lock();
        if !self.can_schedule(&state, "receive_reminder", name) {
            return false;
        }
        let idx = self.ensure_assignment(&mut state, name);

        if state.assignments[idx].status().is_terminal() {
            tracing::debug!("{}: '{name}' already graded, reminder ignored", state.full_name);
            return false;
        }

        state.assignments[idx].set_status(Status::FinalReminder);
        self.emit(&state, idx);
        self.submit_locked(&mut state, name);
        true
    }

    /// `true` once the assignment is graded.
    pub fn is_assignment_complete(&self, name: &str) -> bool {
        self.lock()
            .find(name)
            .is_some_and(|a| a.status().is_terminal())
    }

    /// `true` once the assignment is handed in, graded or not.
    pub fn has_submitted_assignment(&self, name: &str) -> bool {
        self.lock()
            .find(name)
            .is_some_and(|a| a.status().is_submitted())
    }

    /// Cancel every pending task; no deferred work will touch this student
    /// until it is reattached.
    ///
    /// While detached, `start_working`, `submit_assignment` and
    /// `receive_reminder` are ignored. Explicit grades still apply.
    pub fn detach(&self) -> usize {
        let mut state = self.lock();
        state.detached = true;
        let cancelled = state.timers.cancel_all();
        if cancelled > 0 {
            tracing::debug!("{}: cancelled {cancelled} pending timer(s)", state.full_name);
        }
        cancelled
    }

    /// Resume deferred work: `working` assignments get a fresh auto-submit
    /// delay and `submitted` ones a fresh grading delay.
    pub(crate) fn reattach(&self) {
        let mut state = self.lock();
        if !state.detached {
            return;
        }
        state.detached = false;

        let resumed: Vec<(String, Status)> = state
            .assignments
            .iter()
            .filter(|a| matches!(a.status(), Status::Working | Status::Submitted))
            .map(|a| (a.name().to_string(), a.status()))
            .collect();
        for (name, status) in &resumed {
            match status {
                Status::Working => self.schedule_auto_submit(&mut state, name),
                _ => self.schedule_grading(&mut state, name),
            }
        }
        if !resumed.is_empty() {
            tracing::debug!(
                "{}: resumed {} assignment(s) after reattach",
                state.full_name,
                resumed.len()
            );
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, StudentState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn downgrade(&self) -> Weak<StudentInner> {
        Arc::downgrade(&self.inner)
    }

    fn ensure_assignment(&self, state: &mut StudentState, name: &str) -> usize {
        if let Some(idx) = state.position(name) {
            return idx;
        }
        state.assignments.push(Assignment::new(name));
        let idx = state.assignments.len() - 1;
        self.emit(state, idx);
        idx
    }

    fn apply_grade(&self, state: &mut StudentState, idx: usize, grade: f64) {
        state.assignments[idx].set_grade(grade);
        state.overall_grade = state.mean_grade();
        self.emit(state, idx);
    }

    fn submit_locked(&self, state: &mut StudentState, name: &str) {
        let idx = self.ensure_assignment(state, name);
        if state.assignments[idx].status().is_submitted() {
            return;
        }

        state.timers.cancel(name, TimerKind::AutoSubmit);
        state.assignments[idx].set_status(Status::Submitted);
        self.emit(state, idx);
        self.schedule_grading(state, name);
    }

    /// Deferred work needs a roster and a Tokio runtime to run on.
    fn can_schedule(&self, state: &StudentState, op: &str, name: &str) -> bool {
        if state.detached {
            tracing::warn!(
                "{} is not on a roster, ignoring {op} for '{name}'",
                state.full_name
            );
            return false;
        }
        if Handle::try_current().is_err() {
            tracing::warn!(
                "{}: no Tokio runtime, ignoring {op} for '{name}'",
                state.full_name
            );
            return false;
        }
        true
    }

    fn schedule_auto_submit(&self, state: &mut StudentState, name: &str) {
        let delay = self.inner.timing.work_delay();
        let student = self.downgrade();
        state
            .timers
            .schedule(name, TimerKind::AutoSubmit, delay, move |ticket| {
                if let Some(student) = upgrade(&student) {
                    student.fire_auto_submit(&ticket);
                }
            });
    }

    fn schedule_grading(&self, state: &mut StudentState, name: &str) {
        let delay = self.inner.timing.grading_delay();
        let student = self.downgrade();
        state
            .timers
            .schedule(name, TimerKind::Grading, delay, move |ticket| {
                if let Some(student) = upgrade(&student) {
                    student.fire_grading(&ticket);
                }
            });
    }

    fn fire_auto_submit(&self, ticket: &TimerTicket) {
        let mut state = self.lock();
        if !state.timers.claim(ticket) {
            tracing::debug!("stale auto-submit for '{}' skipped", ticket.assignment);
            return;
        }
        self.submit_locked(&mut state, &ticket.assignment);
    }

    fn fire_grading(&self, ticket: &TimerTicket) {
        let mut state = self.lock();
        if !state.timers.claim(ticket) {
            tracing::debug!("stale grading for '{}' skipped", ticket.assignment);
            return;
        }
        let Some(idx) = state.position(&ticket.assignment) else {
            return;
        };
        if state.assignments[idx].status() != Status::Submitted {
            return;
        }

        let grade = self
            .inner
            .grader
            .grade(&state.full_name, &ticket.assignment);
        self.apply_grade(&mut state, idx, grade);
    }

    fn emit(&self, state: &StudentState, idx: usize) {
        let assignment = &state.assignments[idx];
        tracing::debug!(
            student = %state.full_name,
            assignment = assignment.name(),
            status = %assignment.status(),
            "status changed"
        );

        if let Some(observer) = &self.inner.observer {
            observer.notify(&StatusEvent {
                student_id: self.inner.id,
                student: state.full_name.clone(),
                assignment: assignment.name().to_string(),
                status: assignment.status(),
                grade: assignment.grade(),
                at: chrono::Utc::now(),
            });
        }
    }
}

fn upgrade(weak: &Weak<StudentInner>) -> Option<Student> {
    weak.upgrade().map(|inner| Student { inner })
}

impl fmt::Debug for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Student")
            .field("id", &self.inner.id)
            .field("full_name", &state.full_name)
            .field("email", &state.email)
            .field("assignments", &state.assignments)
            .field("overall_grade", &state.overall_grade)
            .field("pending_timers", &state.timers.len())
            .finish()
    }
}
