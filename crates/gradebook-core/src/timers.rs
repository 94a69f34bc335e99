//! Cancellable deferred tasks, one slot per assignment and purpose.
//!
//! A slot holds at most one task. Scheduling into an occupied slot aborts the
//! previous task, so only the latest one can fire. Because a task may already
//! be past its sleep when it gets replaced, every task also carries a
//! generation number and must [`TimerSet::claim`] its slot before acting.

use std::collections::HashMap;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// What a deferred task does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Submit an assignment the student has been working on.
    AutoSubmit,
    /// Grade a submitted assignment.
    Grading,
}

/// Identifies one scheduled task. Handed to the task's callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerTicket {
    pub assignment: String,
    pub kind: TimerKind,
    generation: u64,
}

#[derive(Debug)]
struct Scheduled {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Deferred tasks owned by a single student.
#[derive(Debug, Default)]
pub struct TimerSet {
    tasks: HashMap<(String, TimerKind), Scheduled>,
    next_generation: u64,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fire` after `delay`, replacing whatever occupied the slot.
    ///
    /// Returns `false` and leaves the slot untouched when there is no Tokio
    /// runtime to run the task on.
    pub fn schedule<F>(
        &mut self,
        assignment: &str,
        kind: TimerKind,
        delay: Duration,
        fire: F,
    ) -> bool
    where
        F: FnOnce(TimerTicket) + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("no Tokio runtime, cannot schedule {kind:?} for '{assignment}'");
            return false;
        };

        self.next_generation += 1;
        let generation = self.next_generation;
        let ticket = TimerTicket {
            assignment: assignment.to_string(),
            kind,
            generation,
        };

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            fire(ticket);
        });

        let previous = self
            .tasks
            .insert((assignment.to_string(), kind), Scheduled { generation, handle });
        if let Some(previous) = previous {
            tracing::debug!("replacing pending {kind:?} timer for '{assignment}'");
            previous.handle.abort();
        }
        true
    }

    /// Take ownership of the slot for a firing task.
    ///
    /// Returns `false` if the task was cancelled or superseded in the meantime,
    /// in which case it must not act.
    pub fn claim(&mut self, ticket: &TimerTicket) -> bool {
        let key = (ticket.assignment.clone(), ticket.kind);
        match self.tasks.get(&key) {
            Some(current) if current.generation == ticket.generation => {
                self.tasks.remove(&key);
                true
            }
            _ => false,
        }
    }

    /// Cancel one slot. Returns whether a task was pending.
    pub fn cancel(&mut self, assignment: &str, kind: TimerKind) -> bool {
        match self.tasks.remove(&(assignment.to_string(), kind)) {
            Some(scheduled) => {
                scheduled.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending task. Returns how many were pending.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.tasks.len();
        for (_, scheduled) in self.tasks.drain() {
            scheduled.handle.abort();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
