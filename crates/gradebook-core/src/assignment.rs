//! Assignment data model and its status labels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grades strictly above this value pass; everything else fails.
pub const PASS_THRESHOLD: f64 = 50.0;

/// Lifecycle stage of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Released,
    Working,
    Submitted,
    FinalReminder,
    Pass,
    Fail,
}

impl Status {
    /// Raw label used in messages and query results.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Released => "released",
            Status::Working => "working",
            Status::Submitted => "submitted",
            Status::FinalReminder => "final_reminder",
            Status::Pass => "pass",
            Status::Fail => "fail",
        }
    }

    /// Graded: `pass` or `fail`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Pass | Status::Fail)
    }

    /// Handed in, whether or not it has been graded yet.
    pub fn is_submitted(&self) -> bool {
        matches!(self, Status::Submitted | Status::Pass | Status::Fail)
    }

    /// Still waiting on the student.
    pub fn is_outstanding(&self) -> bool {
        matches!(
            self,
            Status::Released | Status::Working | Status::FinalReminder
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "released" => Ok(Status::Released),
            "working" => Ok(Status::Working),
            "submitted" => Ok(Status::Submitted),
            "final_reminder" | "final reminder" => Ok(Status::FinalReminder),
            "pass" => Ok(Status::Pass),
            "fail" => Ok(Status::Fail),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// A single assignment as seen by one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    name: String,
    status: Status,
    grade: Option<f64>,
}

impl Assignment {
    /// A freshly released assignment with no grade.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Status::Released,
            grade: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn grade(&self) -> Option<f64> {
        self.grade
    }

    /// Record a grade and settle on `pass` or `fail`.
    pub fn set_grade(&mut self, grade: f64) {
        self.grade = Some(grade);
        self.status = if grade > PASS_THRESHOLD {
            Status::Pass
        } else {
            Status::Fail
        };
    }

    /// Move to a non-terminal status. Grades only enter through `set_grade`.
    pub(crate) fn set_status(&mut self, status: Status) {
        debug_assert!(!status.is_terminal());
        self.status = status;
        self.grade = None;
    }
}
