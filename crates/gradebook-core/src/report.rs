//! Roster snapshots with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assignment::{Assignment, Status};
use crate::class_list::ClassList;
use crate::observer::StatusEvent;
use crate::student::Student;

/// A point-in-time view of a class list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
    /// One entry per student, in roster order.
    pub students: Vec<StudentSummary>,
    /// Students with work still outstanding.
    pub outstanding: Vec<String>,
    /// Status events observed while the roster was running.
    #[serde(default)]
    pub events: Vec<StatusEvent>,
}

/// One student's assignments and grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub overall_grade: f64,
    pub assignments: Vec<Assignment>,
}

impl StudentSummary {
    pub fn from_student(student: &Student) -> Self {
        Self {
            id: student.id(),
            name: student.full_name(),
            email: student.email(),
            overall_grade: student.overall_grade(),
            assignments: student.assignments(),
        }
    }

    /// How many assignments ended in the given status.
    pub fn count(&self, status: Status) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.status() == status)
            .count()
    }
}

impl RosterReport {
    pub fn from_class(class: &ClassList, events: Vec<StatusEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            students: class
                .students()
                .iter()
                .map(StudentSummary::from_student)
                .collect(),
            outstanding: class.find_outstanding_assignments(None),
            events,
        }
    }

    /// Mean of the students' overall grades, or 0 for an empty roster.
    pub fn class_average(&self) -> f64 {
        if self.students.is_empty() {
            return 0.0;
        }
        self.students.iter().map(|s| s.overall_grade).sum::<f64>() / self.students.len() as f64
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize report")
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: RosterReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class() -> ClassList {
        let mut class = ClassList::new(None);
        let alice = Student::new("Alice Smith", "alice@example.com", None);
        alice.update_assignment_status("A1", Some(80.0));
        alice.update_assignment_status("A2", Some(20.0));
        let bob = Student::new("Bob Jones", "bob@example.com", None);
        bob.update_assignment_status("A1", None);
        class.add_student(alice);
        class.add_student(bob);
        class
    }

    #[test]
    fn snapshot_reflects_roster() {
        let report = RosterReport::from_class(&class(), vec![]);
        assert_eq!(report.students.len(), 2);
        assert_eq!(report.students[0].name, "Alice Smith");
        assert_eq!(report.students[0].overall_grade, 50.0);
        assert_eq!(report.students[0].count(Status::Pass), 1);
        assert_eq!(report.students[0].count(Status::Fail), 1);
        assert_eq!(report.outstanding, vec!["Bob Jones".to_string()]);
        assert_eq!(report.class_average(), 25.0);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        let report = RosterReport::from_class(&class(), vec![]);
        report.save_json(&path).unwrap();

        let loaded = RosterReport::load_json(&path).unwrap();
        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.students[1].assignments[0].status(), Status::Released);
    }

    #[test]
    fn empty_roster_average() {
        let report = RosterReport::from_class(&ClassList::default(), vec![]);
        assert_eq!(report.class_average(), 0.0);
    }
}
