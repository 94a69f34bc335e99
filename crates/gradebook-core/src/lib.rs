//! gradebook-core: assignment lifecycle simulation.
//!
//! Students move their assignments through `released → working → submitted →
//! pass/fail`, with timer-driven submission and grading, observer
//! notifications on every transition, and a class roster for batch
//! operations.

pub mod assignment;
pub mod class_list;
pub mod config;
pub mod error;
pub mod grader;
pub mod observer;
pub mod report;
pub mod student;
pub mod timers;

pub use assignment::{Assignment, Status, PASS_THRESHOLD};
pub use class_list::{ClassList, StudentRef};
pub use config::{load_config, load_config_from, GradebookConfig, TimingConfig};
pub use error::GradebookError;
pub use grader::{FixedGrader, Grader, RandomGrader};
pub use observer::{
    format_message, ConsoleObserver, FanoutObserver, Observer, RecordingObserver, RosterEvent,
    StatusEvent,
};
pub use student::{AssignmentStatus, Student, StudentBuilder};
