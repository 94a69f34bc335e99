//! Gradebook configuration and loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::GradebookError;

/// Delays for the automatic transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Delay before a working assignment is submitted automatically.
    #[serde(default = "default_work_delay")]
    pub work_delay_ms: u64,
    /// Delay between submission and grading.
    #[serde(default = "default_grading_delay")]
    pub grading_delay_ms: u64,
}

impl TimingConfig {
    pub fn work_delay(&self) -> Duration {
        Duration::from_millis(self.work_delay_ms)
    }

    pub fn grading_delay(&self) -> Duration {
        Duration::from_millis(self.grading_delay_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            work_delay_ms: default_work_delay(),
            grading_delay_ms: default_grading_delay(),
        }
    }
}

fn default_work_delay() -> u64 {
    500
}
fn default_grading_delay() -> u64 {
    500
}

/// A student to enrol at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentConfig {
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Parameters of the `simulate` scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Assignments released to the whole roster.
    #[serde(default = "default_assignments")]
    pub assignments: Vec<String>,
    /// Delay before the reminder for the first assignment goes out.
    #[serde(default = "default_reminder_after")]
    pub reminder_after_ms: u64,
    /// Seed for reproducible grades.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SimulationConfig {
    pub fn reminder_after(&self) -> Duration {
        Duration::from_millis(self.reminder_after_ms)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            assignments: default_assignments(),
            reminder_after_ms: default_reminder_after(),
            seed: None,
        }
    }
}

fn default_assignments() -> Vec<String> {
    vec!["A1".to_string(), "A2".to_string()]
}
fn default_reminder_after() -> u64 {
    200
}

/// Top-level gradebook configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradebookConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default = "default_students")]
    pub students: Vec<StudentConfig>,
}

fn default_students() -> Vec<StudentConfig> {
    vec![
        StudentConfig {
            name: "Alice Smith".into(),
            email: "alice@example.com".into(),
        },
        StudentConfig {
            name: "Bob Jones".into(),
            email: "bob@example.com".into(),
        },
    ]
}

impl Default for GradebookConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            simulation: SimulationConfig::default(),
            students: default_students(),
        }
    }
}

impl GradebookConfig {
    /// Reject configurations the simulator cannot run.
    pub fn validate(&self) -> Result<(), GradebookError> {
        if self.simulation.assignments.is_empty() {
            return Err(GradebookError::InvalidConfig(
                "simulation.assignments must name at least one assignment".into(),
            ));
        }
        if let Some(blank) = self
            .simulation
            .assignments
            .iter()
            .position(|a| a.trim().is_empty())
        {
            return Err(GradebookError::InvalidConfig(format!(
                "simulation.assignments[{blank}] is empty"
            )));
        }
        if let Some(blank) = self.students.iter().position(|s| s.name.trim().is_empty()) {
            return Err(GradebookError::InvalidConfig(format!(
                "students[{blank}].name is empty"
            )));
        }
        Ok(())
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `gradebook.toml` in the current directory
/// 2. `~/.config/gradebook/config.toml`
///
/// Environment variable override: `GRADEBOOK_SEED`.
pub fn load_config() -> Result<GradebookConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<GradebookConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("gradebook.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => GradebookConfig::default(),
    };

    if let Ok(seed) = std::env::var("GRADEBOOK_SEED") {
        let seed = seed
            .trim()
            .parse::<u64>()
            .with_context(|| format!("GRADEBOOK_SEED is not a number: '{seed}'"))?;
        config.simulation.seed = Some(seed);
    }

    config.validate()?;
    Ok(config)
}

/// Parse a TOML document into a config.
pub fn parse_config(content: &str) -> Result<GradebookConfig> {
    Ok(toml::from_str::<GradebookConfig>(content)?)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("gradebook"))
}
