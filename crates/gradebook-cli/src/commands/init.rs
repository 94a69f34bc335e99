//! The `gradebook init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    let path = std::path::Path::new("gradebook.toml");
    if path.exists() {
        println!("gradebook.toml already exists, skipping.");
    } else {
        std::fs::write(path, SAMPLE_CONFIG)?;
        println!("Created gradebook.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit gradebook.toml to list your students and assignments");
    println!("  2. Run: gradebook simulate");
    println!("  3. Run: gradebook simulate --format json --output report.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# gradebook configuration

[timing]
# Working assignments are submitted automatically after this delay.
work_delay_ms = 500
# Submitted assignments are graded after this delay.
grading_delay_ms = 500

[simulation]
assignments = ["A1", "A2"]
# A final reminder for the first assignment goes out after this delay.
reminder_after_ms = 200
# seed = 42

[[students]]
name = "Alice Smith"
email = "alice@example.com"

[[students]]
name = "Bob Jones"
email = "bob@example.com"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_parses() {
        let config = gradebook_core::config::parse_config(SAMPLE_CONFIG).unwrap();
        assert_eq!(config, gradebook_core::GradebookConfig::default());
    }
}
