//! The `gradebook simulate` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use gradebook_core::config::{load_config, load_config_from};
use gradebook_core::report::RosterReport;
use gradebook_core::{
    ClassList, ConsoleObserver, FanoutObserver, Grader, Observer, RandomGrader, RecordingObserver,
    Status, Student,
};

const IDLE_POLL: Duration = Duration::from_millis(10);

pub async fn execute(
    config_path: Option<PathBuf>,
    format: String,
    seed: Option<u64>,
    output: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(
        matches!(format.as_str(), "text" | "json"),
        "unknown format '{format}', expected text or json"
    );

    let mut config = match config_path.as_deref() {
        Some(path) => load_config_from(Some(path))?,
        None => load_config()?,
    };
    if seed.is_some() {
        config.simulation.seed = seed;
    }

    let recorder = Arc::new(RecordingObserver::new());
    let mut fanout = FanoutObserver::default().with(recorder.clone());
    if format == "text" {
        fanout = fanout.with(Arc::new(ConsoleObserver));
    }
    let observer: Arc<dyn Observer> = Arc::new(fanout);

    let grader: Arc<dyn Grader> = match config.simulation.seed {
        Some(seed) => Arc::new(RandomGrader::seeded(seed)),
        None => Arc::new(RandomGrader::new()),
    };

    let mut class = ClassList::new(Some(observer.clone()));
    for entry in &config.students {
        let student = Student::builder(entry.name.clone(), entry.email.clone())
            .observer(observer.clone())
            .grader(grader.clone())
            .timing(config.timing)
            .build();
        class.add_student(student);
    }

    let assignments = &config.simulation.assignments;
    tracing::info!(
        "simulating {} student(s) x {} assignment(s)",
        class.len(),
        assignments.len()
    );

    class
        .release_assignments_parallel(assignments.as_slice())
        .await?;

    for (i, student) in class.students().iter().enumerate() {
        student.start_working(&assignments[i % assignments.len()]);
    }

    tokio::time::sleep(config.simulation.reminder_after()).await;
    class.send_reminder(&assignments[0]);

    class.wait_until_idle(IDLE_POLL).await;

    let report = RosterReport::from_class(&class, recorder.events());

    if let Some(path) = &output {
        report.save_json(path)?;
        eprintln!("Report saved to: {}", path.display());
    }

    match format.as_str() {
        "json" => println!("{}", report.to_json()?),
        _ => print_summary(&report),
    }

    Ok(())
}

fn print_summary(report: &RosterReport) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec![
        "Student",
        "Email",
        "Passed",
        "Failed",
        "Outstanding",
        "Grade",
    ]);

    for student in &report.students {
        let outstanding = student
            .assignments
            .iter()
            .filter(|a| a.status().is_outstanding())
            .count();
        table.add_row(vec![
            Cell::new(&student.name),
            Cell::new(&student.email),
            Cell::new(student.count(Status::Pass)),
            Cell::new(student.count(Status::Fail)),
            Cell::new(outstanding),
            Cell::new(format!("{:.1}", student.overall_grade)),
        ]);
    }

    eprintln!("\n{table}");
    eprintln!("Class average: {:.1}", report.class_average());
}
