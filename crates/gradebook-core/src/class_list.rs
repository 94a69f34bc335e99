//! The class roster and its batch operations.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::error::GradebookError;
use crate::observer::{Observer, RosterEvent};
use crate::student::Student;

/// How to pick a student for removal.
#[derive(Debug, Clone, Copy)]
pub enum StudentRef<'a> {
    /// This exact student.
    Handle(&'a Student),
    /// Every student whose full name matches exactly.
    Name(&'a str),
}

impl<'a> From<&'a Student> for StudentRef<'a> {
    fn from(student: &'a Student) -> Self {
        StudentRef::Handle(student)
    }
}

impl<'a> From<&'a str> for StudentRef<'a> {
    fn from(name: &'a str) -> Self {
        StudentRef::Name(name)
    }
}

/// An ordered roster of students.
///
/// Roster mutation takes `&mut self`; callers sharing a class list across
/// tasks serialize access themselves.
#[derive(Default)]
pub struct ClassList {
    students: Vec<Student>,
    observer: Option<Arc<dyn Observer>>,
}

impl ClassList {
    pub fn new(observer: Option<Arc<dyn Observer>>) -> Self {
        Self {
            students: Vec::new(),
            observer,
        }
    }

    /// Students in insertion order.
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Add a student to the end of the roster.
    ///
    /// A student coming back after removal resumes its `working` and
    /// `submitted` assignments with fresh delays.
    pub fn add_student(&mut self, student: Student) {
        let name = student.full_name();
        student.reattach();
        self.students.push(student);
        tracing::info!("{name} has been added to the classlist");
        self.roster_changed(RosterEvent::Added { student: name });
    }

    /// Remove by handle or by exact full name.
    ///
    /// Removed students have all pending timers cancelled before they are
    /// returned.
    pub fn remove_student<'a>(&mut self, which: impl Into<StudentRef<'a>>) -> Vec<Student> {
        let which = which.into();
        let (removed, kept): (Vec<Student>, Vec<Student>) =
            self.students.drain(..).partition(|s| match which {
                StudentRef::Handle(target) => s.same_as(target),
                StudentRef::Name(name) => s.full_name() == name,
            });
        self.students = kept;

        for student in &removed {
            let cancelled = student.detach();
            let name = student.full_name();
            tracing::info!("{name} removed from the classlist ({cancelled} timer(s) cancelled)");
            self.roster_changed(RosterEvent::Removed { student: name });
        }
        removed
    }

    pub fn find_student_by_name(&self, full_name: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.full_name() == full_name)
    }

    /// Names of students who still owe work.
    ///
    /// With an assignment name: students who never received it or have not
    /// handed it in. Without: students with any assignment still `released`,
    /// `working` or `final_reminder`.
    pub fn find_outstanding_assignments(&self, assignment: Option<&str>) -> Vec<String> {
        self.students
            .iter()
            .filter(|student| match assignment {
                Some(name) => !student.has_submitted_assignment(name),
                None => student
                    .assignments()
                    .iter()
                    .any(|a| a.status().is_outstanding()),
            })
            .map(Student::full_name)
            .collect()
    }

    /// Release every named assignment to the whole roster.
    ///
    /// Each name is released by its own task, in no particular order relative
    /// to the others; within a task students are visited in roster order.
    /// Resolves once every release has finished.
    pub async fn release_assignments_parallel<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<(), GradebookError> {
        let handles: Vec<_> = names
            .iter()
            .map(|name| {
                let name = name.as_ref().to_string();
                let students = self.students.clone();
                let task_name = name.clone();
                let handle = tokio::spawn(async move {
                    for student in &students {
                        student.update_assignment_status(&task_name, None);
                    }
                    students.len()
                });
                (name, handle)
            })
            .collect();

        let (names, handles): (Vec<String>, Vec<_>) = handles.into_iter().unzip();
        let results = join_all(handles).await;

        let mut first_error = None;
        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(count) => tracing::info!("released '{name}' to {count} student(s)"),
                Err(e) => {
                    tracing::error!("release of '{name}' failed: {e}");
                    if first_error.is_none() {
                        first_error = Some(GradebookError::ReleaseFailed {
                            assignment: name,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Send a final reminder to every student who has not been graded on the
    /// assignment. Returns how many students acted on it.
    pub fn send_reminder(&self, assignment: &str) -> usize {
        let mut reminded = 0;
        for student in &self.students {
            if !student.is_assignment_complete(assignment) && student.receive_reminder(assignment)
            {
                reminded += 1;
            }
        }
        tracing::info!("sent reminder for '{assignment}' to {reminded} student(s)");
        reminded
    }

    /// Deferred tasks pending across the whole roster.
    pub fn pending_timers(&self) -> usize {
        self.students.iter().map(Student::pending_timers).sum()
    }

    /// Resolve once no student has pending deferred work, checking every `poll`.
    pub async fn wait_until_idle(&self, poll: Duration) {
        while self.pending_timers() > 0 {
            tokio::time::sleep(poll).await;
        }
    }

    fn roster_changed(&self, event: RosterEvent) {
        if let Some(observer) = &self.observer {
            observer.roster_changed(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::Status;
    use crate::grader::FixedGrader;
    use crate::observer::RecordingObserver;

    fn roster(names: &[&str]) -> (ClassList, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::new());
        let shared: Arc<dyn Observer> = observer.clone();
        let mut class = ClassList::new(Some(shared));
        for name in names {
            let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
            let student = Student::builder(*name, email)
                .observer(observer.clone())
                .grader(Arc::new(FixedGrader(70.0)))
                .build();
            class.add_student(student);
        }
        (class, observer)
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[test]
    fn add_student_emits_confirmation() {
        let (class, observer) = roster(&["Alice Smith", "Bob Jones"]);
        assert_eq!(class.len(), 2);
        assert_eq!(
            observer.roster_events(),
            vec![
                RosterEvent::Added {
                    student: "Alice Smith".into()
                },
                RosterEvent::Added {
                    student: "Bob Jones".into()
                },
            ]
        );
    }

    #[test]
    fn find_by_exact_name() {
        let (class, _) = roster(&["Alice Smith", "Bob Jones"]);
        assert_eq!(
            class.find_student_by_name("Bob Jones").map(Student::email),
            Some("bob.jones@example.com".to_string())
        );
        assert!(class.find_student_by_name("bob jones").is_none());
        assert!(class.find_student_by_name("Bob").is_none());
    }

    #[test]
    fn remove_by_name_and_by_handle() {
        let (mut class, observer) = roster(&["Alice Smith", "Bob Jones", "Carol White"]);

        let removed = class.remove_student("Bob Jones");
        assert_eq!(removed.len(), 1);
        assert!(removed[0].is_detached());
        assert_eq!(class.len(), 2);

        let carol = class.students()[1].clone();
        let removed = class.remove_student(&carol);
        assert_eq!(removed.len(), 1);
        assert!(removed[0].same_as(&carol));

        assert!(class.remove_student("Nobody").is_empty());
        assert_eq!(class.len(), 1);
        assert_eq!(class.students()[0].full_name(), "Alice Smith");
        assert_eq!(
            observer.roster_events().last(),
            Some(&RosterEvent::Removed {
                student: "Carol White".into()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn removing_student_cancels_pending_timers() {
        let (mut class, observer) = roster(&["Alice Smith", "Bob Jones"]);
        class.students()[0].start_working("A1");
        class.students()[1].start_working("A1");
        assert_eq!(class.pending_timers(), 2);

        let removed = class.remove_student("Alice Smith");
        assert_eq!(removed[0].pending_timers(), 0);
        assert_eq!(class.pending_timers(), 1);

        advance(2000).await;
        assert_eq!(
            observer.statuses_for("Alice Smith", "A1"),
            vec![Status::Released, Status::Working]
        );
        assert!(class.students()[0].is_assignment_complete("A1"));
    }

    #[tokio::test(start_paused = true)]
    async fn readded_student_finishes_its_work() {
        let (mut class, observer) = roster(&["Alice Smith"]);
        let alice = class.students()[0].clone();
        alice.start_working("A1");
        alice.submit_assignment("A2");

        let removed = class.remove_student(&alice);
        assert_eq!(removed.len(), 1);
        alice.submit_assignment("A1");
        advance(2000).await;
        assert!(alice.has_submitted_assignment("A2"));
        assert!(!alice.is_assignment_complete("A2"));
        assert!(!alice.has_submitted_assignment("A1"));

        class.add_student(alice.clone());
        assert_eq!(class.pending_timers(), 2);
        class.wait_until_idle(Duration::from_millis(10)).await;

        assert!(alice.is_assignment_complete("A1"));
        assert!(alice.is_assignment_complete("A2"));
        assert_eq!(
            observer.statuses_for("Alice Smith", "A1"),
            vec![Status::Released, Status::Working, Status::Submitted, Status::Pass]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn outstanding_for_named_assignment() {
        let (class, _) = roster(&["Alice Smith", "Bob Jones"]);
        class.students()[0].submit_assignment("A1");

        assert_eq!(
            class.find_outstanding_assignments(Some("A1")),
            vec!["Bob Jones".to_string()]
        );

        class.students()[1].update_assignment_status("A1", None);
        assert_eq!(
            class.find_outstanding_assignments(Some("A1")),
            vec!["Bob Jones".to_string()]
        );

        advance(600).await;
        class.students()[1].update_assignment_status("A1", Some(40.0));
        assert!(class.find_outstanding_assignments(Some("A1")).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn outstanding_without_filter() {
        let (class, _) = roster(&["Alice Smith", "Bob Jones", "Carol White"]);
        class.students()[0].update_assignment_status("A1", None);
        class.students()[1].submit_assignment("A1");

        assert_eq!(
            class.find_outstanding_assignments(None),
            vec!["Alice Smith".to_string()]
        );

        class.students()[2].start_working("A2");
        assert_eq!(
            class.find_outstanding_assignments(None),
            vec!["Alice Smith".to_string(), "Carol White".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_release_reaches_everyone() {
        let (class, observer) = roster(&["Alice Smith", "Bob Jones"]);
        class
            .release_assignments_parallel(&["A1", "A2"])
            .await
            .unwrap();

        for student in class.students() {
            let assignments = student.assignments();
            assert_eq!(assignments.len(), 2);
            assert!(assignments.iter().all(|a| a.status() == Status::Released));
        }
        assert_eq!(observer.len(), 4);
        assert_eq!(class.pending_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_release_is_idempotent() {
        let (class, observer) = roster(&["Alice Smith"]);
        class.release_assignments_parallel(&["A1"]).await.unwrap();
        class.students()[0].start_working("A1");
        class.release_assignments_parallel(&["A1"]).await.unwrap();

        assert_eq!(
            observer.statuses_for("Alice Smith", "A1"),
            vec![Status::Released, Status::Working]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reminder_skips_graded_students() {
        let (class, observer) = roster(&["Alice Smith", "Bob Jones", "Carol White"]);
        class.students()[0].update_assignment_status("A1", Some(90.0));
        class.students()[1].start_working("A1");
        observer.clear();

        assert_eq!(class.send_reminder("A1"), 2);

        assert!(observer.statuses_for("Alice Smith", "A1").is_empty());
        assert_eq!(
            observer.statuses_for("Bob Jones", "A1"),
            vec![Status::FinalReminder, Status::Submitted]
        );
        assert_eq!(
            observer.statuses_for("Carol White", "A1"),
            vec![Status::Released, Status::FinalReminder, Status::Submitted]
        );

        class.wait_until_idle(Duration::from_millis(10)).await;
        assert!(class
            .students()
            .iter()
            .all(|s| s.is_assignment_complete("A1")));
    }

    #[test]
    fn reminder_without_runtime_reaches_nobody() {
        let (class, observer) = roster(&["Alice Smith", "Bob Jones"]);
        assert_eq!(class.send_reminder("A1"), 0);
        assert_eq!(observer.len(), 0);
        assert_eq!(class.find_outstanding_assignments(Some("A1")).len(), 2);
    }

    #[test]
    fn class_list_without_observer() {
        let mut class = ClassList::new(None);
        class.add_student(Student::new("Dan Brown", "dan@example.com", None));
        assert_eq!(class.remove_student("Dan Brown").len(), 1);
        assert!(class.is_empty());
    }
}
