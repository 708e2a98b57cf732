//! Deadline classification and checklist progress for a single project.

use chrono::NaiveDate;

use crate::model::{Project, Status, Task};

/// Urgency band for a project deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineLevel {
    /// Overdue, or due within 2 days.
    Urgent,
    /// Due in 3 to 6 days.
    Warning,
    /// Due in 7 days or more.
    Safe,
}

/// Classified deadline with a ready-to-display message.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadlineStatus {
    pub level: DeadlineLevel,
    /// Whole days until the deadline; negative when overdue.
    pub days: i64,
    pub message: String,
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Classify the remaining days to a project's `fecha_fin`.
///
/// Returns `None` when the project has no end date or is already terminado.
/// Both dates are whole calendar days, so "today" means zero days left.
pub fn deadline_status(project: &Project, today: NaiveDate) -> Option<DeadlineStatus> {
    if project.status == Status::Terminado {
        return None;
    }
    let deadline = project.fecha_fin?;
    let days = (deadline - today).num_days();

    let (level, message) = if days < 0 {
        let late = -days;
        (
            DeadlineLevel::Urgent,
            format!("Vencido hace {} día{}", late, plural(late)),
        )
    } else if days == 0 {
        (DeadlineLevel::Urgent, "Vence hoy".to_string())
    } else if days <= 2 {
        (
            DeadlineLevel::Urgent,
            format!("Vence en {} día{}", days, plural(days)),
        )
    } else if days <= 6 {
        (DeadlineLevel::Warning, format!("Vence en {days} días"))
    } else {
        (DeadlineLevel::Safe, format!("{days} días restantes"))
    };

    Some(DeadlineStatus {
        level,
        days,
        message,
    })
}

/// Completed/total/percentage over a project's checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskProgress {
    pub completed: usize,
    pub total: usize,
    pub percentage: u32,
}

/// `None` when the checklist is empty.
pub fn task_progress(tasks: &[Task]) -> Option<TaskProgress> {
    if tasks.is_empty() {
        return None;
    }
    let completed = tasks.iter().filter(|t| t.completed).count();
    let total = tasks.len();
    let percentage = (100.0 * completed as f64 / total as f64).round() as u32;
    Some(TaskProgress {
        completed,
        total,
        percentage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::sample_project;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 29).unwrap()
    }

    fn with_deadline(days_from_today: i64) -> Project {
        let mut p = sample_project("1", Status::EnCurso, 0.0);
        p.fecha_fin = Some(today() + Duration::days(days_from_today));
        p
    }

    #[test]
    fn due_today_is_urgent() {
        let status = deadline_status(&with_deadline(0), today()).unwrap();
        assert_eq!(status.level, DeadlineLevel::Urgent);
        assert_eq!(status.days, 0);
        assert_eq!(status.message, "Vence hoy");
    }

    #[test]
    fn due_in_five_days_is_warning() {
        let status = deadline_status(&with_deadline(5), today()).unwrap();
        assert_eq!(status.level, DeadlineLevel::Warning);
        assert_eq!(status.message, "Vence en 5 días");
    }

    #[test]
    fn due_in_ten_days_is_safe() {
        let status = deadline_status(&with_deadline(10), today()).unwrap();
        assert_eq!(status.level, DeadlineLevel::Safe);
        assert_eq!(status.message, "10 días restantes");
    }

    #[test]
    fn overdue_yesterday_is_urgent() {
        let status = deadline_status(&with_deadline(-1), today()).unwrap();
        assert_eq!(status.level, DeadlineLevel::Urgent);
        assert_eq!(status.days, -1);
        assert_eq!(status.message, "Vencido hace 1 día");
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(
            deadline_status(&with_deadline(2), today()).unwrap().level,
            DeadlineLevel::Urgent
        );
        assert_eq!(
            deadline_status(&with_deadline(3), today()).unwrap().level,
            DeadlineLevel::Warning
        );
        assert_eq!(
            deadline_status(&with_deadline(6), today()).unwrap().level,
            DeadlineLevel::Warning
        );
        assert_eq!(
            deadline_status(&with_deadline(7), today()).unwrap().level,
            DeadlineLevel::Safe
        );
    }

    #[test]
    fn terminado_or_dateless_yields_none() {
        let mut done = with_deadline(10);
        done.status = Status::Terminado;
        assert!(deadline_status(&done, today()).is_none());

        let blank = sample_project("2", Status::Nuevo, 0.0);
        assert!(deadline_status(&blank, today()).is_none());
    }

    #[test]
    fn progress_rounds_and_handles_empty() {
        use crate::model::Task;
        assert!(task_progress(&[]).is_none());

        let mut tasks = vec![Task::new(0), Task::new(1), Task::new(2)];
        tasks[0].completed = true;
        let progress = task_progress(&tasks).unwrap();
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.percentage, 33);
    }
}
