//! Task board projection: every checklist item across active projects,
//! grouped by project and filterable.

use crate::model::{Priority, Project, Status, Task};
use crate::store::ProjectStore;

/// Filters the caller can stack on the task board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskBoardFilter {
    /// Only tasks from this project id.
    pub project: Option<String>,
    /// Only tasks at this priority.
    pub priority: Option<Priority>,
    /// Drop completed tasks.
    pub pending_only: bool,
}

/// One project's surviving tasks after filtering.
#[derive(Debug)]
pub struct TaskGroup<'a> {
    pub project: &'a Project,
    pub tasks: Vec<&'a Task>,
    /// Completed tasks among the surviving ones.
    pub completed: usize,
    pub total: usize,
}

/// The whole grouped task list with its board-level count.
#[derive(Debug)]
pub struct TaskBoard<'a> {
    pub groups: Vec<TaskGroup<'a>>,
    /// Tasks shown across every group.
    pub total_tasks: usize,
}

/// Project the store onto a grouped task list.
///
/// Terminado projects never appear. Groups keep the projects' relative order
/// within the store, tasks keep their checklist order, and a project with no
/// surviving tasks yields no group. Counts cover only the tasks the filters
/// let through.
pub fn project_task_board<'a>(
    store: &'a ProjectStore,
    filter: &TaskBoardFilter,
) -> TaskBoard<'a> {
    let groups: Vec<TaskGroup<'a>> = store
        .all()
        .iter()
        .filter(|p| p.status != Status::Terminado)
        .filter(|p| filter.project.as_deref().map_or(true, |id| p.id == id))
        .filter_map(|project| {
            let tasks: Vec<&Task> = project
                .tasks
                .iter()
                .filter(|t| filter.priority.map_or(true, |pr| t.priority == pr))
                .filter(|t| !filter.pending_only || !t.completed)
                .collect();
            if tasks.is_empty() {
                None
            } else {
                let completed = tasks.iter().filter(|t| t.completed).count();
                let total = tasks.len();
                Some(TaskGroup {
                    project,
                    tasks,
                    completed,
                    total,
                })
            }
        })
        .collect();

    let total_tasks = groups.iter().map(|g| g.total).sum();
    TaskBoard {
        groups,
        total_tasks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::sample_project;

    fn task(order: usize, priority: Priority, completed: bool) -> Task {
        let mut t = Task::new(order);
        t.text = format!("tarea {order}");
        t.priority = priority;
        t.completed = completed;
        t
    }

    fn seeded() -> ProjectStore {
        let mut store = ProjectStore::new();

        let mut a = sample_project("a", Status::EnCurso, 0.0);
        a.tasks = vec![
            task(0, Priority::Alta, false),
            task(1, Priority::Normal, true),
            task(2, Priority::Media, false),
        ];
        store.add(a);

        let mut b = sample_project("b", Status::Nuevo, 1.0);
        b.tasks = vec![task(0, Priority::Alta, true)];
        store.add(b);

        let mut done = sample_project("done", Status::Terminado, 0.0);
        done.tasks = vec![task(0, Priority::Alta, false)];
        store.add(done);

        store
    }

    #[test]
    fn unfiltered_board_skips_terminado_and_keeps_order() {
        let store = seeded();
        let board = project_task_board(&store, &TaskBoardFilter::default());

        let ids: Vec<&str> = board.groups.iter().map(|g| g.project.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        let orders: Vec<usize> = board.groups[0].tasks.iter().map(|t| t.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn groups_carry_completion_counts_and_board_total() {
        let store = seeded();
        let board = project_task_board(&store, &TaskBoardFilter::default());

        assert_eq!(board.total_tasks, 4);
        assert_eq!(board.groups[0].completed, 1);
        assert_eq!(board.groups[0].total, 3);
        assert_eq!(board.groups[1].completed, 1);
        assert_eq!(board.groups[1].total, 1);

        // Counts track what the filters leave visible.
        let filter = TaskBoardFilter {
            pending_only: true,
            ..TaskBoardFilter::default()
        };
        let pending = project_task_board(&store, &filter);
        assert_eq!(pending.total_tasks, 2);
        assert_eq!(pending.groups[0].completed, 0);
        assert_eq!(pending.groups[0].total, 2);
    }

    #[test]
    fn priority_filter() {
        let store = seeded();
        let filter = TaskBoardFilter {
            priority: Some(Priority::Alta),
            ..TaskBoardFilter::default()
        };
        let board = project_task_board(&store, &filter);
        assert_eq!(board.groups.len(), 2);
        assert!(board
            .groups
            .iter()
            .flat_map(|g| &g.tasks)
            .all(|t| t.priority == Priority::Alta));
    }

    #[test]
    fn pending_only_drops_groups_left_empty() {
        let store = seeded();
        let filter = TaskBoardFilter {
            pending_only: true,
            ..TaskBoardFilter::default()
        };
        let board = project_task_board(&store, &filter);
        // "b" only had a completed task, so it disappears entirely.
        assert_eq!(board.groups.len(), 1);
        assert_eq!(board.groups[0].project.id, "a");
        assert_eq!(board.groups[0].tasks.len(), 2);
    }

    #[test]
    fn project_filter_stacks_with_the_rest() {
        let store = seeded();
        let filter = TaskBoardFilter {
            project: Some("a".to_string()),
            priority: Some(Priority::Media),
            pending_only: true,
        };
        let board = project_task_board(&store, &filter);
        assert_eq!(board.groups.len(), 1);
        assert_eq!(board.groups[0].tasks.len(), 1);
        assert_eq!(board.groups[0].tasks[0].text, "tarea 2");
    }
}
