//! Kanban board projection: four status columns of ordered cards.

use chrono::NaiveDate;

use crate::model::{Project, Status};
use crate::store::ProjectStore;
use crate::views::deadline::{deadline_status, task_progress, DeadlineStatus, TaskProgress};

/// How many terminado cards stay on the board before the history view takes
/// over.
pub const TERMINADO_CAP: usize = 3;

/// One card on the board, with its derived badges.
#[derive(Debug)]
pub struct KanbanCard<'a> {
    pub project: &'a Project,
    pub deadline: Option<DeadlineStatus>,
    pub progress: Option<TaskProgress>,
}

/// One board column.
#[derive(Debug)]
pub struct KanbanColumn<'a> {
    pub status: Status,
    pub cards: Vec<KanbanCard<'a>>,
    /// True number of projects in this status, even when the terminado
    /// column shows only the most recent few ("Ver todos" affordance).
    pub total: usize,
}

/// Project the store onto the four board columns.
///
/// Within a column, cards ascend by `order`. The terminado column is capped
/// to the [`TERMINADO_CAP`] most recently completed projects, ranked by
/// `completed_at` (falling back to `created_at`).
pub fn project_kanban(store: &ProjectStore, today: NaiveDate) -> Vec<KanbanColumn<'_>> {
    Status::ALL
        .iter()
        .map(|&status| {
            let mut members: Vec<&Project> = store
                .all()
                .iter()
                .filter(|p| p.status == status)
                .collect();
            members.sort_by(|a, b| a.order.total_cmp(&b.order));

            let total = members.len();
            if status == Status::Terminado && members.len() > TERMINADO_CAP {
                members.sort_by_key(|p| std::cmp::Reverse(p.completed_or_created()));
                members.truncate(TERMINADO_CAP);
            }

            let cards = members
                .into_iter()
                .map(|project| KanbanCard {
                    deadline: deadline_status(project, today),
                    progress: task_progress(&project.tasks),
                    project,
                })
                .collect();

            KanbanColumn {
                status,
                cards,
                total,
            }
        })
        .collect()
}
