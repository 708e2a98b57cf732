//! Project and task data structures and normalization rules.
//!
//! This module defines the core `Project` struct that represents a unit of
//! creative work tracked through the board, and the checklist `Task` items
//! each project owns. Field names follow the studio's wire vocabulary
//! (nombre, tipo, presupuesto, ...) so the remote rows stay readable.

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Board lane a project occupies. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Nuevo,
    EnCurso,
    Completo,
    Terminado,
}

impl Status {
    /// Column order on the board, left to right.
    pub const ALL: [Status; 4] = [
        Status::Nuevo,
        Status::EnCurso,
        Status::Completo,
        Status::Terminado,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Nuevo => "nuevo",
            Status::EnCurso => "en-curso",
            Status::Completo => "completo",
            Status::Terminado => "terminado",
        }
    }

    /// Column title for display.
    pub fn title(self) -> &'static str {
        match self {
            Status::Nuevo => "Nuevo",
            Status::EnCurso => "En curso",
            Status::Completo => "Completo",
            Status::Terminado => "Terminado",
        }
    }
}

/// Checklist item priority. Cycles in the fixed order alta → media → normal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Alta,
    Media,
    #[default]
    Normal,
}

impl Priority {
    /// Next priority in the closed 3-cycle.
    pub fn cycled(self) -> Priority {
        match self {
            Priority::Alta => Priority::Media,
            Priority::Media => Priority::Normal,
            Priority::Normal => Priority::Alta,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Alta => "alta",
            Priority::Media => "media",
            Priority::Normal => "normal",
        }
    }
}

/// A checklist item owned by exactly one project. Never persisted on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Position within the parent's list; contiguous 0..n-1 after any
    /// structural change.
    #[serde(default)]
    pub order: usize,
}

impl Task {
    /// Create an empty task appended at the given position.
    pub fn new(order: usize) -> Self {
        Task {
            text: String::new(),
            completed: false,
            priority: Priority::Normal,
            due_date: None,
            order,
        }
    }
}

/// Financial/qualitative record captured when a project completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conclusion {
    #[serde(default)]
    pub fecha: Option<NaiveDate>,
    /// Star rating 1-5.
    #[serde(default)]
    pub calificacion: Option<u8>,
    #[serde(default)]
    pub notas: String,
    #[serde(default)]
    pub link_resultado: String,
}

/// A unit of creative work tracked through the board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    /// Opaque stable identifier, assigned at creation, immutable.
    pub id: String,
    pub nombre: String,
    pub tipo: String,
    pub artista: String,
    pub cliente: String,
    pub contacto: String,
    pub ubicacion: String,
    pub formato: String,
    pub medidas: String,
    pub contexto: String,
    pub drive_link: String,
    pub presupuesto: Option<f64>,
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
    pub status: Status,
    /// Sort key within a status column. Not globally unique.
    pub order: f64,
    pub tasks: Vec<Task>,
    /// Populated only once the project is terminado.
    pub gastos: Option<f64>,
    pub utilidad: Option<f64>,
    pub conclusion: Option<Conclusion>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Mint a fresh identifier from the current clock, millisecond precision.
    pub fn new_id(now: DateTime<Utc>) -> String {
        now.timestamp_millis().to_string()
    }

    /// Effective `[start, end]` date range, each boundary defaulting to the
    /// other when absent. `None` when the project has no dates at all.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.fecha_inicio.or(self.fecha_fin)?;
        let end = self.fecha_fin.or(self.fecha_inicio)?;
        Some((start, end))
    }

    /// Timestamp used to rank completed projects, falling back to creation.
    pub fn completed_or_created(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.created_at)
    }
}

/// Reassign every task's `order` to its list index, keeping the list
/// contiguous after inserts, deletes and moves.
pub fn reindex_tasks(tasks: &mut [Task]) {
    for (i, t) in tasks.iter_mut().enumerate() {
        t.order = i;
    }
}

/// Restore a task list read from storage: sort by the persisted `order`,
/// then reindex so gaps left by older versions disappear.
pub fn normalise_tasks(tasks: &mut Vec<Task>) {
    tasks.sort_by_key(|t| t.order);
    reindex_tasks(tasks);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_cycle_is_closed() {
        for p in [Priority::Alta, Priority::Media, Priority::Normal] {
            assert_eq!(p.cycled().cycled().cycled(), p);
        }
        assert_eq!(Priority::Alta.cycled(), Priority::Media);
        assert_eq!(Priority::Media.cycled(), Priority::Normal);
        assert_eq!(Priority::Normal.cycled(), Priority::Alta);
    }

    #[test]
    fn date_range_defaults_missing_boundary() {
        let mut p = crate::store::tests::sample_project("1", Status::Nuevo, 0.0);
        let d = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();

        p.fecha_inicio = Some(d);
        p.fecha_fin = None;
        assert_eq!(p.date_range(), Some((d, d)));

        p.fecha_inicio = None;
        p.fecha_fin = Some(d);
        assert_eq!(p.date_range(), Some((d, d)));

        p.fecha_fin = None;
        assert_eq!(p.date_range(), None);
    }

    #[test]
    fn normalise_sorts_and_reindexes() {
        let mut tasks = vec![
            Task {
                text: "b".into(),
                order: 7,
                ..Task::new(0)
            },
            Task {
                text: "a".into(),
                order: 2,
                ..Task::new(0)
            },
        ];
        normalise_tasks(&mut tasks);
        assert_eq!(tasks[0].text, "a");
        assert_eq!(tasks[1].text, "b");
        assert_eq!(tasks[0].order, 0);
        assert_eq!(tasks[1].order, 1);
    }

    #[test]
    fn status_serialises_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Status::EnCurso).unwrap(),
            "\"en-curso\""
        );
        assert_eq!(
            serde_json::from_str::<Status>("\"terminado\"").unwrap(),
            Status::Terminado
        );
    }
}
