//! History projection: the full, uncapped list of terminado projects.

use clap::ValueEnum;

use crate::model::{Project, Status};
use crate::store::ProjectStore;
use crate::views::calendar::format_fecha_corta;

/// Caller-selected sort for the history list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum HistorySort {
    /// Completion date, most recent first.
    #[default]
    Fecha,
    /// Star rating, best first.
    Calificacion,
    /// Budget, largest first.
    Presupuesto,
    /// Profit, largest first.
    Utilidad,
    /// Service type, A to Z.
    Tipo,
}

impl HistorySort {
    pub fn label(self) -> &'static str {
        match self {
            HistorySort::Fecha => "fecha",
            HistorySort::Calificacion => "calificación",
            HistorySort::Presupuesto => "presupuesto",
            HistorySort::Utilidad => "utilidad",
            HistorySort::Tipo => "tipo",
        }
    }

    /// Next sort key, for cycling from the TUI.
    pub fn cycled(self) -> HistorySort {
        match self {
            HistorySort::Fecha => HistorySort::Calificacion,
            HistorySort::Calificacion => HistorySort::Presupuesto,
            HistorySort::Presupuesto => HistorySort::Utilidad,
            HistorySort::Utilidad => HistorySort::Tipo,
            HistorySort::Tipo => HistorySort::Fecha,
        }
    }
}

/// One row of the history list, display-ready.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub nombre: String,
    /// "tipo · artista · cliente"
    pub resumen: String,
    /// Conclusion date (or completion timestamp) formatted for display.
    pub fecha: String,
    /// Signed profit; zero when never captured.
    pub utilidad: f64,
    /// Star rating 1-5, zero when unrated.
    pub calificacion: u8,
}

/// Star string for a 1-5 rating, with its Spanish label.
pub fn format_stars(calificacion: u8) -> String {
    if calificacion == 0 {
        return "-".to_string();
    }
    let label = match calificacion {
        5 => "Excelente",
        4 => "Muy bueno",
        3 => "Bueno",
        2 => "Regular",
        _ => "Malo",
    };
    format!("{} {}", "★".repeat(calificacion as usize), label)
}

/// Project all terminado projects as a sorted history list.
pub fn project_history(store: &ProjectStore, sort: HistorySort) -> Vec<HistoryEntry> {
    let mut done: Vec<&Project> = store
        .all()
        .iter()
        .filter(|p| p.status == Status::Terminado)
        .collect();

    match sort {
        HistorySort::Fecha => {
            done.sort_by_key(|p| std::cmp::Reverse(p.completed_or_created()));
        }
        HistorySort::Calificacion => {
            done.sort_by_key(|p| {
                std::cmp::Reverse(
                    p.conclusion
                        .as_ref()
                        .and_then(|c| c.calificacion)
                        .unwrap_or(0),
                )
            });
        }
        HistorySort::Presupuesto => {
            done.sort_by(|a, b| {
                b.presupuesto
                    .unwrap_or(0.0)
                    .total_cmp(&a.presupuesto.unwrap_or(0.0))
            });
        }
        HistorySort::Utilidad => {
            done.sort_by(|a, b| {
                b.utilidad
                    .unwrap_or(0.0)
                    .total_cmp(&a.utilidad.unwrap_or(0.0))
            });
        }
        HistorySort::Tipo => {
            done.sort_by(|a, b| a.tipo.cmp(&b.tipo));
        }
    }

    done.into_iter()
        .map(|p| {
            let fecha = p
                .conclusion
                .as_ref()
                .and_then(|c| c.fecha)
                .unwrap_or_else(|| p.completed_or_created().date_naive());
            HistoryEntry {
                id: p.id.clone(),
                nombre: p.nombre.clone(),
                resumen: format!("{} · {} · {}", p.tipo, p.artista, p.cliente),
                fecha: format_fecha_corta(fecha),
                utilidad: p.utilidad.unwrap_or(0.0),
                calificacion: p
                    .conclusion
                    .as_ref()
                    .and_then(|c| c.calificacion)
                    .unwrap_or(0),
            }
        })
        .collect()
}
