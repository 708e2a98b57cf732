//! Month calendar projection: a fixed 6×7 grid of day cells carrying the
//! projects and task deadlines that touch each date.

use chrono::{Datelike, Duration, NaiveDate};

use crate::model::{Project, Status, Task};
use crate::store::ProjectStore;

/// Cells per grid: six full weeks, Sunday through Saturday.
pub const GRID_CELLS: usize = 42;

/// Items shown per cell before collapsing into an overflow count.
pub const MAX_PER_CELL: usize = 3;

pub const MESES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

pub const MESES_CORTOS: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sep", "oct", "nov", "dic",
];

/// "7 jun 2026"
pub fn format_fecha_corta(d: NaiveDate) -> String {
    format!(
        "{} {} {}",
        d.day(),
        MESES_CORTOS[d.month0() as usize],
        d.year()
    )
}

/// Where a cell date falls inside a project's date range, for drawing the
/// range bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanPos {
    Start,
    Middle,
    End,
    Single,
}

/// One entry in a day cell. Projects always list before tasks.
#[derive(Debug)]
pub enum CalendarItem<'a> {
    Project { project: &'a Project, span: SpanPos },
    Task { project: &'a Project, task: &'a Task },
}

#[derive(Debug)]
pub struct CalendarCell<'a> {
    pub date: NaiveDate,
    pub day: u32,
    /// The cell belongs to the previous or next month.
    pub other_month: bool,
    pub today: bool,
    pub items: Vec<CalendarItem<'a>>,
    /// Entries beyond [`MAX_PER_CELL`] that the cell does not show.
    pub overflow: usize,
}

#[derive(Debug)]
pub struct CalendarGrid<'a> {
    pub year: i32,
    pub month: u32,
    /// "Agosto 2026"
    pub title: String,
    pub cells: Vec<CalendarCell<'a>>,
}

/// Project one month of the store onto a 42-cell grid.
///
/// The grid opens on the last Sunday at or before the 1st of the month and
/// runs six weeks, spilling into the adjacent months as needed. `today` is
/// flagged by exact date match, so it only appears when the viewed month is
/// the real current one.
pub fn project_calendar(
    store: &ProjectStore,
    year: i32,
    month: u32,
    today: NaiveDate,
) -> CalendarGrid<'_> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today);
    let offset = first.weekday().num_days_from_sunday() as i64;
    let grid_start = first - Duration::days(offset);

    let active: Vec<&Project> = store
        .all()
        .iter()
        .filter(|p| p.status != Status::Terminado)
        .collect();

    let cells = (0..GRID_CELLS as i64)
        .map(|i| {
            let date = grid_start + Duration::days(i);
            let mut items: Vec<CalendarItem<'_>> = Vec::new();

            for project in &active {
                if let Some((start, end)) = project.date_range() {
                    if start <= date && date <= end {
                        let span = if start == end {
                            SpanPos::Single
                        } else if date == start {
                            SpanPos::Start
                        } else if date == end {
                            SpanPos::End
                        } else {
                            SpanPos::Middle
                        };
                        items.push(CalendarItem::Project { project, span });
                    }
                }
            }

            for project in &active {
                for task in &project.tasks {
                    if task.due_date == Some(date) {
                        items.push(CalendarItem::Task { project, task });
                    }
                }
            }

            let overflow = items.len().saturating_sub(MAX_PER_CELL);
            items.truncate(MAX_PER_CELL);

            CalendarCell {
                date,
                day: date.day(),
                other_month: date.month() != month || date.year() != year,
                today: date == today,
                items,
                overflow,
            }
        })
        .collect();

    CalendarGrid {
        year,
        month,
        title: format!("{} {}", MESES[month as usize - 1], year),
        cells,
    }
}
