//! Analytics projection: profit summarised over the trailing six months.

use chrono::{Datelike, NaiveDate};

use crate::model::{Project, Status};
use crate::store::ProjectStore;
use crate::views::calendar::MESES_CORTOS;

/// Months covered by the trailing profit series.
pub const TRAILING_MONTHS: usize = 6;

/// One month's summed profit.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthProfit {
    pub year: i32,
    pub month: u32,
    /// "mar 26"
    pub label: String,
    pub utilidad: f64,
}

/// Profit figures for the analytics panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Analytics {
    /// Trailing six months including the current one, oldest first.
    pub months: Vec<MonthProfit>,
    pub current_month: f64,
    pub previous_month: f64,
    pub total_completed: usize,
    /// Mean profit across terminado projects; zero when there are none.
    pub avg_profit: f64,
}

fn month_back(year: i32, month: u32, back: u32) -> (i32, u32) {
    let absolute = year * 12 + month as i32 - 1 - back as i32;
    (absolute.div_euclid(12), absolute.rem_euclid(12) as u32 + 1)
}

fn profit_month(project: &Project) -> (i32, u32) {
    let fecha = project.completed_or_created().date_naive();
    (fecha.year(), fecha.month())
}

/// Summarise terminado profit for the six months ending at `today`'s month.
///
/// A project lands in the month it was completed, falling back to its
/// creation date. The conclusion form's own date is display-only and does not
/// move the bucket. Projects with no recorded profit count toward the totals
/// at zero.
pub fn project_analytics(store: &ProjectStore, today: NaiveDate) -> Analytics {
    let done: Vec<&Project> = store
        .all()
        .iter()
        .filter(|p| p.status == Status::Terminado)
        .collect();

    let months: Vec<MonthProfit> = (0..TRAILING_MONTHS as u32)
        .rev()
        .map(|back| {
            let (year, month) = month_back(today.year(), today.month(), back);
            let utilidad = done
                .iter()
                .filter(|p| profit_month(p) == (year, month))
                .map(|p| p.utilidad.unwrap_or(0.0))
                .sum();
            MonthProfit {
                year,
                month,
                label: format!("{} {:02}", MESES_CORTOS[month as usize - 1], year % 100),
                utilidad,
            }
        })
        .collect();

    let current_month = months.last().map_or(0.0, |m| m.utilidad);
    let previous_month = months
        .get(months.len().saturating_sub(2))
        .map_or(0.0, |m| m.utilidad);

    let total_completed = done.len();
    let avg_profit = if done.is_empty() {
        0.0
    } else {
        done.iter().map(|p| p.utilidad.unwrap_or(0.0)).sum::<f64>() / done.len() as f64
    };

    Analytics {
        months,
        current_month,
        previous_month,
        total_completed,
        avg_profit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Conclusion;
    use crate::store::tests::sample_project;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn completed(id: &str, utilidad: f64, fecha: NaiveDate) -> crate::model::Project {
        let mut p = sample_project(id, Status::Terminado, 0.0);
        p.utilidad = Some(utilidad);
        p.completed_at = fecha.and_hms_opt(12, 0, 0).map(|dt| dt.and_utc());
        p
    }

    #[test]
    fn trailing_window_is_six_months_oldest_first() {
        let store = ProjectStore::new();
        let analytics = project_analytics(&store, date(2026, 3, 15));

        let labels: Vec<&str> = analytics.months.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["oct 25", "nov 25", "dic 25", "ene 26", "feb 26", "mar 26"]
        );
        assert_eq!(analytics.months[0].year, 2025);
        assert_eq!(analytics.months[5].month, 3);
    }

    #[test]
    fn profit_lands_in_the_completion_month() {
        let mut store = ProjectStore::new();
        store.add(completed("a", 1000.0, date(2026, 8, 5)));
        store.add(completed("b", 500.0, date(2026, 8, 20)));
        store.add(completed("c", 2000.0, date(2026, 7, 1)));
        store.add(completed("old", 9999.0, date(2025, 12, 1)));
        store.add(sample_project("active", Status::EnCurso, 0.0));

        let analytics = project_analytics(&store, date(2026, 8, 29));
        assert_eq!(analytics.current_month, 1500.0);
        assert_eq!(analytics.previous_month, 2000.0);
        // December 2025 falls outside the trailing window.
        assert!(analytics.months.iter().all(|m| m.utilidad != 9999.0));
        assert_eq!(analytics.total_completed, 4);
        assert_eq!(analytics.avg_profit, (1000.0 + 500.0 + 2000.0 + 9999.0) / 4.0);
    }

    #[test]
    fn backdated_conclusion_does_not_move_the_bucket() {
        let mut store = ProjectStore::new();
        let mut p = completed("a", 1000.0, date(2026, 8, 10));
        p.conclusion = Some(Conclusion {
            fecha: Some(date(2026, 7, 20)),
            ..Conclusion::default()
        });
        store.add(p);

        let analytics = project_analytics(&store, date(2026, 8, 29));
        assert_eq!(analytics.current_month, 1000.0);
        assert_eq!(analytics.previous_month, 0.0);
    }

    #[test]
    fn missing_profit_counts_as_zero() {
        let mut store = ProjectStore::new();
        let mut p = sample_project("a", Status::Terminado, 0.0);
        p.completed_at = Some(
            chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 8, 10, 0, 0, 0).unwrap(),
        );
        store.add(p);

        let analytics = project_analytics(&store, date(2026, 8, 29));
        assert_eq!(analytics.current_month, 0.0);
        assert_eq!(analytics.total_completed, 1);
        assert_eq!(analytics.avg_profit, 0.0);
    }
}
