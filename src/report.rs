use crate::actuals::{monthly_target, next_due, ActualsTable};
use crate::cycle::CyclicDescriptor;
use crate::forecast::ScheduledEntry;
use crate::utils::format_ledger_date;
use chrono::NaiveDate;
use log::warn;
use tabled::{Table, Tabled};

/// Cycles below this period are day-to-day spending noise rather than
/// obligations worth reporting on individually.
const REPORT_PERIOD_FLOOR: u32 = 31;

#[derive(Debug, Clone, Tabled)]
pub struct CycleRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Period (days)")]
    pub period: String,
    #[tabled(rename = "Next due")]
    pub next_due: String,
    #[tabled(rename = "Monthly cost")]
    pub monthly_cost: String,
    #[tabled(rename = "Saved")]
    pub saved: String,
}

#[derive(Debug, Clone, Tabled)]
pub struct ForecastRow {
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Description")]
    pub description: String,
    #[tabled(rename = "Cost")]
    pub cost: String,
    #[tabled(rename = "Effective")]
    pub effective: String,
    #[tabled(rename = "Cum. cost")]
    pub cumulative_cost: String,
    #[tabled(rename = "Cum. effective")]
    pub cumulative_effective: String,
}

/// Per-descriptor summary rows, restricted to cycles longer than a
/// month; shorter beats dominate regular spending and would drown the
/// obligations the report is for.
pub fn cycle_rows(
    descriptors: &[CyclicDescriptor],
    actuals: &ActualsTable,
    reference: NaiveDate,
) -> Vec<CycleRow> {
    let mut rows = Vec::new();

    for descriptor in descriptors {
        let period = descriptor.period_days();
        if period.is_some_and(|p| p <= REPORT_PERIOD_FLOOR) {
            continue;
        }

        let due = match next_due(descriptor, reference) {
            Ok(due) => format_ledger_date(due),
            Err(err) => {
                warn!("No projected due date for '{}': {}", descriptor.name, err);
                continue;
            }
        };

        rows.push(CycleRow {
            name: descriptor.name.clone(),
            period: period.map_or_else(|| "-".to_string(), |p| p.to_string()),
            next_due: due,
            monthly_cost: format!("{:.2}", monthly_target(descriptor)),
            saved: format!("{:.2}", actuals.saved(descriptor.id)),
        });
    }

    rows
}

pub fn forecast_rows(entries: &[ScheduledEntry]) -> Vec<ForecastRow> {
    entries
        .iter()
        .map(|entry| ForecastRow {
            date: format_ledger_date(entry.date),
            description: entry.name.clone(),
            cost: format!("{:.2}", entry.cost),
            effective: format!("{:.2}", entry.effective),
            cumulative_cost: format!("{:.2}", entry.cumulative_cost),
            cumulative_effective: format!("{:.2}", entry.cumulative_effective),
        })
        .collect()
}

pub fn render_cycles(rows: &[CycleRow]) -> String {
    Table::new(rows).to_string()
}

/// Renders the day-ordered forecast with the combined estimate of
/// projected and already-realized costs appended.
pub fn render_forecast(rows: &[ForecastRow], estimated_total: f64) -> String {
    let table = Table::new(rows).to_string();
    format!("{}\nEstimated total: {:.2}", table, estimated_total)
}
