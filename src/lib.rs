//! # Recurring Expense Planner
//!
//! A library for detecting recurring ("cyclic") expenses in a personal
//! transaction ledger and projecting a savings-aware spending forecast.
//!
//! ## Core Concepts
//!
//! - **IR rows**: the canonical transaction shape (date, amount,
//!   description, category) all bank exports are normalized into upstream
//! - **Cyclic descriptor**: a recurring or goal-based obligation with an
//!   inferred or declared period, mean cost, and tracking state
//! - **Margin**: net cash movement in a month (income + expenses,
//!   expenses negative)
//! - **Balancing**: backward-in-time reallocation of surplus margin to
//!   cover deficits within a bounded horizon
//! - **Realisation**: matching a forecasted obligation against an actual
//!   observed charge in the current month
//!
//! ## Example
//!
//! ```rust,ignore
//! use recurring_expense_planner::*;
//!
//! let transactions = read_ledger(std::fs::File::open("ledger.csv")?)?;
//! let config = PlannerConfig::from_toml_str(&std::fs::read_to_string("planner.toml")?)?;
//!
//! let outcome = Planner::run(&transactions, &config)?;
//! println!("{}", render_cycles(&outcome.cycle_report));
//! println!("{}", render_forecast(&outcome.forecast_report, outcome.estimated_total));
//! ```

pub mod actuals;
pub mod balancer;
pub mod cycle;
pub mod error;
pub mod forecast;
pub mod grouper;
pub mod ingestion;
pub mod monthly;
pub mod report;
pub mod schema;
pub mod utils;

pub use actuals::{allocate, is_due, monthly_target, next_due, ActualsTable};
pub use balancer::{balance, horizon_months};
pub use cycle::{
    infer_period, longest_period, merge_descriptors, prune_groups, CyclicDescriptor,
    DeltaDistribution, DescriptorId, DescriptorKind,
};
pub use error::{PlannerError, Result};
pub use forecast::{build_plan, realise, schedule_entries, Plan, Realisation, ScheduledEntry};
pub use grouper::{cluster, DescriptionIndex, TransactionGroup};
pub use ingestion::{filter_internal, read_ledger};
pub use monthly::{aggregate, split_incomplete, transactions_in_month, MonthKey, MonthlyTotal};
pub use report::{
    cycle_rows, forecast_rows, render_cycles, render_forecast, CycleRow, ForecastRow,
};
pub use schema::{
    PlannerConfig, SavingsGoalEntry, SyntheticCycleEntry, Transaction, INTERNAL_CATEGORY,
};

use log::{debug, info};

/// Too little history makes every stage meaningless; refuse early.
const MIN_TRANSACTIONS: usize = 10;

/// The forecast always spans at least one month even when every
/// detected cycle is shorter.
const MIN_FORECAST_DAYS: u32 = 31;

/// Everything the pipeline produces for one run over a ledger snapshot.
#[derive(Debug)]
pub struct ForecastOutcome {
    pub descriptors: Vec<CyclicDescriptor>,
    pub actuals: ActualsTable,
    pub plan: Plan,
    pub realisations: Vec<Realisation>,
    pub entries: Vec<ScheduledEntry>,
    pub cycle_report: Vec<CycleRow>,
    pub forecast_report: Vec<ForecastRow>,
    /// Projected forecast cost combined with costs already realized in
    /// the current month.
    pub estimated_total: f64,
}

pub struct Planner;

impl Planner {
    /// Runs the full batch pipeline over an in-memory ledger snapshot:
    /// clustering, cycle detection, monthly aggregation, balancing,
    /// surplus allocation, forecasting and realisation.
    pub fn run(transactions: &[Transaction], config: &PlannerConfig) -> Result<ForecastOutcome> {
        let mut ledger: Vec<Transaction> = transactions
            .iter()
            .filter(|t| !t.is_internal())
            .cloned()
            .collect();
        ledger.sort_by_key(|t| t.date);

        if ledger.len() < MIN_TRANSACTIONS {
            return Err(PlannerError::InsufficientTransactions(
                ledger.len(),
                MIN_TRANSACTIONS,
            ));
        }

        // Last transaction overall; the current month is still filling in.
        let last_incomplete = ledger.last().map(|t| t.date).unwrap_or_default();
        info!(
            "Planning over {} transactions up to {}",
            ledger.len(),
            last_incomplete
        );

        let detection_input: Vec<Transaction> = ledger
            .iter()
            .filter(|t| !config.is_blacklisted(&t.category))
            .cloned()
            .collect();

        let groups = cluster(&detection_input);
        debug!("Clustered into {} description groups", groups.len());

        let mut configured_names = DescriptionIndex::new();
        for entry in &config.periodic {
            configured_names.insert(&entry.name);
        }
        let pruned = prune_groups(groups, last_incomplete, |name| {
            configured_names.lookup(name).is_some()
        });
        debug!("{} groups survived periodicity pruning", pruned.len());

        let descriptors = merge_descriptors(pruned, config);
        info!(
            "Tracking {} cyclic descriptors ({} declared in config)",
            descriptors.len(),
            config.periodic.len() + config.save.len()
        );

        let totals = aggregate(&ledger);
        let (complete, incomplete) = split_incomplete(totals);

        let longest = longest_period(&descriptors).unwrap_or(MIN_FORECAST_DAYS);
        let horizon = horizon_months(longest);
        if horizon >= complete.len() {
            return Err(PlannerError::InsufficientHistory {
                available: complete.len(),
                required: horizon + 1,
            });
        }

        // Date of the final transaction in the last fully-elapsed month.
        let last_complete_month = complete.last().map(|t| t.month).unwrap_or_else(|| {
            MonthKey::from_date(last_incomplete)
        });
        let last_completed = ledger
            .iter()
            .filter(|t| MonthKey::from_date(t.date) == last_complete_month)
            .map(|t| t.date)
            .max()
            .unwrap_or(last_incomplete);

        let months: Vec<MonthKey> = complete.iter().map(|t| t.month).collect();
        let margins: Vec<f64> = complete.iter().map(|t| t.margin()).collect();
        debug!(
            "Balancing {} months of margin over a {}-month horizon",
            margins.len(),
            horizon
        );
        let mut balanced = balance(margins, horizon)?;

        let mut actuals = allocate(&descriptors, &mut balanced, &months, last_completed);

        let horizon_days = longest.max(MIN_FORECAST_DAYS) as usize;
        let plan = build_plan(&descriptors, last_incomplete, horizon_days);

        let current_month = match incomplete {
            Some(bucket) => transactions_in_month(&ledger, bucket.month),
            None => Vec::new(),
        };
        let realisations = realise(&descriptors, &current_month, &mut actuals);
        debug!(
            "Realised {} of the scheduled obligations against the current month",
            realisations.len()
        );

        let entries = schedule_entries(&plan, &descriptors, &actuals);

        let projected = entries.last().map(|e| e.cumulative_cost).unwrap_or(0.0);
        let realized: f64 = realisations.iter().map(|r| r.effective).sum();
        let estimated_total = projected + realized;

        let cycle_report = cycle_rows(&descriptors, &actuals, last_incomplete);
        let forecast_report = forecast_rows(&entries);

        Ok(ForecastOutcome {
            descriptors,
            actuals,
            plan,
            realisations,
            entries,
            cycle_report,
            forecast_report,
            estimated_total,
        })
    }
}
