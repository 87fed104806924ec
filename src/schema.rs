use crate::error::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Category marking intra-account transfers. Always excluded from analysis.
pub const INTERNAL_CATEGORY: &str = "Internal";

/// A single ledger entry in the intermediate representation all bank
/// exports are normalized into. Expenses carry negative amounts,
/// income non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(with = "ledger_date")]
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
    pub category: String,
}

impl Transaction {
    pub fn is_internal(&self) -> bool {
        self.category == INTERNAL_CATEGORY
    }
}

/// A user-declared periodic expense from the `[[periodic]]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticCycleEntry {
    pub name: String,
    /// Recurrence period in days.
    pub period: u32,
    #[serde(with = "ledger_date")]
    pub start: NaiveDate,
    #[serde(with = "ledger_date")]
    pub entered: NaiveDate,
    pub amount: f64,
}

/// A savings goal from the `[[save]]` config section: a target amount to
/// reach by a deadline rather than a recurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoalEntry {
    pub name: String,
    #[serde(with = "ledger_date")]
    pub entered: NaiveDate,
    #[serde(with = "ledger_date")]
    pub deadline: NaiveDate,
    pub amount: f64,
}

/// Declared recurring items and analysis tuning consumed from the
/// storage layer's TOML document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub periodic: Vec<SyntheticCycleEntry>,

    #[serde(default)]
    pub save: Vec<SavingsGoalEntry>,

    /// Categories excluded from cycle detection only. Internal transfers
    /// are excluded from everything regardless of this list.
    #[serde(default)]
    pub blacklist: Vec<String>,
}

impl PlannerConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        // A zero-day period would divide targets by zero and stall
        // next-due projection.
        if let Some(entry) = config.periodic.iter().find(|e| e.period == 0) {
            return Err(crate::error::PlannerError::InvalidPeriod(
                entry.name.clone(),
            ));
        }
        Ok(config)
    }

    pub fn is_blacklisted(&self, category: &str) -> bool {
        self.blacklist.iter().any(|c| c == category)
    }
}

/// Serde adapter for the DD/MM/YYYY date strings used throughout the
/// ledger IR and config sections.
mod ledger_date {
    use crate::utils::{format_ledger_date, parse_ledger_date};
    use chrono::NaiveDate;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_ledger_date(*date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_ledger_date(&raw).map_err(serde::de::Error::custom)
    }
}
