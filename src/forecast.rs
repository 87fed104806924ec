use crate::actuals::{next_due, ActualsTable};
use crate::cycle::{CyclicDescriptor, DescriptorId};
use crate::grouper::{cluster, DescriptionIndex};
use crate::schema::Transaction;
use crate::utils::days_between;
use chrono::NaiveDate;
use log::warn;

/// Day-indexed schedule over the forecast horizon. Slot 0 is the
/// reference date itself.
#[derive(Debug, Clone)]
pub struct Plan {
    pub start: NaiveDate,
    pub slots: Vec<Vec<DescriptorId>>,
}

impl Plan {
    pub fn horizon_days(&self) -> usize {
        self.slots.len()
    }

    pub fn date_at(&self, offset: usize) -> NaiveDate {
        self.start + chrono::Days::new(offset as u64)
    }
}

/// Places each descriptor at its next-due offset within the horizon.
/// Descriptors without an explicit next date also repeat at every
/// further period offset inside the bounds; offsets outside the span
/// are silently skipped. Descriptors whose next occurrence cannot be
/// projected are left out of the plan with a warning rather than
/// failing the whole forecast.
pub fn build_plan(
    descriptors: &[CyclicDescriptor],
    start: NaiveDate,
    horizon_days: usize,
) -> Plan {
    let mut slots = vec![Vec::new(); horizon_days];

    for descriptor in descriptors {
        let due = match next_due(descriptor, start) {
            Ok(due) => due,
            Err(err) => {
                warn!("Omitting '{}' from forecast: {}", descriptor.name, err);
                continue;
            }
        };

        let first_offset = days_between(start, due);
        if first_offset < 0 {
            continue;
        }

        let repeats = descriptor.explicit_next().is_none();
        let period = descriptor.period_days().map(|p| p as i64);

        let mut offset = first_offset;
        loop {
            if offset >= horizon_days as i64 {
                break;
            }
            slots[offset as usize].push(descriptor.id);

            match (repeats, period) {
                (true, Some(step)) if step > 0 => offset += step,
                _ => break,
            }
        }
    }

    Plan { start, slots }
}

/// Outcome of matching one scheduled obligation against a realized
/// charge in the current month.
#[derive(Debug, Clone, PartialEq)]
pub struct Realisation {
    pub id: DescriptorId,
    /// The realized signed cost clustered from the ledger.
    pub cost: f64,
    /// Portion of the charge still impacting the budget after savings.
    pub effective: f64,
    /// Savings left over once the charge is absorbed.
    pub remaining: f64,
}

/// Reconciles the incomplete month's transactions against the
/// descriptor set. Realized charges are clustered with the same fuzzy
/// mechanism used for detection and matched by name; each match folds
/// prior savings into the charge and the descriptor's tracked amount
/// becomes the leftover.
pub fn realise(
    descriptors: &[CyclicDescriptor],
    current_month: &[Transaction],
    actuals: &mut ActualsTable,
) -> Vec<Realisation> {
    let mut index = DescriptionIndex::new();
    let mut handles: Vec<DescriptorId> = Vec::new();
    for descriptor in descriptors {
        let handle = index.insert(&descriptor.name);
        if handle == handles.len() {
            handles.push(descriptor.id);
        }
    }

    let mut realisations = Vec::new();
    for group in cluster(current_month) {
        let Some(handle) = index.lookup(&group.name) else {
            continue;
        };
        let id = handles[handle];

        let cost: f64 = group.members.iter().map(|m| m.amount).sum();
        let saved = actuals.saved(id);
        let effective = (cost + saved).min(0.0);
        let remaining = (cost + saved).max(0.0);

        actuals.set_saved(id, remaining);
        realisations.push(Realisation {
            id,
            cost,
            effective,
            remaining,
        });
    }

    realisations
}

/// One line of the day-ordered forecast with running totals.
#[derive(Debug, Clone)]
pub struct ScheduledEntry {
    pub date: NaiveDate,
    pub id: DescriptorId,
    pub name: String,
    pub cost: f64,
    pub effective: f64,
    pub cumulative_cost: f64,
    pub cumulative_effective: f64,
}

/// Flattens the plan into schedule order, accumulating projected and
/// savings-adjusted running totals.
pub fn schedule_entries(
    plan: &Plan,
    descriptors: &[CyclicDescriptor],
    actuals: &ActualsTable,
) -> Vec<ScheduledEntry> {
    let mut entries = Vec::new();
    let mut cumulative_cost = 0.0;
    let mut cumulative_effective = 0.0;

    for (offset, slot) in plan.slots.iter().enumerate() {
        for &id in slot {
            let Some(descriptor) = descriptors.iter().find(|d| d.id == id) else {
                continue;
            };
            let cost = -descriptor.per_occurrence_cost();
            let effective = (cost + actuals.saved(id)).min(0.0);

            cumulative_cost += cost;
            cumulative_effective += effective;

            entries.push(ScheduledEntry {
                date: plan.date_at(offset),
                id,
                name: descriptor.name.clone(),
                cost,
                effective,
                cumulative_cost,
                cumulative_effective,
            });
        }
    }

    entries
}
