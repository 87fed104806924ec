use crate::cycle::{CyclicDescriptor, DescriptorId, DescriptorKind};
use crate::error::{PlannerError, Result};
use crate::monthly::MonthKey;
use crate::utils::days_between;
use chrono::{Days, NaiveDate};

/// Id-indexed targets and accumulated savings per descriptor.
#[derive(Debug, Clone)]
pub struct ActualsTable {
    targets: Vec<f64>,
    saved: Vec<f64>,
}

impl ActualsTable {
    fn with_capacity(descriptors: &[CyclicDescriptor]) -> Self {
        let size = descriptors
            .iter()
            .map(|d| d.id.0 + 1)
            .max()
            .unwrap_or(0);
        Self {
            targets: vec![0.0; size],
            saved: vec![0.0; size],
        }
    }

    /// Normalized monthly-equivalent cost for the descriptor.
    pub fn target(&self, id: DescriptorId) -> f64 {
        self.targets[id.0]
    }

    /// Surplus allocated toward the descriptor so far.
    pub fn saved(&self, id: DescriptorId) -> f64 {
        self.saved[id.0]
    }

    /// Overwrites the tracked amount, used when realisation replaces
    /// projected savings with the post-charge remainder.
    pub fn set_saved(&mut self, id: DescriptorId, value: f64) {
        self.saved[id.0] = value;
    }
}

/// Monthly-equivalent cost: the per-occurrence cost spread over the
/// period expressed in 31-day months, or the full amount for goals.
pub fn monthly_target(descriptor: &CyclicDescriptor) -> f64 {
    match descriptor.period_days() {
        Some(period) => descriptor.per_occurrence_cost() / (period as f64 / 31.0),
        None => descriptor.per_occurrence_cost(),
    }
}

/// Projects the descriptor's next due date at or after `reference`.
///
/// An explicit override always wins. Goals fall due at their deadline.
/// Detected cycles use naive last + period arithmetic, falling back to
/// the observed day-gap distribution when the naive projection is
/// already past; declared synthetic cycles advance by whole periods
/// since their period is exact.
pub fn next_due(descriptor: &CyclicDescriptor, reference: NaiveDate) -> Result<NaiveDate> {
    if let Some(next) = descriptor.explicit_next() {
        return Ok(next);
    }

    match &descriptor.kind {
        DescriptorKind::Goal { deadline, .. } => Ok(*deadline),
        DescriptorKind::Synthetic {
            period_days, start, ..
        } => {
            let mut due = *start + Days::new(*period_days as u64);
            while due < reference {
                due = due + Days::new(*period_days as u64);
            }
            Ok(due)
        }
        DescriptorKind::Detected {
            period_days,
            last,
            distribution,
            ..
        } => {
            let naive = *last + Days::new(*period_days as u64);
            if naive >= reference {
                return Ok(naive);
            }
            let elapsed = days_between(*last, reference);
            match distribution.next_offset_after(elapsed) {
                Some(offset) => Ok(*last + Days::new(offset as u64)),
                None => Err(PlannerError::UnresolvableNextOccurrence(
                    descriptor.name.clone(),
                )),
            }
        }
    }
}

/// A descriptor is due in `month` when its next projected occurrence
/// lands in that calendar year/month.
pub fn is_due(descriptor: &CyclicDescriptor, month: MonthKey) -> bool {
    let projected = match &descriptor.kind {
        DescriptorKind::Goal { deadline, .. } => *deadline,
        DescriptorKind::Detected {
            period_days, last, ..
        }
        | DescriptorKind::Synthetic {
            period_days,
            start: last,
            ..
        } => *last + Days::new(*period_days as u64),
    };
    MonthKey::from_date(projected) == month
}

/// Allocates balanced surplus to each obligation in priority order:
/// soonest next-due first, ties broken by smaller cost.
///
/// A descriptor due in the reference month claims its full
/// per-occurrence cost from the most recent margin slot. Otherwise it
/// draws its monthly target from each positive slot among the months
/// elapsed since its last occurrence, oldest first, never exceeding
/// the full obligation. Draws decrement `margins` in place, so later
/// descriptors see reduced availability.
///
/// `months` labels the margin slots and must align with `margins`.
pub fn allocate(
    descriptors: &[CyclicDescriptor],
    margins: &mut [f64],
    months: &[MonthKey],
    reference: NaiveDate,
) -> ActualsTable {
    debug_assert_eq!(margins.len(), months.len());

    let mut table = ActualsTable::with_capacity(descriptors);
    let reference_month = MonthKey::from_date(reference);

    // An unresolvable projection only bars a descriptor from the
    // forecast; for allocation ordering the naive projection is enough.
    let mut ordered: Vec<(&CyclicDescriptor, NaiveDate)> = descriptors
        .iter()
        .map(|descriptor| {
            let due = next_due(descriptor, reference).unwrap_or_else(|_| {
                let period = descriptor.period_days().unwrap_or(0) as u64;
                descriptor.last_occurrence() + Days::new(period)
            });
            (descriptor, due)
        })
        .collect();
    ordered.sort_by(|a, b| {
        a.1.cmp(&b.1).then(
            a.0.per_occurrence_cost()
                .partial_cmp(&b.0.per_occurrence_cost())
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });

    for (descriptor, _) in ordered {
        let id = descriptor.id;
        table.targets[id.0] = monthly_target(descriptor);

        let full_cost = descriptor.per_occurrence_cost();
        let last_month = MonthKey::from_date(descriptor.last_occurrence());

        let due_now = is_due(descriptor, reference_month);
        if due_now {
            if let Some(slot) = margins.last_mut() {
                if *slot > 0.0 {
                    let draw = full_cost.min(*slot);
                    *slot -= draw;
                    table.saved[id.0] += draw;
                }
            }
            continue;
        }

        let target = table.targets[id.0];
        for (index, month) in months.iter().enumerate() {
            if last_month.months_until(*month) <= 0 || reference_month.months_until(*month) > 0 {
                continue;
            }
            if margins[index] <= 0.0 {
                continue;
            }
            let remaining = full_cost - table.saved[id.0];
            if remaining <= 0.0 {
                break;
            }
            let draw = target.min(margins[index]).min(remaining);
            margins[index] -= draw;
            table.saved[id.0] += draw;
        }
    }

    table
}
