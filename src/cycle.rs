use crate::grouper::{DescriptionIndex, TransactionGroup};
use crate::schema::PlannerConfig;
use crate::utils::days_between;
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// Groups with fewer day-gaps than this cannot support periodicity
/// inference.
const MIN_DELTAS: usize = 2;

/// A lapsed recurrence: more than this many periods since the last
/// occurrence means the obligation is treated as discontinued.
const STALENESS_PERIODS: i64 = 2;

/// Histogram of observed day-gaps. Serves as the fallback source for
/// next-occurrence projection when naive period arithmetic lands in
/// the past.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaDistribution {
    counts: BTreeMap<i64, usize>,
}

impl DeltaDistribution {
    pub fn from_deltas(deltas: &[i64]) -> Self {
        let mut counts = BTreeMap::new();
        for &delta in deltas {
            *counts.entry(delta).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Smallest offset with positive mass strictly beyond `elapsed` days.
    pub fn next_offset_after(&self, elapsed: i64) -> Option<i64> {
        self.counts
            .range(elapsed + 1..)
            .find(|(_, &count)| count > 0)
            .map(|(&offset, _)| offset)
    }

    /// Largest recorded offset, bounding how far projection can reach.
    pub fn span(&self) -> Option<i64> {
        self.counts.keys().next_back().copied()
    }
}

/// Infers the smallest period (in days) under which a majority of the
/// observed day-gaps sit near integer multiples, or `None` when no
/// candidate clears the support threshold.
///
/// Candidates run from the minimum positive gap upward. A gap supports
/// a candidate P when its deviation from the nearest multiple of P is
/// within max(1, P/10) days. Beyond simple support, at least half the
/// gaps must sit near the *first* multiple: sequences like
/// [5, 40, 2, 90] share divisors but no common beat, and are rejected.
///
/// Pure function of the slice, so re-running always yields the same
/// verdict.
pub fn infer_period(deltas: &[i64]) -> Option<u32> {
    if deltas.len() < MIN_DELTAS {
        return None;
    }

    let min_candidate = deltas.iter().copied().filter(|&d| d > 0).min()?;
    let max_candidate = deltas.iter().copied().max()?;
    let mean_delta = deltas.iter().sum::<i64>() as f64 / deltas.len() as f64;

    let mut best: Option<(f64, f64, i64)> = None;

    for candidate in min_candidate..=max_candidate {
        let tolerance = (candidate / 10).max(1);
        let mut support = 0usize;
        let mut first_multiple = 0usize;
        let mut total_deviation = 0i64;

        for &delta in deltas {
            let multiple = ((delta as f64 / candidate as f64).round()) as i64;
            if multiple < 1 {
                continue;
            }
            let deviation = (delta - multiple * candidate).abs();
            if deviation <= tolerance {
                support += 1;
                total_deviation += deviation;
                if multiple == 1 {
                    first_multiple += 1;
                }
            }
        }

        if support * 2 < deltas.len() || first_multiple * 2 < deltas.len() {
            continue;
        }

        let avg_deviation = total_deviation as f64 / support as f64;
        let distance_from_mean = (candidate as f64 - mean_delta).abs();
        let key = (avg_deviation, distance_from_mean, candidate);

        let better = match best {
            None => true,
            Some(current) => key < current,
        };
        if better {
            best = Some(key);
        }
    }

    best.map(|(_, _, period)| period as u32)
}

/// Stable identifier assigned at descriptor creation. The targets and
/// actuals tables are indexed by this rather than descriptor identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DescriptorId(pub usize);

/// A recurring or goal-based obligation tracked through balancing,
/// allocation and forecasting.
#[derive(Debug, Clone)]
pub struct CyclicDescriptor {
    pub id: DescriptorId,
    pub name: String,
    pub kind: DescriptorKind,
}

#[derive(Debug, Clone)]
pub enum DescriptorKind {
    /// Automatically detected recurrence.
    Detected {
        period_days: u32,
        last: NaiveDate,
        /// Mean per-occurrence amount, signed as in the ledger.
        mean: f64,
        distribution: DeltaDistribution,
    },
    /// User-declared periodic item from the `[[periodic]]` section.
    Synthetic {
        period_days: u32,
        start: NaiveDate,
        amount: f64,
        next: Option<NaiveDate>,
    },
    /// Savings goal from the `[[save]]` section: no recurrence, only a
    /// deadline and a target amount.
    Goal {
        entered: NaiveDate,
        deadline: NaiveDate,
        amount: f64,
    },
}

impl CyclicDescriptor {
    pub fn period_days(&self) -> Option<u32> {
        match &self.kind {
            DescriptorKind::Detected { period_days, .. }
            | DescriptorKind::Synthetic { period_days, .. } => Some(*period_days),
            DescriptorKind::Goal { .. } => None,
        }
    }

    /// The date the obligation last occurred, or was entered for goals.
    pub fn last_occurrence(&self) -> NaiveDate {
        match &self.kind {
            DescriptorKind::Detected { last, .. } => *last,
            DescriptorKind::Synthetic { start, .. } => *start,
            DescriptorKind::Goal { entered, .. } => *entered,
        }
    }

    /// Positive per-occurrence magnitude, regardless of ledger sign.
    pub fn per_occurrence_cost(&self) -> f64 {
        match &self.kind {
            DescriptorKind::Detected { mean, .. } => mean.abs(),
            DescriptorKind::Synthetic { amount, .. } => amount.abs(),
            DescriptorKind::Goal { amount, .. } => amount.abs(),
        }
    }

    pub fn explicit_next(&self) -> Option<NaiveDate> {
        match &self.kind {
            DescriptorKind::Synthetic { next, .. } => *next,
            _ => None,
        }
    }

    pub fn distribution(&self) -> Option<&DeltaDistribution> {
        match &self.kind {
            DescriptorKind::Detected { distribution, .. } => Some(distribution),
            _ => None,
        }
    }
}

/// A group that survived pruning, with its inferred period when one
/// exists. Force-kept groups may carry no period; their period comes
/// from the synthetic config entry they merge with.
#[derive(Debug)]
pub struct PrunedGroup {
    pub group: TransactionGroup,
    pub period_days: Option<u32>,
}

/// Retains groups that are periodic and not lapsed relative to
/// `reference`, plus any group the keep-predicate names regardless of
/// classification.
pub fn prune_groups<F>(
    groups: Vec<TransactionGroup>,
    reference: NaiveDate,
    keep: F,
) -> Vec<PrunedGroup>
where
    F: Fn(&str) -> bool,
{
    let mut retained = Vec::new();

    for group in groups {
        let period = infer_period(&group.deltas);
        let fresh = period.is_some_and(|p| {
            let last = group.members.last().map(|m| m.date).unwrap_or(reference);
            days_between(last, reference) <= STALENESS_PERIODS * p as i64
        });

        if fresh {
            retained.push(PrunedGroup {
                group,
                period_days: period,
            });
        } else if keep(&group.name) {
            debug!("Force-retaining group '{}' for configured cycle", group.name);
            retained.push(PrunedGroup {
                group,
                period_days: period,
            });
        }
    }

    retained
}

/// Converts pruned groups into descriptors and merges in the configured
/// synthetic cycles and savings goals, assigning ids in emission order.
///
/// A pruned group whose name matches a configured synthetic entry folds
/// into that entry: the declared period and amount win, but the group's
/// most recent occurrence advances the entry's start date.
pub fn merge_descriptors(
    pruned: Vec<PrunedGroup>,
    config: &PlannerConfig,
) -> Vec<CyclicDescriptor> {
    let mut synthetic_index = DescriptionIndex::new();
    for entry in &config.periodic {
        synthetic_index.insert(&entry.name);
    }
    let mut synthetic_consumed = vec![false; config.periodic.len()];

    let mut descriptors = Vec::new();
    let mut next_id = 0usize;
    let mut assign_id = move || {
        let id = DescriptorId(next_id);
        next_id += 1;
        id
    };

    for pruned_group in pruned {
        let group = pruned_group.group;
        let last = match group.members.last() {
            Some(member) => member.date,
            None => continue,
        };

        if let Some(idx) = synthetic_index.lookup(&group.name) {
            let entry = &config.periodic[idx];
            synthetic_consumed[idx] = true;
            descriptors.push(CyclicDescriptor {
                id: assign_id(),
                name: entry.name.clone(),
                kind: DescriptorKind::Synthetic {
                    period_days: entry.period,
                    start: entry.start.max(last),
                    amount: entry.amount,
                    next: None,
                },
            });
            continue;
        }

        let Some(period_days) = pruned_group.period_days else {
            continue;
        };

        let count = group.members.len().max(1);
        let mean = group.members.iter().map(|m| m.amount).sum::<f64>() / count as f64;

        descriptors.push(CyclicDescriptor {
            id: assign_id(),
            name: group.name.clone(),
            kind: DescriptorKind::Detected {
                period_days,
                last,
                mean,
                distribution: DeltaDistribution::from_deltas(&group.deltas),
            },
        });
    }

    for (idx, entry) in config.periodic.iter().enumerate() {
        if synthetic_consumed[idx] {
            continue;
        }
        descriptors.push(CyclicDescriptor {
            id: assign_id(),
            name: entry.name.clone(),
            kind: DescriptorKind::Synthetic {
                period_days: entry.period,
                start: entry.start,
                amount: entry.amount,
                next: None,
            },
        });
    }

    for entry in &config.save {
        descriptors.push(CyclicDescriptor {
            id: assign_id(),
            name: entry.name.clone(),
            kind: DescriptorKind::Goal {
                entered: entry.entered,
                deadline: entry.deadline,
                amount: entry.amount,
            },
        });
    }

    descriptors
}

/// The longest period across the descriptor set, which drives the
/// balancing horizon.
pub fn longest_period(descriptors: &[CyclicDescriptor]) -> Option<u32> {
    descriptors.iter().filter_map(|d| d.period_days()).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouper::cluster;
    use crate::schema::{SyntheticCycleEntry, Transaction};

    fn txn(date: (i32, u32, u32), amount: f64, description: &str) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount,
            description: description.to_string(),
            category: "General".to_string(),
        }
    }

    #[test]
    fn test_infer_period_monthly_jitter() {
        assert_eq!(infer_period(&[30, 31, 29, 30]), Some(30));
    }

    #[test]
    fn test_infer_period_no_consistent_beat() {
        assert_eq!(infer_period(&[5, 40, 2, 90]), None);
    }

    #[test]
    fn test_infer_period_tolerates_missed_occurrence() {
        // One skipped month shows up as a double-length gap.
        assert_eq!(infer_period(&[30, 61, 30, 31]), Some(30));
    }

    #[test]
    fn test_infer_period_exact_weekly() {
        assert_eq!(infer_period(&[7, 7, 7, 7, 7]), Some(7));
    }

    #[test]
    fn test_infer_period_too_few_deltas() {
        assert_eq!(infer_period(&[30]), None);
        assert_eq!(infer_period(&[]), None);
    }

    #[test]
    fn test_infer_period_idempotent() {
        let deltas = [28, 31, 30, 29];
        let first = infer_period(&deltas);
        assert!(first.is_some());
        assert_eq!(infer_period(&deltas), first);
    }

    #[test]
    fn test_delta_distribution_scan() {
        let dist = DeltaDistribution::from_deltas(&[30, 31, 61, 30]);
        assert_eq!(dist.next_offset_after(29), Some(30));
        assert_eq!(dist.next_offset_after(31), Some(61));
        assert_eq!(dist.next_offset_after(61), None);
        assert_eq!(dist.span(), Some(61));
    }

    fn monthly_group(description: &str) -> Vec<Transaction> {
        vec![
            txn((2016, 1, 5), -50.0, description),
            txn((2016, 2, 4), -50.0, description),
            txn((2016, 3, 5), -50.0, description),
            txn((2016, 4, 4), -50.0, description),
        ]
    }

    #[test]
    fn test_prune_keeps_fresh_periodic_group() {
        let groups = cluster(&monthly_group("Gym Membership"));
        let reference = NaiveDate::from_ymd_opt(2016, 4, 20).unwrap();
        let pruned = prune_groups(groups, reference, |_| false);
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].period_days, Some(30));
    }

    #[test]
    fn test_prune_drops_stale_group() {
        let groups = cluster(&monthly_group("Gym Membership"));
        // Well past two periods since the last occurrence.
        let reference = NaiveDate::from_ymd_opt(2016, 8, 1).unwrap();
        let pruned = prune_groups(groups, reference, |_| false);
        assert!(pruned.is_empty());
    }

    #[test]
    fn test_prune_force_keeps_configured_name() {
        let groups = cluster(&monthly_group("Gym Membership"));
        let reference = NaiveDate::from_ymd_opt(2016, 8, 1).unwrap();
        let pruned = prune_groups(groups, reference, |name| name == "Gym Membership");
        assert_eq!(pruned.len(), 1);
    }

    #[test]
    fn test_prune_drops_aperiodic_group() {
        let transactions = vec![
            txn((2016, 1, 5), -10.0, "One-off Shop"),
            txn((2016, 1, 10), -10.0, "One-off Shop"),
            txn((2016, 2, 19), -10.0, "One-off Shop"),
            txn((2016, 2, 21), -10.0, "One-off Shop"),
            txn((2016, 5, 21), -10.0, "One-off Shop"),
        ];
        let groups = cluster(&transactions);
        let reference = NaiveDate::from_ymd_opt(2016, 5, 25).unwrap();
        let pruned = prune_groups(groups, reference, |_| false);
        assert!(pruned.is_empty());
    }

    #[test]
    fn test_merge_detected_mean_per_occurrence() {
        let groups = cluster(&monthly_group("Gym Membership"));
        let reference = NaiveDate::from_ymd_opt(2016, 4, 20).unwrap();
        let pruned = prune_groups(groups, reference, |_| false);

        let config = PlannerConfig::default();
        let descriptors = merge_descriptors(pruned, &config);
        assert_eq!(descriptors.len(), 1);

        let descriptor = &descriptors[0];
        assert_eq!(descriptor.id, DescriptorId(0));
        assert_eq!(descriptor.period_days(), Some(30));
        assert_eq!(descriptor.per_occurrence_cost(), 50.0);
        assert_eq!(
            descriptor.last_occurrence(),
            NaiveDate::from_ymd_opt(2016, 4, 4).unwrap()
        );
    }

    #[test]
    fn test_merge_synthetic_absorbs_matching_group() {
        let groups = cluster(&monthly_group("Gym Membership"));
        let reference = NaiveDate::from_ymd_opt(2016, 4, 20).unwrap();
        let pruned = prune_groups(groups, reference, |_| false);

        let config = PlannerConfig {
            periodic: vec![SyntheticCycleEntry {
                name: "Gym Membership".to_string(),
                period: 35,
                start: NaiveDate::from_ymd_opt(2016, 1, 1).unwrap(),
                entered: NaiveDate::from_ymd_opt(2016, 1, 1).unwrap(),
                amount: 55.0,
            }],
            ..Default::default()
        };

        let descriptors = merge_descriptors(pruned, &config);
        assert_eq!(descriptors.len(), 1);
        // Declared period wins; the observed history advances the start.
        assert_eq!(descriptors[0].period_days(), Some(35));
        assert_eq!(descriptors[0].per_occurrence_cost(), 55.0);
        assert_eq!(
            descriptors[0].last_occurrence(),
            NaiveDate::from_ymd_opt(2016, 4, 4).unwrap()
        );
    }

    #[test]
    fn test_merge_appends_unmatched_config_entries() {
        let config = PlannerConfig {
            periodic: vec![SyntheticCycleEntry {
                name: "Car Registration".to_string(),
                period: 365,
                start: NaiveDate::from_ymd_opt(2016, 2, 14).unwrap(),
                entered: NaiveDate::from_ymd_opt(2016, 3, 1).unwrap(),
                amount: 650.0,
            }],
            save: vec![crate::schema::SavingsGoalEntry {
                name: "Holiday".to_string(),
                entered: NaiveDate::from_ymd_opt(2016, 1, 1).unwrap(),
                deadline: NaiveDate::from_ymd_opt(2016, 12, 1).unwrap(),
                amount: 3000.0,
            }],
            ..Default::default()
        };

        let descriptors = merge_descriptors(Vec::new(), &config);
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].period_days(), Some(365));
        assert_eq!(descriptors[1].period_days(), None);
        assert_eq!(longest_period(&descriptors), Some(365));
    }
}
