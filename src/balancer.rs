use crate::error::{PlannerError, Result};
use log::debug;

/// Months of margin history required to evaluate a cycle of
/// `period_days`: one slot per 31-day stretch, rounded up.
pub fn horizon_months(period_days: u32) -> usize {
    period_days.div_ceil(31) as usize
}

/// Redistributes surplus backward in time to cover deficits in the
/// trailing `horizon` months.
///
/// For each deficit month inside the trailing window, earlier surplus
/// months are drained newest-first until the deficit reaches zero or
/// no surplus remains. Months outside the window are only ever
/// sources, never targets, and a deficit that cannot be covered stays
/// negative. The reallocation conserves the series sum.
///
/// Takes the margin series by value and returns the transformed copy;
/// callers must not reuse the pre-balance series downstream.
pub fn balance(mut margins: Vec<f64>, horizon: usize) -> Result<Vec<f64>> {
    if horizon >= margins.len() {
        return Err(PlannerError::InsufficientHistory {
            available: margins.len(),
            required: horizon + 1,
        });
    }

    let window_start = margins.len() - horizon;
    for i in window_start..margins.len() {
        if margins[i] >= 0.0 {
            continue;
        }
        for j in (0..=i).rev() {
            if margins[i] >= 0.0 {
                break;
            }
            if margins[j] > 0.0 {
                let transfer = (-margins[i]).min(margins[j]);
                margins[i] += transfer;
                margins[j] -= transfer;
                debug!(
                    "Balanced {:.2} from month {} into deficit month {}",
                    transfer, j, i
                );
            }
        }
    }

    Ok(margins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizon_months() {
        assert_eq!(horizon_months(30), 1);
        assert_eq!(horizon_months(31), 1);
        assert_eq!(horizon_months(32), 2);
        assert_eq!(horizon_months(365), 12);
    }

    #[test]
    fn test_balance_trailing_window_only() {
        // Month 1's deficit is outside the horizon and must stay put;
        // month 3's deficit pulls from the nearest earlier surplus.
        let balanced = balance(vec![100.0, -50.0, 100.0, -30.0], 2).unwrap();
        assert_eq!(balanced, vec![100.0, -50.0, 70.0, 0.0]);
    }

    #[test]
    fn test_balance_conserves_sum() {
        let margins = vec![120.0, -80.0, 45.0, -60.0, -20.0];
        let before: f64 = margins.iter().sum();
        let balanced = balance(margins, 3).unwrap();
        let after: f64 = balanced.iter().sum();
        assert!((before - after).abs() < 1e-9);
    }

    #[test]
    fn test_balance_deficit_survives_exhausted_surplus() {
        let balanced = balance(vec![10.0, -50.0], 1).unwrap();
        assert_eq!(balanced, vec![0.0, -40.0]);
    }

    #[test]
    fn test_balance_drains_newest_surplus_first() {
        let balanced = balance(vec![30.0, 30.0, -40.0], 1).unwrap();
        // j scans backward from the deficit, so month 1 empties before
        // month 0 is touched.
        assert_eq!(balanced, vec![20.0, 0.0, 0.0]);
    }

    #[test]
    fn test_balance_insufficient_history() {
        let result = balance(vec![10.0, -5.0], 2);
        assert!(matches!(
            result,
            Err(PlannerError::InsufficientHistory {
                available: 2,
                required: 3
            })
        ));
    }

    #[test]
    fn test_balance_no_deficits_is_identity() {
        let balanced = balance(vec![10.0, 20.0, 30.0], 2).unwrap();
        assert_eq!(balanced, vec![10.0, 20.0, 30.0]);
    }
}
