use crate::error::{PlannerError, Result};
use chrono::NaiveDate;

/// Ledger dates arrive in the IR as DD/MM/YYYY strings.
pub fn parse_ledger_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%d/%m/%Y")
        .map_err(|_| PlannerError::DateParse(input.to_string()))
}

pub fn format_ledger_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ledger_date() {
        let date = parse_ledger_date("05/03/2016").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2016, 3, 5).unwrap());

        let date = parse_ledger_date(" 31/12/2015 ").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2015, 12, 31).unwrap());
    }

    #[test]
    fn test_parse_ledger_date_rejects_iso() {
        assert!(matches!(
            parse_ledger_date("2016-03-05"),
            Err(PlannerError::DateParse(_))
        ));
        assert!(parse_ledger_date("31/13/2015").is_err());
        assert!(parse_ledger_date("").is_err());
    }

    #[test]
    fn test_format_round_trip() {
        let date = NaiveDate::from_ymd_opt(2016, 1, 9).unwrap();
        assert_eq!(parse_ledger_date(&format_ledger_date(date)).unwrap(), date);
    }

    #[test]
    fn test_days_between() {
        let a = NaiveDate::from_ymd_opt(2016, 2, 4).unwrap();
        let b = NaiveDate::from_ymd_opt(2016, 3, 5).unwrap();
        assert_eq!(days_between(a, b), 30);
        assert_eq!(days_between(b, a), -30);
    }
}
