use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::{
    record::{RecordSet, ShiftRecord},
    settings::{Categories, Family},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

/// Counts for one month.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Per category value, only for values that occur. Unset categories are
    /// not listed here but are part of `total`.
    pub counts: BTreeMap<String, usize>,
    pub total: usize,
    pub worked: usize,
    pub absent: usize,
    /// Worked days plus credited absences.
    pub credited_days: usize,
    /// Records whose category is unset or not configured.
    pub unrecognized: usize,
}

impl Summary {
    pub fn count(&self, category: &str) -> usize {
        self.counts.get(category).copied().unwrap_or(0)
    }
}

pub fn in_period(records: &RecordSet, period: Period) -> RecordSet {
    records
        .iter()
        .filter(|record| period.contains(record.date))
        .cloned()
        .collect()
}

pub fn summarize(records: &RecordSet, categories: &Categories, period: Period) -> Summary {
    let mut summary = Summary::default();

    for ShiftRecord { category, .. } in records.iter().filter(|r| period.contains(r.date)) {
        summary.total += 1;
        if !category.is_unset() {
            *summary.counts.entry(category.to_string()).or_default() += 1;
        }

        match categories.family(category.as_str()) {
            Some(Family::Work) => {
                summary.worked += 1;
                summary.credited_days += 1;
            }
            Some(Family::Absence) => {
                summary.absent += 1;
                if categories.is_credited(category.as_str()) {
                    summary.credited_days += 1;
                }
            }
            None => summary.unrecognized += 1,
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(y: i32, m: u32, d: u32, category: &str) -> ShiftRecord {
        ShiftRecord::new(NaiveDate::from_ymd_opt(y, m, d).unwrap(), category, "")
    }

    fn march() -> RecordSet {
        RecordSet::new(vec![
            record(2024, 3, 1, "Morning"),
            record(2024, 3, 2, "Morning"),
            record(2024, 3, 3, "Morning"),
            record(2024, 3, 10, "Vacation"),
            record(2024, 3, 11, "Vacation"),
            record(2024, 3, 20, "Sickness"),
            record(2024, 2, 29, "Night"),
            record(2023, 3, 5, "Night"),
        ])
    }

    #[test]
    fn test_summarize_month() {
        let summary = summarize(&march(), &Categories::default(), Period::new(2024, 3));
        assert_eq!(summary.count("Morning"), 3);
        assert_eq!(summary.count("Vacation"), 2);
        assert_eq!(summary.count("Sickness"), 1);
        assert_eq!(summary.count("Night"), 0);
        assert_eq!(summary.counts.len(), 3);
        assert_eq!(summary.total, 6);
        assert_eq!(summary.worked, 3);
        assert_eq!(summary.absent, 3);
        assert_eq!(summary.credited_days, 6);
        assert_eq!(summary.unrecognized, 0);
    }

    #[test]
    fn test_summarize_uncredited_and_unknown() {
        let records = RecordSet::new(vec![
            record(2024, 5, 1, "Permission"),
            record(2024, 5, 2, "Mattina"),
            record(2024, 5, 3, ""),
            record(2024, 5, 4, "Evening"),
        ]);
        let summary = summarize(&records, &Categories::default(), Period::new(2024, 5));
        assert_eq!(summary.total, 4);
        assert_eq!(summary.credited_days, 1);
        assert_eq!(summary.absent, 1);
        assert_eq!(summary.unrecognized, 2);
        assert_eq!(summary.count("Mattina"), 1);
        assert!(!summary.counts.contains_key(""));
    }

    #[test]
    fn test_in_period() {
        let filtered = in_period(&march(), Period::new(2024, 2));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.as_slice()[0].category.as_str(), "Night");
        assert!(in_period(&march(), Period::new(2022, 3)).is_empty());
    }

    #[test]
    fn test_period_containing() {
        let period = Period::containing(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(period, Period::new(2024, 12));
    }
}
