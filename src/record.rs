use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::{
    ast::{Row, Table},
    error::StoreError,
};

pub const DATE_COLUMN: &str = "Date";
pub const TYPE_COLUMN: &str = "Type";
pub const NOTE_COLUMN: &str = "Note";

/// Format every date is written in.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const INPUT_DATE_FORMATS: [&str; 2] = [DATE_FORMAT, "%d/%m/%Y"];
const STORED_DATE_FORMATS: [&str; 4] = [DATE_FORMAT, "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];
const STORED_DATETIME_FORMATS: [&str; 3] =
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category(String);

impl Category {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unset(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShiftRecord {
    pub date: NaiveDate,
    pub category: Category,
    pub note: String,
}

impl ShiftRecord {
    pub fn new(date: NaiveDate, category: impl Into<Category>, note: impl Into<String>) -> Self {
        Self {
            date,
            category: category.into(),
            note: note.into(),
        }
    }
}

/// All records of the backing medium, held for a single interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    records: Vec<ShiftRecord>,
}

impl RecordSet {
    pub fn new(records: Vec<ShiftRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ShiftRecord> {
        self.records.iter()
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[ShiftRecord] {
        &self.records
    }

    pub fn push(&mut self, record: ShiftRecord) {
        self.records.push(record);
    }

    /// Removes every record on `date`, returning how many were removed.
    pub fn remove_date(&mut self, date: NaiveDate) -> usize {
        let before = self.records.len();
        self.records.retain(|record| record.date != date);
        before - self.records.len()
    }

    pub fn remove_row(&mut self, row: usize) -> Option<ShiftRecord> {
        (row < self.records.len()).then(|| self.records.remove(row))
    }

    /// Most recent first. Records sharing a date keep their relative order.
    pub fn sort_canonical(&mut self) {
        self.records.sort_by(|a, b| b.date.cmp(&a.date));
    }

    pub fn sorted(mut self) -> Self {
        self.sort_canonical();
        self
    }

    /// Builds records from a stored table. `Type` and `Note` may be missing;
    /// rows whose date cannot be read are skipped and counted.
    pub fn from_table(table: &Table) -> Result<(Self, usize), StoreError> {
        if table.is_empty() {
            return Ok((Self::default(), 0));
        }

        let date_col = table
            .column(DATE_COLUMN)
            .ok_or(StoreError::MissingColumn(DATE_COLUMN))?;
        let type_col = table.column(TYPE_COLUMN);
        let note_col = table.column(NOTE_COLUMN);

        let text = |row: &Row, col: Option<usize>| {
            col.and_then(|i| row.cell(i)).unwrap_or_default().to_string()
        };

        let mut records = Vec::with_capacity(table.rows.len());
        let mut dropped = 0;
        for row in &table.rows {
            let Some(date) = row.cell(date_col).and_then(parse_stored_date) else {
                dropped += 1;
                continue;
            };

            records.push(ShiftRecord {
                date,
                category: Category::new(text(row, type_col)),
                note: text(row, note_col),
            });
        }

        Ok((Self { records }, dropped))
    }

    /// The table written to the medium: fixed header, canonical order,
    /// dates as `YYYY-MM-DD`.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new(vec![
            DATE_COLUMN.to_string(),
            TYPE_COLUMN.to_string(),
            NOTE_COLUMN.to_string(),
        ]);

        let sorted = self.clone().sorted();
        table.rows = sorted
            .iter()
            .map(|record| {
                Row::new(vec![
                    record.date.format(DATE_FORMAT).to_string(),
                    record.category.to_string(),
                    record.note.clone(),
                ])
            })
            .collect();

        table
    }
}

impl IntoIterator for RecordSet {
    type Item = ShiftRecord;
    type IntoIter = std::vec::IntoIter<ShiftRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl FromIterator<ShiftRecord> for RecordSet {
    fn from_iter<T: IntoIterator<Item = ShiftRecord>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Lenient parsing for data already on the medium. Anything unreadable is
/// `None` and the row gets dropped.
pub fn parse_stored_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    STORED_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| {
            STORED_DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|datetime| datetime.date())
        })
}

/// Strict parsing for dates typed by the user.
pub fn parse_input_date(value: &str) -> Result<NaiveDate, StoreError> {
    let trimmed = value.trim();
    INPUT_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| StoreError::InvalidDate(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_stored_date_formats() {
        assert_eq!(parse_stored_date("2024-03-05"), Some(date(2024, 3, 5)));
        assert_eq!(parse_stored_date(" 2024/03/05 "), Some(date(2024, 3, 5)));
        assert_eq!(parse_stored_date("05/03/2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_stored_date("05-03-2024"), Some(date(2024, 3, 5)));
        assert_eq!(
            parse_stored_date("2024-03-05 00:00:00"),
            Some(date(2024, 3, 5))
        );
        assert_eq!(
            parse_stored_date("2024-03-05T08:30:00"),
            Some(date(2024, 3, 5))
        );
        assert_eq!(parse_stored_date(""), None);
        assert_eq!(parse_stored_date("yesterday"), None);
        assert_eq!(parse_stored_date("2024-02-30"), None);
    }

    #[test]
    fn test_input_date_is_strict() {
        assert_eq!(parse_input_date("2024-03-05").unwrap(), date(2024, 3, 5));
        assert_eq!(parse_input_date("05/03/2024").unwrap(), date(2024, 3, 5));
        assert!(matches!(
            parse_input_date("2024/03/05"),
            Err(StoreError::InvalidDate(_))
        ));
        assert!(matches!(
            parse_input_date("2024-03-05 10:00:00"),
            Err(StoreError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_from_table_drops_bad_dates() {
        let table = parser::parse_str(
            "Date,Type,Note\n2024-03-05,Morning,a\nnot a date,Night,b\n,Evening,\n2024-03-01,Vacation,\n",
        )
        .unwrap();
        let (records, dropped) = RecordSet::from_table(&table).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_from_table_synthesizes_missing_columns() {
        let table = parser::parse_str("Date\n2024-03-05\n").unwrap();
        let (records, _) = RecordSet::from_table(&table).unwrap();
        let record = &records.as_slice()[0];
        assert!(record.category.is_unset());
        assert_eq!(record.note, "");
    }

    #[test]
    fn test_from_table_short_rows() {
        let table = parser::parse_str("Date,Type,Note\n2024-03-05,Night\n").unwrap();
        let (records, _) = RecordSet::from_table(&table).unwrap();
        assert_eq!(records.as_slice()[0].category.as_str(), "Night");
        assert_eq!(records.as_slice()[0].note, "");
    }

    #[test]
    fn test_from_table_requires_date_column() {
        let table = parser::parse_str("Day,Type\n2024-03-05,Night\n").unwrap();
        assert!(matches!(
            RecordSet::from_table(&table),
            Err(StoreError::MissingColumn(DATE_COLUMN))
        ));
    }

    #[test]
    fn test_to_table_sorts_descending() {
        let records = RecordSet::new(vec![
            ShiftRecord::new(date(2024, 3, 1), "Morning", ""),
            ShiftRecord::new(date(2024, 3, 9), "Night", "x"),
            ShiftRecord::new(date(2024, 2, 28), "Vacation", ""),
        ]);
        let table = records.to_table();
        assert_eq!(table.header, vec!["Date", "Type", "Note"]);
        let dates: Vec<_> = table
            .rows
            .iter()
            .map(|row| row.cell(0).unwrap().to_string())
            .collect();
        assert_eq!(dates, vec!["2024-03-09", "2024-03-01", "2024-02-28"]);
    }

    #[test]
    fn test_remove_date_and_row() {
        let mut records = RecordSet::new(vec![
            ShiftRecord::new(date(2024, 3, 5), "Morning", ""),
            ShiftRecord::new(date(2024, 3, 5), "Evening", ""),
            ShiftRecord::new(date(2024, 3, 6), "Night", ""),
        ]);
        assert_eq!(records.remove_date(date(2024, 3, 5)), 2);
        assert_eq!(records.len(), 1);
        assert!(records.remove_row(1).is_none());
        assert_eq!(records.remove_row(0).unwrap().category.as_str(), "Night");
        assert!(records.is_empty());
    }
}
