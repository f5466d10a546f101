//! The record store: every operation reads the whole medium, changes an
//! in-memory copy and writes the whole copy back.
//!
//! Failures never leave this module as errors. Reads degrade to the last
//! known (or an empty) record set plus a notice, writes report an
//! [`Outcome`].

use tracing::{debug, info, warn};

use crate::{
    error::StoreError,
    medium::Medium,
    processing::{self, Period, Summary},
    record::{self, Category, RecordSet, ShiftRecord},
    settings::Categories,
};

/// Raw user input for one record, validated before anything is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub date: String,
    pub category: String,
    pub note: String,
}

impl Entry {
    pub fn new(
        date: impl Into<String>,
        category: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            category: category.into(),
            note: note.into(),
        }
    }

    /// Checks the date strictly and the category against the enumeration.
    /// A category outside the enumeration passes only when the exact same
    /// record is already part of `known`.
    fn validate(
        &self,
        categories: &Categories,
        known: Option<&RecordSet>,
    ) -> Result<ShiftRecord, StoreError> {
        let date = record::parse_input_date(&self.date)?;
        let parsed = ShiftRecord::new(
            date,
            Category::new(self.category.as_str()),
            self.note.as_str(),
        );

        let tolerated = known.is_some_and(|set| set.iter().any(|r| *r == parsed));
        if categories.selectable(parsed.category.as_str()).is_none() && !tolerated {
            return Err(StoreError::UnknownCategory(self.category.clone()));
        }

        Ok(parsed)
    }
}

impl From<&ShiftRecord> for Entry {
    fn from(record: &ShiftRecord) -> Self {
        Self::new(
            record.date.format(record::DATE_FORMAT).to_string(),
            record.category.as_str(),
            record.note.as_str(),
        )
    }
}

/// What a delete addresses: every record on a date, or one row of the
/// record set returned by the last [`RecordStore::list_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Date(String),
    Row(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded<T> {
    pub data: T,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Saved,
    /// Nothing differed from what was loaded, so nothing was written.
    Unchanged,
    /// The input was invalid; the medium was not touched.
    Rejected(String),
    /// The medium could not be read or written. The caller keeps its copy.
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Saved | Self::Unchanged)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Rejected(msg) | Self::Failed(msg) => Some(msg),
            Self::Saved | Self::Unchanged => None,
        }
    }
}

pub struct RecordStore<M> {
    medium: M,
    categories: Categories,
    /// Record set handed out by the last `list_all`. Row targets and
    /// change detection in `bulk_replace` refer to it.
    snapshot: Option<RecordSet>,
}

impl<M: Medium> RecordStore<M> {
    pub fn new(medium: M, categories: Categories) -> Self {
        Self {
            medium,
            categories,
            snapshot: None,
        }
    }

    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    pub fn list_all(&mut self) -> Loaded<RecordSet> {
        let loaded = self.read("list_all", |records| records);
        if loaded.notice.is_none() {
            self.snapshot = Some(loaded.data.clone());
        }
        loaded
    }

    pub fn list_for_period(&self, period: Period) -> Loaded<RecordSet> {
        self.read("list_for_period", |records| {
            processing::in_period(&records, period)
        })
    }

    /// The `limit` most recent records.
    pub fn list_recent(&self, limit: usize) -> Loaded<RecordSet> {
        self.read("list_recent", |records| {
            records.into_iter().take(limit).collect()
        })
    }

    pub fn summarize(&self, period: Period) -> Loaded<Summary> {
        self.read("summarize", |records| {
            processing::summarize(&records, &self.categories, period)
        })
    }

    /// Adds a record. Records already on the same date are kept.
    pub fn append(&mut self, entry: &Entry) -> Outcome {
        let result = entry
            .validate(&self.categories, None)
            .and_then(|record| {
                let mut records = self.load()?;
                records.push(record);
                self.save(records)
            });
        self.finish("append", result)
    }

    /// Removes every record on the entry's date and adds the entry, so the
    /// date ends up with exactly one record.
    pub fn replace_for_date(&mut self, entry: &Entry) -> Outcome {
        let result = entry
            .validate(&self.categories, None)
            .and_then(|record| {
                let mut records = self.load()?;
                let removed = records.remove_date(record.date);
                debug!(date = %record.date, removed, "replacing records for date");
                records.push(record);
                self.save(records)
            });
        self.finish("replace_for_date", result)
    }

    pub fn delete(&mut self, target: &Target) -> Outcome {
        let result = match target {
            Target::Date(date) => self.delete_date(date),
            Target::Row(row) => self.delete_row(*row),
        };
        self.finish("delete", result)
    }

    /// Replaces everything with `entries`, unless they equal the snapshot
    /// of the last `list_all` (or, without one, the current contents).
    pub fn bulk_replace(&mut self, entries: &[Entry]) -> Outcome {
        let result = self.replace_all(entries);
        self.finish("bulk_replace", result)
    }

    fn delete_date(&mut self, date: &str) -> Result<Outcome, StoreError> {
        let date = record::parse_input_date(date)?;
        let mut records = self.load()?;
        if records.remove_date(date) == 0 {
            debug!(%date, "no records on date, nothing to delete");
            return Ok(Outcome::Unchanged);
        }
        self.save(records)
    }

    fn delete_row(&mut self, row: usize) -> Result<Outcome, StoreError> {
        let mut records = self.snapshot.clone().ok_or(StoreError::NoSnapshot)?;
        let len = records.len();
        records
            .remove_row(row)
            .ok_or(StoreError::RowOutOfRange { row, len })?;
        self.save(records)
    }

    fn replace_all(&mut self, entries: &[Entry]) -> Result<Outcome, StoreError> {
        let baseline = match &self.snapshot {
            Some(snapshot) => snapshot.clone(),
            None => self.load()?,
        };

        let submitted = entries
            .iter()
            .map(|entry| entry.validate(&self.categories, Some(&baseline)))
            .collect::<Result<RecordSet, _>>()?;

        if submitted == baseline {
            debug!(rows = submitted.len(), "bulk replace matches loaded records");
            return Ok(Outcome::Unchanged);
        }

        self.save(submitted)
    }

    fn read<T>(&self, op: &str, view: impl FnOnce(RecordSet) -> T) -> Loaded<T> {
        match self.load() {
            Ok(records) => Loaded {
                data: view(records),
                notice: None,
            },
            Err(err) => {
                warn!(op, medium = %self.medium.describe(), %err, "load failed");
                let fallback = self.snapshot.clone().unwrap_or_default();
                Loaded {
                    data: view(fallback),
                    notice: Some(format!("could not read {}: {err}", self.medium.describe())),
                }
            }
        }
    }

    fn load(&self) -> Result<RecordSet, StoreError> {
        let Some(table) = self.medium.read()? else {
            return Ok(RecordSet::default());
        };

        let (records, dropped) = RecordSet::from_table(&table)?;
        if dropped > 0 {
            info!(dropped, "skipped rows with unreadable dates");
        }
        debug!(rows = records.len(), "loaded records");

        Ok(records.sorted())
    }

    fn save(&mut self, records: RecordSet) -> Result<Outcome, StoreError> {
        let table = records.to_table();
        self.medium.write(&table)?;
        self.snapshot = None;
        info!(rows = table.rows.len(), medium = %self.medium.describe(), "saved records");
        Ok(Outcome::Saved)
    }

    fn finish(&self, op: &str, result: Result<Outcome, StoreError>) -> Outcome {
        match result {
            Ok(outcome) => outcome,
            Err(err) if err.is_validation() => {
                info!(op, %err, "rejected");
                Outcome::Rejected(err.to_string())
            }
            Err(err) => {
                warn!(op, medium = %self.medium.describe(), %err, "write failed");
                Outcome::Failed(err.to_string())
            }
        }
    }
}
