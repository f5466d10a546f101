use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use chrono::{Local, NaiveDate};
use clap::Parser as _;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ast::Table;
use error::StoreError;
use medium::{CsvFile, Medium};
use processing::Period;
use record::{RecordSet, DATE_COLUMN, NOTE_COLUMN, TYPE_COLUMN};
use settings::Settings;
use store::{Entry, Loaded, Outcome, RecordStore, Target};

mod ast;
mod error;
mod medium;
mod parser;
mod processing;
mod record;
mod settings;
mod store;

#[derive(Debug, Clone, clap::Parser)]
#[command(about = "Keep a log of worked shifts and absences")]
struct Cli {
    /// TOML settings file (defaults to ./shift-log.toml when present)
    #[clap(long)]
    config: Option<PathBuf>,
    /// CSV data file, overrides `data_file` from the settings
    #[clap(long)]
    data: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::Subcommand)]
enum Command {
    /// Show records, most recent first
    List {
        #[clap(long, requires = "month")]
        year: Option<i32>,
        #[clap(long, requires = "year", value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        /// Only the latest N records
        #[clap(long, conflicts_with = "year")]
        limit: Option<usize>,
    },
    /// Add a record, keeping others on the same day
    Add {
        date: String,
        category: String,
        #[clap(long, default_value = "")]
        note: String,
    },
    /// Make this the only record of its day
    Set {
        date: String,
        category: String,
        #[clap(long, default_value = "")]
        note: String,
    },
    /// Delete all records of a day, or one row as numbered by `list`
    Delete {
        #[clap(required_unless_present = "row")]
        date: Option<String>,
        #[clap(long, conflicts_with = "date")]
        row: Option<usize>,
    },
    /// Count records per category for one month
    Summary {
        #[clap(long, requires = "month")]
        year: Option<i32>,
        #[clap(long, requires = "year", value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        /// Pretend today is this date when picking the default month
        #[clap(long)]
        today: Option<NaiveDate>,
    },
    /// Replace every record with the contents of an edited CSV file
    ReplaceAll { path: PathBuf },
    /// Show the configured categories
    Categories,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            println!("🛑 {err}");
            return ExitCode::FAILURE;
        }
    };

    let data_file = cli.data.unwrap_or(settings.data_file);
    let mut store = RecordStore::new(CsvFile::new(data_file), settings.categories);

    match cli.command {
        Command::List { year, month, limit } => {
            match (year.zip(month), limit) {
                (Some((year, month)), _) => {
                    print_records(&store.list_for_period(Period::new(year, month)), false)
                }
                (None, Some(limit)) => print_records(&store.list_recent(limit), false),
                (None, None) => print_records(&store.list_all(), true),
            }
            ExitCode::SUCCESS
        }
        Command::Add {
            date,
            category,
            note,
        } => report(&store.append(&Entry::new(date, category, note))),
        Command::Set {
            date,
            category,
            note,
        } => report(&store.replace_for_date(&Entry::new(date, category, note))),
        Command::Delete { date, row } => {
            let target = match (date, row) {
                (_, Some(row)) => {
                    let loaded = store.list_all();
                    if let Some(notice) = &loaded.notice {
                        println!("🛑 {notice}");
                        return ExitCode::FAILURE;
                    }
                    Target::Row(row)
                }
                (Some(date), None) => Target::Date(date),
                (None, None) => {
                    println!("🛑 give a date or --row");
                    return ExitCode::FAILURE;
                }
            };
            report(&store.delete(&target))
        }
        Command::Summary { year, month, today } => {
            let period = match year.zip(month) {
                Some((year, month)) => Period::new(year, month),
                None => Period::containing(today.unwrap_or_else(|| Local::now().date_naive())),
            };
            print_summary(&store, period);
            ExitCode::SUCCESS
        }
        Command::ReplaceAll { path } => {
            let entries = match read_entries(&path) {
                Ok(entries) => entries,
                Err(err) => {
                    println!("🛑 {err}");
                    return ExitCode::FAILURE;
                }
            };
            report(&replace_with_listed(&mut store, &entries))
        }
        Command::Categories => {
            let categories = store.categories();
            println!("work:    {}", categories.work.join(", "));
            println!("absence: {}", categories.absence.join(", "));
            ExitCode::SUCCESS
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_records(loaded: &Loaded<RecordSet>, numbered: bool) {
    if let Some(notice) = &loaded.notice {
        println!("⚠️ {notice}");
    }
    if loaded.data.is_empty() {
        println!("no records");
        return;
    }

    for (row, record) in loaded.data.iter().enumerate() {
        let date = record.date.format("%a %d/%m/%Y");
        let prefix = if numbered {
            format!("{row:>4}  ")
        } else {
            String::new()
        };
        println!("{prefix}{date}  {:<12}{}", record.category.as_str(), record.note);
    }
}

fn print_summary(store: &RecordStore<CsvFile>, period: Period) {
    let loaded = store.summarize(period);
    if let Some(notice) = &loaded.notice {
        println!("⚠️ {notice}");
    }

    let summary = loaded.data;
    println!("{:02}/{}", period.month, period.year);
    for category in store.categories().all() {
        let count = summary.count(category);
        if count > 0 {
            println!("  {category:<12}{count}");
        }
    }
    if summary.unrecognized > 0 {
        println!("  {:<12}{}", "(other)", summary.unrecognized);
    }
    println!("  {:<12}{}", "worked", summary.worked);
    println!("  {:<12}{}", "absent", summary.absent);
    println!("  {:<12}{}", "total days", summary.credited_days);
    println!("  {:<12}{}", "records", summary.total);
}

/// Takes the snapshot an edited export is compared against, then replaces.
/// A medium that cannot be read is reported as such.
fn replace_with_listed<M: Medium>(store: &mut RecordStore<M>, entries: &[Entry]) -> Outcome {
    match store.list_all().notice {
        Some(notice) => Outcome::Failed(notice),
        None => store.bulk_replace(entries),
    }
}

fn report(outcome: &Outcome) -> ExitCode {
    match outcome.message() {
        Some(msg) => println!("🛑 {msg}"),
        None if *outcome == Outcome::Unchanged => println!("✅ nothing to change"),
        None => println!("✅ saved"),
    }

    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Rows of an edited export, taken as typed: no date leniency here.
fn read_entries(path: &Path) -> Result<Vec<Entry>, StoreError> {
    let source = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    entries_from_table(&parser::parse_str(&source)?)
}

fn entries_from_table(table: &Table) -> Result<Vec<Entry>, StoreError> {
    if table.is_empty() {
        return Ok(Vec::new());
    }

    let date_col = table
        .column(DATE_COLUMN)
        .ok_or(StoreError::MissingColumn(DATE_COLUMN))?;
    let type_col = table.column(TYPE_COLUMN);
    let note_col = table.column(NOTE_COLUMN);

    Ok(table
        .rows
        .iter()
        .map(|row| {
            let cell = |col: Option<usize>| col.and_then(|i| row.cell(i)).unwrap_or_default();
            Entry::new(cell(Some(date_col)), cell(type_col), cell(note_col))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli =
            Cli::try_parse_from(["shift-log", "add", "2024-03-05", "Morning", "--note", "x"])
                .unwrap();
        assert!(matches!(cli.command, Command::Add { ref note, .. } if note == "x"));

        let cli = Cli::try_parse_from(["shift-log", "delete", "--row", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Delete {
                date: None,
                row: Some(3)
            }
        ));

        assert!(Cli::try_parse_from(["shift-log", "delete"]).is_err());
        assert!(Cli::try_parse_from(["shift-log", "list", "--year", "2024"]).is_err());
        assert!(
            Cli::try_parse_from(["shift-log", "summary", "--year", "2024", "--month", "13"])
                .is_err()
        );
    }

    #[test]
    fn test_replace_with_listed_reports_unreadable_medium() {
        let medium = medium::MemoryMedium::with_table(
            parser::parse_str("Date,Type,Note\n2024-03-05,Morning,\n").unwrap(),
        );
        medium.set_fail_reads(true);
        let mut store = RecordStore::new(&medium, settings::Categories::default());

        let outcome = replace_with_listed(&mut store, &[Entry::new("2024-03-06", "Night", "")]);
        assert!(matches!(outcome, Outcome::Failed(ref msg) if msg.starts_with("could not read")));
        assert_eq!(medium.writes(), 0);
    }

    #[test]
    fn test_replace_with_listed_skips_unchanged() {
        let medium = medium::MemoryMedium::with_table(
            parser::parse_str("Date,Type,Note\n2024-03-05,Morning,\n").unwrap(),
        );
        let mut store = RecordStore::new(&medium, settings::Categories::default());

        let outcome = replace_with_listed(&mut store, &[Entry::new("2024-03-05", "Morning", "")]);
        assert_eq!(outcome, Outcome::Unchanged);
        assert_eq!(medium.writes(), 0);
    }

    #[test]
    fn test_entries_from_table() {
        let table = parser::parse_str("Date,Note\n2024-03-05,hello\nbad,\n").unwrap();
        let entries = entries_from_table(&table).unwrap();
        assert_eq!(
            entries,
            vec![
                Entry::new("2024-03-05", "", "hello"),
                Entry::new("bad", "", ""),
            ]
        );
    }
}
