use std::path::{Path, PathBuf};

use crate::error::StoreError;

pub const DEFAULT_CONFIG_FILE: &str = "shift-log.toml";

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Settings {
    pub data_file: PathBuf,
    pub categories: Categories,
}

/// The configured category enumeration. Values outside of it can still be
/// loaded and displayed, but are never offered as a selection.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Categories {
    pub work: Vec<String>,
    pub absence: Vec<String>,
    /// Absences that still count as a day in the monthly total.
    pub credited: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Work,
    Absence,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("shifts.csv"),
            categories: Categories::default(),
        }
    }
}

impl Default for Categories {
    fn default() -> Self {
        let owned = |names: &[&str]| -> Vec<String> {
            names.iter().map(|s| s.to_string()).collect()
        };
        Self {
            work: owned(&["Morning", "Afternoon", "Evening", "Night"]),
            absence: owned(&["Vacation", "Sickness", "Ima", "Permission"]),
            credited: owned(&["Vacation", "Sickness", "Ima"]),
        }
    }
}

impl Settings {
    pub fn from_toml(source: &str) -> Result<Self, StoreError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads `path` if given, otherwise [`DEFAULT_CONFIG_FILE`] when it exists,
    /// otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, StoreError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let source = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(&source)
    }
}

impl Categories {
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.work.iter().chain(self.absence.iter()).map(String::as_str)
    }

    pub fn family(&self, value: &str) -> Option<Family> {
        if self.work.iter().any(|c| c == value) {
            Some(Family::Work)
        } else if self.absence.iter().any(|c| c == value) {
            Some(Family::Absence)
        } else {
            None
        }
    }

    /// The configured entry for `value`, or `None` ("unset") when the value
    /// is not part of the enumeration.
    pub fn selectable(&self, value: &str) -> Option<&str> {
        self.all().find(|c| *c == value)
    }

    pub fn is_credited(&self, value: &str) -> bool {
        self.credited.iter().any(|c| c == value)
    }
}
