//! Library configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! data_dir = "/var/lib/shelf"
//! loan_period_days = 14
//! default_max_loans = 3
//! ```

use crate::entities::DEFAULT_MAX_LOANS;
use crate::error::{Result, ShelfError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

pub const DEFAULT_LOAN_PERIOD_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directory holding the store files
    pub data_dir: PathBuf,

    #[validate(length(min = 1))]
    pub catalog_file: String,

    #[validate(length(min = 1))]
    pub members_file: String,

    #[validate(length(min = 1))]
    pub lending_file: String,

    #[validate(length(min = 1))]
    pub intent_file: String,

    /// Days between loan date and due date
    #[validate(range(min = 1, max = 365))]
    pub loan_period_days: u32,

    /// Loan limit for members created without one
    #[validate(range(min = 1))]
    pub default_max_loans: u32,

    /// fsync after every write
    pub sync_writes: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        LibraryConfig {
            data_dir: PathBuf::from("."),
            catalog_file: "books.dat".to_string(),
            members_file: "members.dat".to_string(),
            lending_file: "loans.dat".to_string(),
            intent_file: "pending.intent".to_string(),
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
            default_max_loans: DEFAULT_MAX_LOANS,
            sync_writes: true,
        }
    }
}

impl LibraryConfig {
    /// Default configuration rooted at `data_dir`
    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        LibraryConfig {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: LibraryConfig = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Run field validation
    pub fn check(&self) -> Result<()> {
        Validate::validate(self).map_err(|e| ShelfError::Config(e.to_string()))
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }

    pub fn members_path(&self) -> PathBuf {
        self.data_dir.join(&self.members_file)
    }

    pub fn lending_path(&self) -> PathBuf {
        self.data_dir.join(&self.lending_file)
    }

    pub fn intent_path(&self) -> PathBuf {
        self.data_dir.join(&self.intent_file)
    }
}
