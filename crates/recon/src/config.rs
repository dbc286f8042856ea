use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;

use crate::error::ReconError;
use crate::model::{FieldRef, NO_DATE_SENTINEL};
use crate::normalize::{Charset, KeyPolicy, NameConvention, SeparatorPolicy};

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Where the column names live in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderRule {
    /// Record 1 is the header.
    FirstRow,
    /// Skip records until one whose first cell contains the marker text;
    /// that record is the header. Data ends at the first blank first cell
    /// or empty line.
    FirstCellContains(String),
}

/// How to read one input role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub name_column: FieldRef,
    pub date_column: FieldRef,
    pub date_format: String,
    pub status_column: Option<FieldRef>,
    pub convention: NameConvention,
    pub key_policy: KeyPolicy,
    pub header: HeaderRule,
    pub no_date_sentinel: Option<String>,
}

const SPACED_ASCII: KeyPolicy = KeyPolicy::new(SeparatorPolicy::SingleSpace, Charset::Ascii);
const STRIPPED_LATIN1: KeyPolicy = KeyPolicy::new(SeparatorPolicy::Strip, Charset::Latin1);

impl SourceConfig {
    /// Clinical scheduling export: "Last, First" names, US dates.
    pub fn schedule() -> Self {
        Self {
            name_column: FieldRef::name("PATIENT NAME"),
            date_column: FieldRef::name("APPOINTMENT DATE"),
            date_format: "%m/%d/%Y".into(),
            status_column: Some(FieldRef::name("VISIT STATUS")),
            convention: NameConvention::LastCommaFirst,
            key_policy: SPACED_ASCII,
            header: HeaderRule::FirstRow,
            no_date_sentinel: None,
        }
    }

    /// Lead export: "First Last" names, its own date column.
    pub fn lead() -> Self {
        Self {
            name_column: FieldRef::name("PATIENT NAME"),
            date_column: FieldRef::name("APPT DATE"),
            date_format: "%m/%d/%Y".into(),
            status_column: None,
            convention: NameConvention::FirstLastNoMiddle,
            key_policy: SPACED_ASCII,
            header: HeaderRule::FirstRow,
            no_date_sentinel: None,
        }
    }

    /// Prescription export: preamble rows, positional name and end date.
    pub fn prescription() -> Self {
        Self {
            name_column: FieldRef::Index(0),
            date_column: FieldRef::Index(2),
            date_format: "%Y-%m-%d".into(),
            status_column: None,
            convention: NameConvention::LastCommaFirst,
            key_policy: STRIPPED_LATIN1,
            header: HeaderRule::FirstCellContains("PATIENT NAME".into()),
            no_date_sentinel: Some(NO_DATE_SENTINEL.into()),
        }
    }

    /// Visit export joined against prescriptions. Status is carried through
    /// to the report, never filtered on.
    pub fn visit() -> Self {
        Self {
            status_column: None,
            key_policy: STRIPPED_LATIN1,
            ..Self::schedule()
        }
    }

    pub fn validate(&self, role: &str) -> Result<(), ReconError> {
        for (what, field) in [("name_column", &self.name_column), ("date_column", &self.date_column)]
            .into_iter()
            .chain(self.status_column.as_ref().map(|f| ("status_column", f)))
        {
            if matches!(field, FieldRef::Name(n) if n.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "[{role}] {what} must not be empty"
                )));
            }
        }

        if self.date_format.is_empty()
            || StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error))
        {
            return Err(ReconError::ConfigValidation(format!(
                "[{role}] invalid date_format '{}'",
                self.date_format
            )));
        }

        if let HeaderRule::FirstCellContains(marker) = &self.header {
            if marker.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "[{role}] header marker must not be empty"
                )));
            }
        }

        Ok(())
    }
}

/// Partial `[role]` table from TOML. Unset fields keep the role's preset.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourceOverride {
    name_column: Option<FieldRef>,
    date_column: Option<FieldRef>,
    date_format: Option<String>,
    /// `""` clears the preset so the column is neither required nor read.
    status_column: Option<FieldRef>,
    convention: Option<NameConvention>,
    key_policy: Option<KeyPolicy>,
    header: Option<HeaderRule>,
    no_date_sentinel: Option<String>,
}

impl SourceOverride {
    fn apply(self, base: SourceConfig) -> SourceConfig {
        SourceConfig {
            name_column: self.name_column.unwrap_or(base.name_column),
            date_column: self.date_column.unwrap_or(base.date_column),
            date_format: self.date_format.unwrap_or(base.date_format),
            status_column: match self.status_column {
                Some(FieldRef::Name(n)) if n.trim().is_empty() => None,
                Some(field) => Some(field),
                None => base.status_column,
            },
            convention: self.convention.unwrap_or(base.convention),
            key_policy: self.key_policy.unwrap_or(base.key_policy),
            header: self.header.unwrap_or(base.header),
            no_date_sentinel: self.no_date_sentinel.or(base.no_date_sentinel),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Column layout of every input role plus the output location.
///
/// Window horizons and the identity match policy are not part of the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub schedule: SourceConfig,
    pub lead: SourceConfig,
    pub prescription: SourceConfig,
    pub visit: SourceConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            schedule: SourceConfig::schedule(),
            lead: SourceConfig::lead(),
            prescription: SourceConfig::prescription(),
            visit: SourceConfig::visit(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawReportConfig {
    output_dir: Option<PathBuf>,
    #[serde(default)]
    schedule: SourceOverride,
    #[serde(default)]
    lead: SourceOverride,
    #[serde(default)]
    prescription: SourceOverride,
    #[serde(default)]
    visit: SourceOverride,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReportConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let raw: RawReportConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        let defaults = Self::default();
        let config = Self {
            output_dir: raw.output_dir.unwrap_or(defaults.output_dir),
            schedule: raw.schedule.apply(defaults.schedule),
            lead: raw.lead.apply(defaults.lead),
            prescription: raw.prescription.apply(defaults.prescription),
            visit: raw.visit.apply(defaults.visit),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ReconError> {
        let input = std::fs::read_to_string(path).map_err(|e| ReconError::io(path, e))?;
        Self::from_toml(&input)
    }

    /// The schedule as the follow-up report reads it. Cancelled visits
    /// still count as past visits there, so status is not required.
    pub fn followup_schedule(&self) -> SourceConfig {
        SourceConfig {
            status_column: None,
            ..self.schedule.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        self.schedule.validate("schedule")?;
        self.lead.validate("lead")?;
        self.prescription.validate("prescription")?;
        self.visit.validate("visit")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
