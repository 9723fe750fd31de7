// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::candidate::Slot;
use thiserror::Error;
#[derive(Error, Debug)]
pub enum GleanerError {
    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] SerialisationError),
}
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("Failed to parse grammar YAML: {source}")]
    YamlParseError {
        #[from]
        source: serde_yaml::Error,
    },
    #[error("Failed to read grammar file '{path}': {source}")]
    GrammarFileError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Unknown token '{token}' at position {position} of rule {rule}")]
    UnknownToken {
        rule: usize,
        position: usize,
        token: String,
    },
    #[error("Rule {rule} has {length} slots, at most 5 are allowed")]
    RuleTooLong { rule: usize, length: usize },
    #[error("Rule {rule} is empty")]
    EmptyRule { rule: usize },
    #[error("Chart type '{chart_type}' has no grammar rule")]
    UncoveredChartType { chart_type: String },
    #[error("Rule {rule} duplicates an earlier rule")]
    DuplicateRule { rule: usize },
    #[error("Grammar contains no rules")]
    EmptyGrammar,
}
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("No legal value for slot '{slot}' given the choices made so far")]
    InfeasibleSample { slot: Slot },
    #[error("Dashboard size must be non-negative, got {requested}")]
    InvalidCount { requested: i64 },
    #[error("Prior for slot '{slot}' has {found} weights, domain has {expected}")]
    PriorMisaligned {
        slot: Slot,
        expected: usize,
        found: usize,
    },
    #[error("Invalid prior concentration for slot '{slot}': {reason}")]
    InvalidPrior { slot: Slot, reason: String },
    #[error("Gave up after {attempts} infeasible samples")]
    RetriesExhausted { attempts: usize },
}
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
    #[error("Failed to read data file '{path}': {source}")]
    DataFileError {
        path: String,
        #[source]
        source: polars::error::PolarsError,
    },
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },
    #[error("Empty dataset provided")]
    EmptyDataset,
}
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid oracle weight: {field} = {value}")]
    InvalidWeight { field: String, value: f64 },
    #[error("Invalid selection configuration: {field} is out of range")]
    InvalidSelectionConfig { field: String },
    #[error("Invalid prior configuration: {reason}")]
    InvalidPriorConfig { reason: String },
    #[error("Failed to read configuration file '{path}': {reason}")]
    ConfigFileError { path: String, reason: String },
    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },
}
#[derive(Error, Debug)]
pub enum SerialisationError {
    #[error("JSON serialisation failed: {source}")]
    JsonSerialisationError {
        #[from]
        source: serde_json::Error,
    },
    #[error("YAML serialization failed: {source}")]
    YamlSerialisationError {
        #[from]
        source: serde_yaml::Error,
    },
}
pub type Result<T> = std::result::Result<T, GleanerError>;
pub type GrammarResult<T> = std::result::Result<T, GrammarError>;
pub type GenerationResult<T> = std::result::Result<T, GenerationError>;
pub type DataResult<T> = std::result::Result<T, DataError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
impl From<anyhow::Error> for GleanerError {
    fn from(err: anyhow::Error) -> Self {
        GleanerError::Config(ConfigError::ValidationFailed {
            reason: format!("{err:#}"),
        })
    }
}
impl From<serde_json::Error> for GleanerError {
    fn from(err: serde_json::Error) -> Self {
        GleanerError::Serialisation(SerialisationError::JsonSerialisationError { source: err })
    }
}
impl From<polars::error::PolarsError> for GleanerError {
    fn from(err: polars::error::PolarsError) -> Self {
        GleanerError::Data(DataError::Polars(err))
    }
}
impl GleanerError {
    /// A fresh stochastic draw may succeed where this one failed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GleanerError::Generation(GenerationError::InfeasibleSample { .. })
        )
    }
    pub fn category(&self) -> &'static str {
        match self {
            GleanerError::Grammar(_) => "Grammar",
            GleanerError::Generation(_) => "Generation",
            GleanerError::Data(_) => "Data",
            GleanerError::Io(_) => "I/O",
            GleanerError::Config(_) => "Configuration",
            GleanerError::Serialisation(_) => "Serialisation",
        }
    }
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            GleanerError::Generation(GenerationError::InfeasibleSample { .. }) => vec![
                "Retry the draw, a different chart type may fit the dataset".to_string(),
                "Check that the dataset has the attribute types the grammar needs".to_string(),
            ],
            GleanerError::Generation(GenerationError::RetriesExhausted { .. }) => vec![
                "Increase max_sample_attempts in the selection configuration".to_string(),
                "Add grammar rules matching the dataset's attribute types".to_string(),
            ],
            GleanerError::Grammar(GrammarError::UncoveredChartType { .. }) => vec![
                "Draws of this chart type will fail at the x slot".to_string(),
                "Add a rule for it or give it zero prior weight".to_string(),
            ],
            GleanerError::Grammar(GrammarError::UnknownToken { .. }) => vec![
                "Chart types, attribute types, aggregations, none and * are accepted".to_string(),
            ],
            GleanerError::Data(DataError::ColumnNotFound { .. }) => vec![
                "Check the column name spelling".to_string(),
                "List the dataset attributes to see valid options".to_string(),
            ],
            _ => vec!["Check the error message for specific guidance".to_string()],
        }
    }
    pub fn user_message(&self) -> String {
        match self {
            GleanerError::Generation(GenerationError::InfeasibleSample { slot }) => format!(
                "Could not find a legal value for the {slot} slot. Try sampling again."
            ),
            GleanerError::Data(DataError::EmptyDataset) => {
                "The dataset appears to be empty. Please provide data with at least one column."
                    .to_string()
            }
            GleanerError::Grammar(GrammarError::GrammarFileError { .. }) => {
                "Unable to load the chart grammar. Please check the grammar file.".to_string()
            }
            _ => self.to_string(),
        }
    }
    /// Where in the grammar or the draw the error arose, when known.
    pub fn context(&self) -> Option<String> {
        match self {
            GleanerError::Generation(err) => match err {
                GenerationError::InfeasibleSample { slot }
                | GenerationError::PriorMisaligned { slot, .. }
                | GenerationError::InvalidPrior { slot, .. } => Some(format!("slot {slot}")),
                GenerationError::RetriesExhausted { attempts } => {
                    Some(format!("after {attempts} attempts"))
                }
                GenerationError::InvalidCount { requested } => {
                    Some(format!("requested {requested} charts"))
                }
            },
            GleanerError::Grammar(err) => match err {
                GrammarError::UnknownToken { rule, position, .. } => {
                    let slot = Slot::from_position(*position)
                        .map_or_else(|| format!("position {position}"), |s| format!("slot {s}"));
                    Some(format!("rule {rule}, {slot}"))
                }
                GrammarError::RuleTooLong { rule, .. }
                | GrammarError::EmptyRule { rule }
                | GrammarError::DuplicateRule { rule } => Some(format!("rule {rule}")),
                GrammarError::UncoveredChartType { chart_type } => {
                    Some(format!("chart type {chart_type}"))
                }
                GrammarError::GrammarFileError { path, .. } => Some(format!("file {path}")),
                _ => None,
            },
            GleanerError::Data(DataError::ColumnNotFound { column }) => {
                Some(format!("column {column}"))
            }
            GleanerError::Data(DataError::DataFileError { path, .. })
            | GleanerError::Config(ConfigError::ConfigFileError { path, .. }) => {
                Some(format!("file {path}"))
            }
            _ => None,
        }
    }
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GleanerError::Generation(GenerationError::InfeasibleSample { .. }) => {
                ErrorSeverity::Warning
            }
            GleanerError::Grammar(GrammarError::EmptyGrammar) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}
impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }
    pub fn color_code(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "\x1b[36m",
            ErrorSeverity::Warning => "\x1b[33m",
            ErrorSeverity::Error => "\x1b[31m",
            ErrorSeverity::Critical => "\x1b[35m",
        }
    }
}
pub struct ErrorReporter {
    pub show_suggestions: bool,
    pub show_timestamp: bool,
    pub colored_output: bool,
}
impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            show_suggestions: true,
            show_timestamp: false,
            colored_output: true,
        }
    }
    pub fn plain() -> Self {
        Self {
            show_suggestions: true,
            show_timestamp: false,
            colored_output: false,
        }
    }
    pub fn report(&self, error: &GleanerError) -> String {
        let severity = error.severity();
        let mut output = String::new();
        if self.colored_output {
            output.push_str(severity.color_code());
        }
        output.push_str(&format!(
            "[{}] {}: {}\n",
            severity.as_str(),
            error.category(),
            error
        ));
        if self.colored_output {
            output.push_str("\x1b[0m");
        }
        if let Some(context) = error.context() {
            output.push_str(&format!("At: {context}\n"));
        }
        if self.show_timestamp {
            output.push_str(&format!("Time: {}\n", chrono::Utc::now().to_rfc3339()));
        }
        if self.show_suggestions {
            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                output.push_str("\nSuggestions:\n");
                for suggestion in suggestions {
                    output.push_str(&format!("  • {suggestion}\n"));
                }
            }
        }
        output
    }
}
impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
