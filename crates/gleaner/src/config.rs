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

use crate::attribute::AttributeType;
use crate::error::{ConfigError, ConfigResult};
use crate::oracle::OracleWeight;
pub use crate::prior::PriorConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// How many dashboards are drawn and how hard a single chart draw is
/// retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub dashboard_size: usize,
    pub candidate_pool: usize,
    pub max_sample_attempts: usize,
}
impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            dashboard_size: 4,
            candidate_pool: 16,
            max_sample_attempts: 10,
        }
    }
}
impl SelectionConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.candidate_pool == 0 {
            return Err(ConfigError::InvalidSelectionConfig {
                field: "candidate_pool".to_string(),
            });
        }
        if self.max_sample_attempts == 0 {
            return Err(ConfigError::InvalidSelectionConfig {
                field: "max_sample_attempts".to_string(),
            });
        }
        if self.candidate_pool > 10_000 {
            return Err(ConfigError::InvalidSelectionConfig {
                field: "candidate_pool".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GleanerConfig {
    /// Grammar YAML to load instead of the built-in rules.
    pub grammar_path: Option<PathBuf>,
    pub oracle: OracleWeight,
    pub selection: SelectionConfig,
    pub prior: PriorConfig,
    pub attribute_overrides: BTreeMap<String, AttributeType>,
    pub seed: Option<u64>,
}
impl GleanerConfig {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let config = Self::load(path).map_err(|e| ConfigError::ConfigFileError {
            path: path.display().to_string(),
            reason: format!("{e:#}"),
        })?;
        config.validate()?;
        Ok(config)
    }
    fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content).context("Failed to parse config YAML")
    }
    pub fn from_yaml_str(yaml_content: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_yaml::from_str(yaml_content).map_err(|e| ConfigError::ValidationFailed {
                reason: format!("Failed to parse config YAML: {e}"),
            })?;
        config.validate()?;
        Ok(config)
    }
    pub fn validate(&self) -> ConfigResult<()> {
        self.oracle.validate()?;
        self.selection.validate()?;
        self.prior
            .validate()
            .map_err(|reason| ConfigError::InvalidPriorConfig { reason })
    }
    /// Many small, varied dashboards.
    pub fn for_exploration() -> Self {
        Self {
            oracle: OracleWeight::for_exploration(),
            selection: SelectionConfig {
                dashboard_size: 6,
                candidate_pool: 32,
                max_sample_attempts: 20,
            },
            prior: PriorConfig {
                concentration_min: 0.3,
                concentration_max: 1.0,
            },
            ..Default::default()
        }
    }
    /// Few charts, chosen from a larger pool.
    pub fn for_presentation() -> Self {
        Self {
            oracle: OracleWeight::for_presentation(),
            selection: SelectionConfig {
                dashboard_size: 3,
                candidate_pool: 64,
                max_sample_attempts: 10,
            },
            prior: PriorConfig {
                concentration_min: 1.0,
                concentration_max: 3.0,
            },
            ..Default::default()
        }
    }
    pub fn to_yaml(&self) -> crate::error::Result<String> {
        let yaml = serde_yaml::to_string(self).map_err(crate::error::SerialisationError::from)?;
        Ok(yaml)
    }
}
