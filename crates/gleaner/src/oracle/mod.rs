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

//! Multi-criteria scoring of a dashboard's charts.
//!
//! Both oracles share coverage, uniqueness and specificity and differ only
//! in where interestingness comes from: [`ColumbusOracle`] reads a
//! statistics store, [`ColumbusProbOracle`] reads the significance carried
//! by each [`ProbabilisticNode`].

pub mod coverage;
pub mod interestingness;
pub mod specificity;
pub mod uniqueness;

pub use coverage::get_coverage_from_nodes;
pub use interestingness::{
    get_interestingness_from_nodes, get_interestingness_v2, get_statistic_features_from_hashmap,
    FeatureTable, StatisticFeatures, StatisticStore,
};
pub use specificity::{get_specificity_from_nodes, includeness};
pub use uniqueness::get_uniqueness_from_nodes;

use crate::error::{ConfigError, ConfigResult, SerialisationError};
use crate::node::{OracleNode, ProbabilisticNode};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Per-metric multipliers. Not normalised; any non-negative finite value is
/// accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleWeight {
    pub coverage: f64,
    pub uniqueness: f64,
    pub specificity: f64,
    pub interestingness: f64,
}
impl Default for OracleWeight {
    fn default() -> Self {
        Self {
            coverage: 1.0,
            uniqueness: 1.0,
            specificity: 1.0,
            interestingness: 1.0,
        }
    }
}
impl OracleWeight {
    pub fn new(coverage: f64, uniqueness: f64, specificity: f64, interestingness: f64) -> Self {
        Self {
            coverage,
            uniqueness,
            specificity,
            interestingness,
        }
    }
    /// Favours dashboards that spread over the data.
    pub fn for_exploration() -> Self {
        Self::new(1.5, 1.5, 0.5, 1.0)
    }
    /// Favours dashboards that answer the user's terms with strong patterns.
    pub fn for_presentation() -> Self {
        Self::new(0.5, 1.0, 1.5, 1.5)
    }
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in self.to_map() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    field: field.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("coverage", self.coverage),
            ("uniqueness", self.uniqueness),
            ("specificity", self.specificity),
            ("interestingness", self.interestingness),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OracleResult {
    pub weight: OracleWeight,
    pub coverage: f64,
    pub uniqueness: f64,
    pub specificity: f64,
    pub interestingness: f64,
}
impl OracleResult {
    /// Weighted sum of the four metrics.
    pub fn score(&self) -> f64 {
        self.weight.coverage * self.coverage
            + self.weight.uniqueness * self.uniqueness
            + self.weight.specificity * self.specificity
            + self.weight.interestingness * self.interestingness
    }
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("score", self.score()),
            ("coverage", self.coverage),
            ("uniqueness", self.uniqueness),
            ("specificity", self.specificity),
            ("interestingness", self.interestingness),
        ])
    }
    /// The metrics and score as a flat JSON object.
    pub fn to_json(&self) -> Result<String, SerialisationError> {
        Ok(serde_json::to_string_pretty(&self.to_map())?)
    }
}
impl fmt::Display for OracleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Score: {:.4}", self.score())?;
        writeln!(f, "Coverage: {:.4}", self.coverage)?;
        writeln!(f, "Uniqueness: {:.4}", self.uniqueness)?;
        writeln!(f, "Specificity: {:.4}", self.specificity)?;
        write!(f, "Interestingness: {:.4}", self.interestingness)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumbusOracle {
    pub weight: OracleWeight,
}
impl ColumbusOracle {
    pub fn new(weight: OracleWeight) -> Self {
        Self { weight }
    }
    pub fn get_result<N: OracleNode, S: StatisticStore + ?Sized>(
        &self,
        nodes: &[N],
        df: &DataFrame,
        wildcard: &BTreeSet<String>,
        store: &S,
    ) -> OracleResult {
        let result = OracleResult {
            weight: self.weight,
            coverage: get_coverage_from_nodes(nodes, df),
            uniqueness: get_uniqueness_from_nodes(nodes),
            specificity: get_specificity_from_nodes(nodes, wildcard),
            interestingness: get_interestingness_from_nodes(nodes, store),
        };
        debug!(nodes = nodes.len(), score = result.score(), "Oracle result");
        result
    }
    pub fn get_statistic_features<N: OracleNode, S: StatisticStore + ?Sized>(
        &self,
        node: &N,
        store: &S,
    ) -> Option<StatisticFeatures> {
        get_statistic_features_from_hashmap(node, store)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumbusProbOracle {
    pub weight: OracleWeight,
}
impl ColumbusProbOracle {
    pub fn new(weight: OracleWeight) -> Self {
        Self { weight }
    }
    pub fn get_result(
        &self,
        nodes: &[ProbabilisticNode],
        df: &DataFrame,
        wildcard: &BTreeSet<String>,
    ) -> OracleResult {
        let result = OracleResult {
            weight: self.weight,
            coverage: get_coverage_from_nodes(nodes, df),
            uniqueness: get_uniqueness_from_nodes(nodes),
            specificity: get_specificity_from_nodes(nodes, wildcard),
            interestingness: get_interestingness_v2(nodes),
        };
        debug!(nodes = nodes.len(), score = result.score(), "Probabilistic oracle result");
        result
    }
}
