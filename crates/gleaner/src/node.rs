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

use crate::candidate::ChartCandidate;
use crate::error::{DataError, DataResult};
use polars::prelude::{DataFrame, DataType, StringChunked};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Key of a node in the statistics store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);
impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
    pub fn for_chart(chart: &ChartCandidate, filters: &[Filter]) -> Self {
        let mut id = chart.to_string();
        let mut sorted: Vec<&Filter> = filters.iter().collect();
        sorted.sort();
        for filter in sorted {
            id.push('|');
            id.push_str(&filter.to_string());
        }
        Self(id)
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keeps rows whose `column` renders as `value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub value: String,
}
impl Filter {
    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.column, self.value)
    }
}

/// What the oracle needs to know about a chart.
pub trait OracleNode {
    fn id(&self) -> &NodeId;
    fn chart(&self) -> &ChartCandidate;
    fn filters(&self) -> &[Filter];
    /// Indices of the source rows the chart draws, ascending.
    fn rows(&self) -> &[usize];
    fn bag_of_values(&self) -> &BTreeSet<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualizationNode {
    id: NodeId,
    chart: ChartCandidate,
    filters: Vec<Filter>,
    rows: Vec<usize>,
    bag_of_values: BTreeSet<String>,
}
impl VisualizationNode {
    pub fn from_candidate(chart: ChartCandidate, df: &DataFrame) -> DataResult<Self> {
        Self::with_filters(chart, Vec::new(), df)
    }
    /// A row belongs to the node when it passes every filter and has a value
    /// in every column the chart uses. The bag holds the filter literals and
    /// the distinct categories of the chart's categorical columns over those
    /// rows.
    pub fn with_filters(
        chart: ChartCandidate,
        filters: Vec<Filter>,
        df: &DataFrame,
    ) -> DataResult<Self> {
        let mut keep = vec![true; df.height()];
        for filter in &filters {
            let values = string_column(df, &filter.column)?;
            for (i, value) in (&values).into_iter().enumerate() {
                if value != Some(filter.value.as_str()) {
                    keep[i] = false;
                }
            }
        }
        let mut categorical = Vec::new();
        for attr in chart.attributes() {
            let values = string_column(df, &attr.name)?;
            for (i, value) in (&values).into_iter().enumerate() {
                if value.is_none() {
                    keep[i] = false;
                }
            }
            if attr.attr_type.is_categorical() {
                categorical.push(values);
            }
        }
        let rows: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, kept)| kept.then_some(i))
            .collect();
        let mut bag_of_values: BTreeSet<String> =
            filters.iter().map(|f| f.value.clone()).collect();
        for values in &categorical {
            bag_of_values.extend(
                rows.iter()
                    .filter_map(|&i| values.get(i))
                    .map(str::to_string),
            );
        }
        Ok(Self::from_parts(chart, filters, rows, bag_of_values))
    }
    pub fn from_parts(
        chart: ChartCandidate,
        filters: Vec<Filter>,
        mut rows: Vec<usize>,
        bag_of_values: BTreeSet<String>,
    ) -> Self {
        rows.sort_unstable();
        rows.dedup();
        Self {
            id: NodeId::for_chart(&chart, &filters),
            chart,
            filters,
            rows,
            bag_of_values,
        }
    }
}
impl OracleNode for VisualizationNode {
    fn id(&self) -> &NodeId {
        &self.id
    }
    fn chart(&self) -> &ChartCandidate {
        &self.chart
    }
    fn filters(&self) -> &[Filter] {
        &self.filters
    }
    fn rows(&self) -> &[usize] {
        &self.rows
    }
    fn bag_of_values(&self) -> &BTreeSet<String> {
        &self.bag_of_values
    }
}

/// A node carrying its own estimate that the chart shows a real pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilisticNode {
    node: VisualizationNode,
    significance: f64,
}
impl ProbabilisticNode {
    /// `significance` is clamped into `[0, 1]`; NaN counts as 0.
    pub fn new(node: VisualizationNode, significance: f64) -> Self {
        let significance = if significance.is_nan() {
            0.0
        } else {
            significance.clamp(0.0, 1.0)
        };
        Self { node, significance }
    }
    pub fn significance(&self) -> f64 {
        self.significance
    }
    pub fn node(&self) -> &VisualizationNode {
        &self.node
    }
}
impl OracleNode for ProbabilisticNode {
    fn id(&self) -> &NodeId {
        self.node.id()
    }
    fn chart(&self) -> &ChartCandidate {
        self.node.chart()
    }
    fn filters(&self) -> &[Filter] {
        self.node.filters()
    }
    fn rows(&self) -> &[usize] {
        self.node.rows()
    }
    fn bag_of_values(&self) -> &BTreeSet<String> {
        self.node.bag_of_values()
    }
}

fn string_column(df: &DataFrame, name: &str) -> DataResult<StringChunked> {
    let column = df.column(name).map_err(|_| DataError::ColumnNotFound {
        column: name.to_string(),
    })?;
    let rendered = column.as_materialized_series().cast(&DataType::String)?;
    Ok(rendered.str()?.clone())
}
