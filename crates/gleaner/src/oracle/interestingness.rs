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

//! Interestingness of a set of charts.
//!
//! The deterministic oracle looks every node up in a statistics store keyed
//! by [`NodeId`]; a node the store has never seen contributes nothing. The
//! probabilistic oracle reads the significance each [`ProbabilisticNode`]
//! carries.

use crate::node::{NodeId, OracleNode, ProbabilisticNode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Pre-computed statistical signals for one chart, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticFeatures {
    pub significance: f64,
    pub effect_size: f64,
    pub trend: f64,
    pub outlier: f64,
}
impl StatisticFeatures {
    pub fn new(significance: f64, effect_size: f64, trend: f64, outlier: f64) -> Self {
        Self {
            significance,
            effect_size,
            trend,
            outlier,
        }
    }
    /// The strongest signal, clamped to `[0, 1]`.
    pub fn score(&self) -> f64 {
        let strongest = [self.significance, self.effect_size, self.trend, self.outlier]
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold(0.0, f64::max);
        strongest.clamp(0.0, 1.0)
    }
}

/// Lookup of statistical features by node identity.
pub trait StatisticStore {
    fn features(&self, id: &NodeId) -> Option<&StatisticFeatures>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureTable {
    entries: HashMap<NodeId, StatisticFeatures>,
}
impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(&mut self, id: NodeId, features: StatisticFeatures) -> Option<StatisticFeatures> {
        self.entries.insert(id, features)
    }
    pub fn with(mut self, id: NodeId, features: StatisticFeatures) -> Self {
        self.entries.insert(id, features);
        self
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
impl StatisticStore for FeatureTable {
    fn features(&self, id: &NodeId) -> Option<&StatisticFeatures> {
        self.entries.get(id)
    }
}
impl StatisticStore for HashMap<NodeId, StatisticFeatures> {
    fn features(&self, id: &NodeId) -> Option<&StatisticFeatures> {
        self.get(id)
    }
}
impl FromIterator<(NodeId, StatisticFeatures)> for FeatureTable {
    fn from_iter<I: IntoIterator<Item = (NodeId, StatisticFeatures)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

pub fn get_statistic_features_from_hashmap<N: OracleNode, S: StatisticStore + ?Sized>(
    node: &N,
    store: &S,
) -> Option<StatisticFeatures> {
    store.features(node.id()).copied()
}

pub fn get_interestingness_from_nodes<N: OracleNode, S: StatisticStore + ?Sized>(
    nodes: &[N],
    store: &S,
) -> f64 {
    if nodes.is_empty() {
        return 0.0;
    }
    let mut missing = 0usize;
    let total: f64 = nodes
        .iter()
        .map(|node| match get_statistic_features_from_hashmap(node, store) {
            Some(features) => features.score(),
            None => {
                missing += 1;
                0.0
            }
        })
        .sum();
    let interestingness = total / nodes.len() as f64;
    debug!(nodes = nodes.len(), missing, interestingness, "Interestingness");
    interestingness
}

/// Mean significance carried by the nodes themselves.
pub fn get_interestingness_v2(nodes: &[ProbabilisticNode]) -> f64 {
    if nodes.is_empty() {
        return 0.0;
    }
    let total: f64 = nodes.iter().map(ProbabilisticNode::significance).sum();
    let interestingness = total / nodes.len() as f64;
    debug!(nodes = nodes.len(), interestingness, "Probabilistic interestingness");
    interestingness
}
