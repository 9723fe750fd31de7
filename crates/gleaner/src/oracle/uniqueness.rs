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

use crate::node::OracleNode;
use itertools::Itertools;
use std::collections::BTreeSet;
use tracing::debug;

/// Describes a node by its chart type, aggregation, used columns and
/// filters. Two nodes showing the same columns the same way share every
/// feature.
pub fn node_features<N: OracleNode>(node: &N) -> BTreeSet<String> {
    let chart = node.chart();
    let mut features = BTreeSet::new();
    features.insert(format!("chart:{}", chart.chart_type));
    features.insert(format!("agg:{}", chart.agg_type));
    features.extend(chart.attributes().map(|attr| format!("attr:{}", attr.name)));
    features.extend(node.filters().iter().map(|filter| format!("filter:{filter}")));
    features
}

pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// One minus the mean pairwise Jaccard similarity of node features. A lone
/// node is fully unique; an empty list scores 0.
pub fn get_uniqueness_from_nodes<N: OracleNode>(nodes: &[N]) -> f64 {
    match nodes.len() {
        0 => return 0.0,
        1 => return 1.0,
        _ => {}
    }
    let features: Vec<BTreeSet<String>> = nodes.iter().map(node_features).collect();
    let (total, pairs) = features
        .iter()
        .tuple_combinations()
        .fold((0.0, 0usize), |(total, pairs), (a, b)| {
            (total + jaccard(a, b), pairs + 1)
        });
    let uniqueness = (1.0 - total / pairs as f64).clamp(0.0, 1.0);
    debug!(nodes = nodes.len(), pairs, uniqueness, "Uniqueness");
    uniqueness
}
