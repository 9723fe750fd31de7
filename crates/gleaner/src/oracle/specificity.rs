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
use std::collections::BTreeSet;
use tracing::debug;

/// Fraction of the wildcard found in `bag`. Callers guard the empty
/// wildcard.
pub fn includeness(bag: &BTreeSet<String>, wildcard: &BTreeSet<String>) -> f64 {
    bag.intersection(wildcard).count() as f64 / wildcard.len() as f64
}

/// Mean includeness over the nodes. Both an empty wildcard and an empty
/// node list give 0.
pub fn get_specificity_from_nodes<N: OracleNode>(
    nodes: &[N],
    wildcard: &BTreeSet<String>,
) -> f64 {
    if wildcard.is_empty() || nodes.is_empty() {
        return 0.0;
    }
    let total: f64 = nodes
        .iter()
        .map(|node| includeness(node.bag_of_values(), wildcard))
        .sum();
    let specificity = total / nodes.len() as f64;
    debug!(nodes = nodes.len(), wildcard = wildcard.len(), specificity, "Specificity");
    specificity
}
