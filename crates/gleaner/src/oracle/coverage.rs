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
use polars::prelude::DataFrame;
use std::collections::BTreeSet;
use tracing::debug;

/// Share of the dataset's rows drawn by at least one node.
pub fn get_coverage_from_nodes<N: OracleNode>(nodes: &[N], df: &DataFrame) -> f64 {
    let height = df.height();
    if nodes.is_empty() || height == 0 {
        return 0.0;
    }
    let covered: BTreeSet<usize> = nodes
        .iter()
        .flat_map(|node| node.rows().iter().copied())
        .filter(|row| *row < height)
        .collect();
    let coverage = covered.len() as f64 / height as f64;
    debug!(nodes = nodes.len(), covered = covered.len(), height, coverage, "Coverage");
    coverage
}
