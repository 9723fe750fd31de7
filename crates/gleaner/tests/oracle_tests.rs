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

use gleaner::oracle::{
    get_coverage_from_nodes, get_interestingness_from_nodes, get_interestingness_v2,
    get_specificity_from_nodes, get_uniqueness_from_nodes, includeness,
};
use gleaner::{
    AggType, Attribute, ChartCandidate, ChartType, ColumbusOracle, ColumbusProbOracle,
    ConfigError, FeatureTable, Filter, NodeId, OracleNode, OracleResult, OracleWeight,
    ProbabilisticNode, SlotValue, StatisticFeatures, VisualizationNode,
};
use polars::prelude::*;
use std::collections::BTreeSet;

fn sales_frame() -> PolarsResult<DataFrame> {
    df!(
        "region" => ["north", "south", "east", "west", "north", "south"],
        "product" => ["a", "b", "a", "c", "b", "a"],
        "sales" => [10.0, 20.5, 7.25, 3.0, 12.0, 9.5],
        "units" => [1i64, 4, 2, 8, 3, 5],
    )
}

fn bar_by_region() -> ChartCandidate {
    ChartCandidate::new(
        ChartType::Bar,
        Attribute::categorical("region"),
        Attribute::quantitative("sales"),
        SlotValue::None,
        AggType::Sum,
    )
}

fn units_histogram() -> ChartCandidate {
    ChartCandidate::new(
        ChartType::Histogram,
        Attribute::quantitative("units"),
        SlotValue::None,
        SlotValue::None,
        AggType::Count,
    )
}

fn words(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn node_with_bag(bag: &[&str]) -> VisualizationNode {
    VisualizationNode::from_parts(bar_by_region(), Vec::new(), vec![0], words(bag))
}

#[test]
fn test_specificity_counts_wildcard_terms_found() {
    let nodes = vec![node_with_bag(&["north", "east"])];
    let wildcard = words(&["north", "south"]);
    assert_eq!(get_specificity_from_nodes(&nodes, &wildcard), 0.5);
    assert_eq!(includeness(&words(&["north", "east"]), &wildcard), 0.5);
}

#[test]
fn test_specificity_is_zero_without_wildcard() {
    let empty: Vec<VisualizationNode> = Vec::new();
    let wildcard = BTreeSet::new();
    assert_eq!(get_specificity_from_nodes(&empty, &wildcard), 0.0);
    let nodes = vec![node_with_bag(&["north"])];
    assert_eq!(get_specificity_from_nodes(&nodes, &wildcard), 0.0);
    assert_eq!(get_specificity_from_nodes(&empty, &words(&["north"])), 0.0);
}

#[test]
fn test_specificity_averages_over_nodes() {
    let nodes = vec![
        node_with_bag(&["north", "south"]),
        node_with_bag(&["west"]),
        node_with_bag(&["south"]),
    ];
    let specificity = get_specificity_from_nodes(&nodes, &words(&["north", "south"]));
    assert!((specificity - 0.5).abs() < 1e-12);
}

#[test]
fn test_empty_node_list_scores_zero() -> anyhow::Result<()> {
    let df = sales_frame()?;
    let nodes: Vec<VisualizationNode> = Vec::new();
    assert_eq!(get_coverage_from_nodes(&nodes, &df), 0.0);
    assert_eq!(get_uniqueness_from_nodes(&nodes), 0.0);
    assert_eq!(get_interestingness_from_nodes(&nodes, &FeatureTable::new()), 0.0);
    assert_eq!(get_interestingness_v2(&[]), 0.0);

    let result = ColumbusOracle::default().get_result(&nodes, &df, &BTreeSet::new(), &FeatureTable::new());
    assert_eq!(result.score(), 0.0);
    Ok(())
}

#[test]
fn test_node_rows_follow_filters_and_nulls() -> anyhow::Result<()> {
    let df = df!(
        "region" => ["north", "south", "north", "east"],
        "sales" => [Some(1.0), Some(2.0), None, Some(4.0)],
    )?;
    let node = VisualizationNode::with_filters(
        bar_by_region(),
        vec![Filter::equals("region", "north")],
        &df,
    )?;
    assert_eq!(node.rows(), &[0]);
    assert_eq!(node.bag_of_values(), &words(&["north"]));

    let unfiltered = VisualizationNode::from_candidate(bar_by_region(), &df)?;
    assert_eq!(unfiltered.rows(), &[0, 1, 3]);
    assert_eq!(unfiltered.bag_of_values(), &words(&["north", "south", "east"]));
    Ok(())
}

#[test]
fn test_node_for_missing_column_fails() -> anyhow::Result<()> {
    let df = df!("sales" => [1.0, 2.0])?;
    assert!(VisualizationNode::from_candidate(bar_by_region(), &df).is_err());
    Ok(())
}

#[test]
fn test_node_id_ignores_filter_order() {
    let a = NodeId::for_chart(
        &bar_by_region(),
        &[Filter::equals("region", "north"), Filter::equals("product", "a")],
    );
    let b = NodeId::for_chart(
        &bar_by_region(),
        &[Filter::equals("product", "a"), Filter::equals("region", "north")],
    );
    assert_eq!(a, b);
    assert_eq!(a.as_str(), "bar(region, sales, -)/sum|product=a|region=north");
}

#[test]
fn test_coverage_is_share_of_rows_drawn() -> anyhow::Result<()> {
    let df = sales_frame()?;
    let north = VisualizationNode::with_filters(
        bar_by_region(),
        vec![Filter::equals("region", "north")],
        &df,
    )?;
    let coverage = get_coverage_from_nodes(std::slice::from_ref(&north), &df);
    assert!((coverage - 2.0 / 6.0).abs() < 1e-12);

    let all = VisualizationNode::from_candidate(units_histogram(), &df)?;
    assert_eq!(get_coverage_from_nodes(&[north, all], &df), 1.0);
    Ok(())
}

#[test]
fn test_uniqueness_penalises_duplicates() -> anyhow::Result<()> {
    let df = sales_frame()?;
    let bar = VisualizationNode::from_candidate(bar_by_region(), &df)?;
    let histogram = VisualizationNode::from_candidate(units_histogram(), &df)?;

    assert_eq!(get_uniqueness_from_nodes(std::slice::from_ref(&bar)), 1.0);
    assert_eq!(get_uniqueness_from_nodes(&[bar.clone(), bar.clone()]), 0.0);
    assert_eq!(get_uniqueness_from_nodes(&[bar.clone(), histogram.clone()]), 1.0);

    let mixed = get_uniqueness_from_nodes(&[bar.clone(), bar, histogram]);
    assert!(mixed > 0.0 && mixed < 1.0);
    Ok(())
}

#[test]
fn test_interestingness_reads_the_store() -> anyhow::Result<()> {
    let df = sales_frame()?;
    let bar = VisualizationNode::from_candidate(bar_by_region(), &df)?;
    let histogram = VisualizationNode::from_candidate(units_histogram(), &df)?;
    let store = FeatureTable::new().with(
        bar.id().clone(),
        StatisticFeatures::new(0.2, 0.8, 0.1, 0.0),
    );

    let oracle = ColumbusOracle::default();
    assert_eq!(
        oracle.get_statistic_features(&bar, &store),
        Some(StatisticFeatures::new(0.2, 0.8, 0.1, 0.0))
    );
    assert_eq!(oracle.get_statistic_features(&histogram, &store), None);

    let interestingness = get_interestingness_from_nodes(&[bar, histogram], &store);
    assert!((interestingness - 0.4).abs() < 1e-12);
    Ok(())
}

#[test]
fn test_statistic_score_is_clamped() {
    assert_eq!(StatisticFeatures::new(3.0, 0.0, 0.0, 0.0).score(), 1.0);
    assert_eq!(StatisticFeatures::new(-1.0, f64::NAN, 0.0, 0.0).score(), 0.0);
    assert_eq!(StatisticFeatures::default().score(), 0.0);
}

#[test]
fn test_probabilistic_oracle_uses_node_significance() -> anyhow::Result<()> {
    let df = sales_frame()?;
    let bar = VisualizationNode::from_candidate(bar_by_region(), &df)?;
    let histogram = VisualizationNode::from_candidate(units_histogram(), &df)?;
    let nodes = vec![
        ProbabilisticNode::new(bar, 0.9),
        ProbabilisticNode::new(histogram, 1.7),
    ];
    assert_eq!(nodes[1].significance(), 1.0);
    assert!((get_interestingness_v2(&nodes) - 0.95).abs() < 1e-12);

    let result = ColumbusProbOracle::default().get_result(&nodes, &df, &words(&["north"]));
    assert_eq!(result.coverage, 1.0);
    assert_eq!(result.uniqueness, 1.0);
    assert!((result.specificity - 0.5).abs() < 1e-12);
    assert!((result.score() - 3.45).abs() < 1e-12);
    assert_eq!(ProbabilisticNode::new(nodes[0].node().clone(), f64::NAN).significance(), 0.0);
    Ok(())
}

#[test]
fn test_score_is_linear_in_each_weight() {
    let base = OracleResult {
        weight: OracleWeight::default(),
        coverage: 0.6,
        uniqueness: 0.3,
        specificity: 0.5,
        interestingness: 0.2,
    };
    assert!((base.score() - 1.6).abs() < 1e-12);

    let mut bumped = base;
    bumped.weight.coverage += 2.0;
    assert!((bumped.score() - base.score() - 2.0 * 0.6).abs() < 1e-12);

    let mut zeroed = base;
    zeroed.weight = OracleWeight::new(0.0, 0.0, 0.0, 1.0);
    assert!((zeroed.score() - 0.2).abs() < 1e-12);
}

#[test]
fn test_result_export() -> anyhow::Result<()> {
    let result = OracleResult {
        weight: OracleWeight::default(),
        coverage: 1.0,
        uniqueness: 0.5,
        specificity: 0.0,
        interestingness: 0.25,
    };
    let map = result.to_map();
    assert_eq!(map["score"], 1.75);
    assert_eq!(map.len(), 5);

    let json: serde_json::Value = serde_json::from_str(&result.to_json()?)?;
    assert_eq!(json["uniqueness"], 0.5);
    assert_eq!(json["score"], 1.75);

    let text = result.to_string();
    assert!(text.starts_with("Score: 1.7500"));
    assert!(text.contains("Interestingness: 0.2500"));
    Ok(())
}

#[test]
fn test_weight_validation() {
    assert!(OracleWeight::default().validate().is_ok());
    assert!(OracleWeight::for_exploration().validate().is_ok());
    let negative = OracleWeight::new(1.0, -0.5, 1.0, 1.0);
    assert!(matches!(
        negative.validate(),
        Err(ConfigError::InvalidWeight { ref field, .. }) if field == "uniqueness"
    ));
    assert!(OracleWeight::new(f64::INFINITY, 1.0, 1.0, 1.0)
        .validate()
        .is_err());
    assert_eq!(OracleWeight::default().to_map()["specificity"], 1.0);
}
