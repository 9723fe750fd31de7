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

use gleaner::oracle::{get_specificity_from_nodes, get_uniqueness_from_nodes};
use gleaner::{
    AggType, Attribute, ChartCandidate, ChartType, GenerationError, Generator, Grammar,
    GrammarToken, OracleResult, OracleWeight, PartialChart, Slot, SlotValue, VisualizationNode,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::sync::Arc;

const OPEN_GRAMMAR: &str = r#"
rules:
  - ["*", "*", none]
  - [bar, categorical]
  - [bar, quantitative, categorical, none, sum]
  - [scatter, quantitative, "*", "*", raw]
  - [scatter, categorical, quantitative]
  - [line, quantitative, quantitative, none, mean]
  - [heatmap, categorical, categorical, quantitative, count]
  - [pie, categorical, none, none, count]
"#;

fn generator_with(grammar: Grammar) -> Generator {
    let df = polars::df!(
        "region" => ["north", "south", "east"],
        "product" => ["a", "b", "a"],
        "sales" => [1.0, 2.0, 3.0],
        "units" => [3i64, 2, 1],
        "price" => [0.5, 0.25, 0.75],
    )
    .expect("fixture frame");
    Generator::new(Arc::new(df), Arc::new(grammar)).expect("fixture generator")
}

fn generator() -> Generator {
    generator_with(Grammar::builtin())
}

/// Whether some rule matching `prefix` allows `value` at position
/// `position`, computed by scanning rows rather than walking the trie.
fn any_row_allows(
    grammar: &Grammar,
    prefix: &[GrammarToken],
    position: usize,
    value: &GrammarToken,
) -> bool {
    grammar.rows().iter().any(|row| {
        row.matches_prefix(prefix)
            && row.tokens().get(position).map_or(true, |rule| rule.accepts(value))
    })
}

fn node(bag: BTreeSet<String>) -> VisualizationNode {
    let chart = ChartCandidate::new(
        ChartType::Pie,
        Attribute::categorical("region"),
        SlotValue::None,
        SlotValue::None,
        AggType::Count,
    );
    VisualizationNode::from_parts(chart, Vec::new(), Vec::new(), bag)
}

fn term() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["north", "south", "east", "west", "a", "b"]).prop_map(String::from)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sampled_charts_are_valid_for_any_seed(seed in any::<u64>(), randomise in any::<bool>()) {
        let mut generator = generator();
        let mut rng = StdRng::seed_from_u64(seed);
        if randomise {
            generator.initialize(&mut rng).expect("priors");
        }
        for _ in 0..20 {
            match generator.sample_one(&mut rng) {
                Ok(candidate) => {
                    prop_assert!(generator.grammar().is_valid(&candidate));
                    prop_assert!(candidate.has_distinct_attributes());
                }
                Err(GenerationError::InfeasibleSample { slot }) => {
                    prop_assert!(slot != Slot::ChartType);
                }
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn attribute_mask_never_grows_with_the_prefix(
        chart_type in prop::sample::select(ChartType::ALL.to_vec()),
        picks in prop::collection::vec(any::<usize>(), 0..3),
        builtin in any::<bool>(),
    ) {
        let grammar = if builtin {
            Grammar::builtin()
        } else {
            Grammar::from_yaml_str(OPEN_GRAMMAR).expect("open grammar")
        };
        let generator = generator_with(grammar);
        let attrs = generator.attributes();
        let mut partial = PartialChart::new(chart_type);
        for pick in picks {
            let eligible: Vec<usize> = generator
                .attr_mask(&partial)
                .iter()
                .enumerate()
                .filter_map(|(i, ok)| ok.then_some(i))
                .collect();
            if eligible.is_empty() {
                break;
            }
            partial = partial.with(attrs[eligible[pick % eligible.len()]].clone());
        }
        let prefix = partial.tokens();
        let position = prefix.len();
        let mask = generator.attr_mask(&partial);
        for (value, eligible) in attrs.iter().zip(&mask) {
            if !*eligible {
                continue;
            }
            if let Some(attr) = value.attribute() {
                prop_assert!(!partial.uses(attr), "{} reused", attr.name);
            }
            let token = PartialChart::new(chart_type).with(value.clone()).tokens()[1];
            for shorter in 1..=prefix.len() {
                prop_assert!(
                    any_row_allows(generator.grammar(), &prefix[..shorter], position, &token),
                    "{token} eligible after {prefix:?} but not after {:?}",
                    &prefix[..shorter]
                );
            }
        }
    }

    #[test]
    fn specificity_stays_in_unit_interval(
        bags in prop::collection::vec(prop::collection::btree_set(term(), 0..5), 0..6),
        wildcard in prop::collection::btree_set(term(), 0..5),
    ) {
        let nodes: Vec<VisualizationNode> = bags.into_iter().map(node).collect();
        let specificity = get_specificity_from_nodes(&nodes, &wildcard);
        prop_assert!((0.0..=1.0).contains(&specificity));
        if wildcard.is_empty() {
            prop_assert_eq!(specificity, 0.0);
        }
    }

    #[test]
    fn uniqueness_stays_in_unit_interval(count in 0usize..6) {
        let nodes: Vec<VisualizationNode> = (0..count).map(|_| node(BTreeSet::new())).collect();
        let uniqueness = get_uniqueness_from_nodes(&nodes);
        prop_assert!((0.0..=1.0).contains(&uniqueness));
    }

    #[test]
    fn score_moves_linearly_with_each_weight(
        metrics in prop::array::uniform4(0.0f64..=1.0),
        weights in prop::array::uniform4(0.0f64..=5.0),
        delta in 0.0f64..=3.0,
        which in 0usize..4,
    ) {
        let base = OracleResult {
            weight: OracleWeight::new(weights[0], weights[1], weights[2], weights[3]),
            coverage: metrics[0],
            uniqueness: metrics[1],
            specificity: metrics[2],
            interestingness: metrics[3],
        };
        let mut shifted = base;
        match which {
            0 => shifted.weight.coverage += delta,
            1 => shifted.weight.uniqueness += delta,
            2 => shifted.weight.specificity += delta,
            _ => shifted.weight.interestingness += delta,
        }
        let expected = base.score() + delta * metrics[which];
        prop_assert!((shifted.score() - expected).abs() < 1e-9);
    }
}
