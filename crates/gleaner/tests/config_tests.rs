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

use gleaner::config::{GleanerConfig, PriorConfig, SelectionConfig};
use gleaner::{AttributeType, ConfigError, DashboardSuggestionSystem, GleanerError, OracleWeight};
use std::io::Write;

#[test]
fn test_default_config_is_valid() {
    let config = GleanerConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.oracle, OracleWeight::default());
    assert_eq!(config.selection.max_sample_attempts, 10);
    assert!(config.grammar_path.is_none());
    assert!(config.seed.is_none());
}

#[test]
fn test_presets_are_valid() {
    for config in [
        GleanerConfig::for_exploration(),
        GleanerConfig::for_presentation(),
    ] {
        assert!(config.validate().is_ok());
    }
    assert!(
        GleanerConfig::for_presentation().selection.candidate_pool
            > GleanerConfig::for_exploration().selection.candidate_pool
    );
}

#[test]
fn test_config_loaded_from_yaml_file() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r#"
oracle:
  coverage: 2.0
  specificity: 0.5
selection:
  dashboard_size: 3
prior:
  concentration_min: 1.0
  concentration_max: 4.0
attribute_overrides:
  units: categorical
seed: 17
"#
    )?;
    let config = GleanerConfig::from_yaml_file(file.path())?;
    assert_eq!(config.oracle.coverage, 2.0);
    assert_eq!(config.oracle.uniqueness, 1.0);
    assert_eq!(config.oracle.specificity, 0.5);
    assert_eq!(config.selection.dashboard_size, 3);
    assert_eq!(config.selection.candidate_pool, SelectionConfig::default().candidate_pool);
    assert_eq!(config.prior.concentration_max, 4.0);
    assert_eq!(
        config.attribute_overrides.get("units"),
        Some(&AttributeType::Categorical)
    );
    assert_eq!(config.seed, Some(17));
    Ok(())
}

#[test]
fn test_shipped_config_loads() -> anyhow::Result<()> {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let system = DashboardSuggestionSystem::from_config_file(dir.join("config/gleaner.yml"))?;
    assert_eq!(system.grammar().rows().len(), 21);
    Ok(())
}

#[test]
fn test_relative_grammar_path_follows_the_config_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir(dir.path().join("grammars"))?;
    std::fs::write(
        dir.path().join("grammars/small.yml"),
        "rules:\n  - [\"*\", quantitative, none, none, count]\n  - [bar, categorical, quantitative, none, sum]\n",
    )?;
    let config_path = dir.path().join("gleaner.yml");
    std::fs::write(&config_path, "grammar_path: grammars/small.yml\nseed: 3\n")?;

    let system = DashboardSuggestionSystem::from_config_file(&config_path)?;
    assert_eq!(system.grammar().rows().len(), 2);
    assert_eq!(
        system.config().grammar_path.as_deref(),
        Some(dir.path().join("grammars/small.yml").as_path())
    );

    let absolute = dir.path().join("absolute.yml");
    std::fs::write(
        &absolute,
        format!("grammar_path: {}\n", dir.path().join("grammars/small.yml").display()),
    )?;
    let system = DashboardSuggestionSystem::from_config_file(&absolute)?;
    assert_eq!(system.grammar().rows().len(), 2);
    Ok(())
}

#[test]
fn test_negative_weight_is_rejected() {
    let err = GleanerConfig::from_yaml_str("oracle:\n  interestingness: -1.0\n").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidWeight { .. }));
}

#[test]
fn test_zero_pool_is_rejected() {
    let err = GleanerConfig::from_yaml_str("selection:\n  candidate_pool: 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSelectionConfig { ref field } if field == "candidate_pool"));
}

#[test]
fn test_inverted_concentration_range_is_rejected() {
    let config = GleanerConfig {
        prior: PriorConfig {
            concentration_min: 3.0,
            concentration_max: 1.0,
        },
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidPriorConfig { .. })
    ));
}

#[test]
fn test_missing_config_file() {
    let err = GleanerConfig::from_yaml_file("/definitely/not/here/gleaner.yml").unwrap_err();
    match err {
        ConfigError::ConfigFileError { path, reason } => {
            assert!(path.ends_with("gleaner.yml"));
            assert!(reason.contains("Failed to read config file"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_custom_grammar_path_is_used() -> anyhow::Result<()> {
    let mut grammar = tempfile::NamedTempFile::new()?;
    writeln!(grammar, "rules:")?;
    writeln!(grammar, "  - [\"*\", quantitative, none, none, count]")?;
    let config = GleanerConfig {
        grammar_path: Some(grammar.path().to_path_buf()),
        ..Default::default()
    };
    let system = DashboardSuggestionSystem::from_config(config)?;
    assert_eq!(system.grammar().rows().len(), 1);

    let broken = GleanerConfig {
        grammar_path: Some("/definitely/not/here/grammar.yml".into()),
        ..Default::default()
    };
    assert!(matches!(
        DashboardSuggestionSystem::from_config(broken),
        Err(GleanerError::Grammar(_))
    ));
    Ok(())
}

#[test]
fn test_config_round_trips_through_yaml() -> anyhow::Result<()> {
    let config = GleanerConfig {
        seed: Some(5),
        ..GleanerConfig::for_presentation()
    };
    let yaml = config.to_yaml()?;
    assert_eq!(GleanerConfig::from_yaml_str(&yaml)?, config);
    Ok(())
}
