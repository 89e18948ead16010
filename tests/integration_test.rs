//! Integration tests for the engine and the backtest pipeline.
//!
//! Tests cover:
//! - Engine properties over generated price series (proptest)
//! - Reference price scenarios
//! - Pipeline ordering with an in-memory run store and scripted generator
//! - Non-fatal artifact and suggestion failures
//! - Full pipeline against SqliteRunStore and FileArtifactAdapter

mod common;

use approx::assert_relative_eq;
use backtest_coach::domain::backtest::{run_backtest, ArtifactStatus, Collaborators};
use backtest_coach::domain::bias::{
    BiasThresholds, HIGH_SHARPE_FLAG, LOW_DRAWDOWN_FLAG, SMALL_SAMPLE_FLAG,
};
use backtest_coach::domain::engine::{analyze, analyze_prices};
use backtest_coach::domain::error::{CoachError, Stage};
use backtest_coach::domain::suggestion::{SuggestionStatus, FALLBACK_TITLE};
use backtest_coach::ports::run_store_port::RunStore;
use common::*;
use proptest::prelude::*;

fn price_vec(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.01f64..10_000.0, 1..max_len)
}

mod engine_properties {
    use super::*;

    proptest! {
        #[test]
        fn returns_have_one_fewer_point(prices in price_vec(200)) {
            let out = analyze_prices(&prices).unwrap();
            prop_assert_eq!(out.returns.len(), prices.len() - 1);
            prop_assert_eq!(out.equity_curve.len(), prices.len() - 1);
            prop_assert_eq!(out.metrics.n_points, prices.len());
        }

        #[test]
        fn metrics_are_idempotent(prices in price_vec(200)) {
            let a = analyze_prices(&prices).unwrap().metrics;
            let b = analyze_prices(&prices).unwrap().metrics;
            prop_assert_eq!(a.total_return.to_bits(), b.total_return.to_bits());
            prop_assert_eq!(a.volatility.to_bits(), b.volatility.to_bits());
            prop_assert_eq!(a.sharpe.to_bits(), b.sharpe.to_bits());
            prop_assert_eq!(a.max_drawdown.to_bits(), b.max_drawdown.to_bits());
            prop_assert_eq!(a.n_points, b.n_points);
        }

        #[test]
        fn metrics_are_finite(prices in price_vec(200)) {
            let m = analyze_prices(&prices).unwrap().metrics;
            prop_assert!(m.total_return.is_finite());
            prop_assert!(m.volatility.is_finite() && m.volatility >= 0.0);
            prop_assert!(m.sharpe.is_finite());
            prop_assert!(m.max_drawdown <= 0.0 && m.max_drawdown > -1.0);
        }

        #[test]
        fn equity_curve_round_trips_returns(prices in price_vec(200)) {
            let out = analyze_prices(&prices).unwrap();
            let returns = out.returns.as_slice();
            let points = &out.equity_curve.points;
            for i in 0..points.len() {
                let previous = if i == 0 { 1.0 } else { points[i - 1].equity };
                let implied = points[i].equity / previous - 1.0;
                prop_assert!(
                    (implied - returns[i]).abs() <= 1e-9 * (1.0 + returns[i].abs()),
                    "point {}: implied {} vs return {}", i, implied, returns[i]
                );
                prop_assert_eq!(points[i].index, i + 1);
            }
        }

        #[test]
        fn flags_keep_fixed_order(prices in price_vec(120)) {
            let thresholds = BiasThresholds {
                min_sample_price_points: 60,
                max_sharpe: 0.5,
                min_drawdown: -0.2,
            };
            let flags = analyze(&series(&prices), &thresholds).unwrap().flags;
            let order = [SMALL_SAMPLE_FLAG, HIGH_SHARPE_FLAG, LOW_DRAWDOWN_FLAG];
            let positions: Vec<usize> = flags
                .iter()
                .map(|f| order.iter().position(|o| *o == f.as_str()).unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn constant_ratio_series(start in 1.0f64..1_000.0, r in 0.0f64..0.05, n in 2usize..100) {
            let prices = geometric_prices(start, r, n);
            let m = analyze_prices(&prices).unwrap().metrics;
            prop_assert!(m.volatility < 1e-12);
            prop_assert!(m.max_drawdown.abs() < 1e-12);
            let expected = (1.0 + r).powi(n as i32 - 1) - 1.0;
            prop_assert!((m.total_return - expected).abs() <= 1e-9 * (1.0 + expected.abs()));
        }

        #[test]
        fn exact_doubling_has_zero_sharpe(start in 1u32..1_000, n in 2usize..40) {
            let prices = geometric_prices(start as f64, 1.0, n);
            let m = analyze_prices(&prices).unwrap().metrics;
            prop_assert_eq!(m.volatility, 0.0);
            prop_assert_eq!(m.sharpe, 0.0);
            prop_assert_eq!(m.max_drawdown, 0.0);
        }

        #[test]
        fn any_non_positive_price_is_rejected(
            mut prices in price_vec(50),
            idx in 0usize..50,
            bad in prop_oneof![Just(0.0f64), -1_000.0f64..-0.001],
        ) {
            let idx = idx % prices.len();
            prices[idx] = bad;
            let err = analyze_prices(&prices).unwrap_err();
            let is_return_stage = matches!(
                err,
                CoachError::InvalidInput { stage: Stage::ReturnDerivation, .. }
            );
            prop_assert!(is_return_stage);
            let needle = format!("index {}", idx);
            prop_assert!(err.to_string().contains(&needle));
        }
    }
}

mod reference_scenarios {
    use super::*;

    #[test]
    fn single_price_yields_zero_metrics() {
        let out = analyze_prices(&[42.0]).unwrap();
        assert!(out.returns.is_empty());
        assert!(out.equity_curve.is_empty());
        assert_eq!(out.metrics.total_return, 0.0);
        assert_eq!(out.metrics.volatility, 0.0);
        assert_eq!(out.metrics.sharpe, 0.0);
        assert_eq!(out.metrics.max_drawdown, 0.0);
        assert_eq!(out.metrics.n_points, 1);
    }

    #[test]
    fn five_point_series() {
        let out = analyze_prices(&REFERENCE_PRICES).unwrap();
        let expected = [0.02, -0.0098039, 0.0396040, -0.0190476];
        for (actual, expected) in out.returns.as_slice().iter().zip(expected) {
            assert_relative_eq!(*actual, expected, epsilon = 1e-6);
        }
        assert_relative_eq!(out.metrics.total_return, 0.03, epsilon = 1e-12);
        assert_eq!(out.metrics.n_points, 5);
        assert!(out.metrics.sharpe.is_finite());
        assert!(out.metrics.max_drawdown.is_finite());
        assert!(out.flags.contains(&SMALL_SAMPLE_FLAG.to_string()));
        assert_eq!(out.flags[0], SMALL_SAMPLE_FLAG);
    }

    #[test]
    fn zero_price_produces_no_record() {
        let err = analyze_prices(&[100.0, 0.0, 105.0]).unwrap_err();
        assert!(err.is_input_error());
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn sixty_flat_prices() {
        let out = analyze_prices(&[100.0; 60]).unwrap();
        assert_eq!(out.metrics.volatility, 0.0);
        assert_eq!(out.metrics.sharpe, 0.0);
        assert_eq!(out.metrics.max_drawdown, 0.0);
        assert!(out.flags.contains(&LOW_DRAWDOWN_FLAG.to_string()));
        assert!(!out.flags.contains(&SMALL_SAMPLE_FLAG.to_string()));
    }

    #[test]
    fn empty_series_is_rejected() {
        let err = analyze_prices(&[]).unwrap_err();
        assert!(matches!(
            err,
            CoachError::InvalidInput {
                stage: Stage::PriceSeries,
                ..
            }
        ));
    }
}

mod pipeline_with_store {
    use super::*;

    #[test]
    fn records_upload_run_and_suggestions() {
        let store = MemoryRunStore::new();
        let artifacts = RecordingArtifacts::new();
        let generator = ScriptedGenerator::replying(THREE_SUGGESTIONS);
        let collaborators = Collaborators {
            artifacts: &artifacts,
            store: Some(&store),
            suggestions: Some(&generator),
        };

        let outcome = run_backtest(
            "prices.csv",
            &series(&REFERENCE_PRICES),
            &BiasThresholds::default(),
            &collaborators,
        )
        .unwrap();

        assert_eq!(outcome.run_id, Some(1));
        assert_eq!(artifacts.stems(), vec!["equity_1"]);
        assert!(outcome.warnings().is_empty());

        let stored = store.get_run(1).unwrap().unwrap();
        assert_eq!(stored.filename, "prices.csv");
        assert_eq!(stored.metrics, outcome.metrics);
        assert_eq!(stored.equity_curve_path.as_deref(), Some("plots/equity_1.svg"));
        assert_eq!(stored.suggestions.len(), 3);
        assert_eq!(stored.suggestions[0].title, "Walk-forward split");
        assert_eq!(stored.suggestions[2].risk_note, None);
    }

    #[test]
    fn prompt_carries_metrics_and_flags() {
        let artifacts = RecordingArtifacts::new();
        let generator = ScriptedGenerator::replying("[]");
        let collaborators = Collaborators {
            artifacts: &artifacts,
            store: None,
            suggestions: Some(&generator),
        };
        run_backtest(
            "prices.csv",
            &series(&REFERENCE_PRICES),
            &BiasThresholds::default(),
            &collaborators,
        )
        .unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("\"n_points\":5"));
        assert!(prompts[0].contains(SMALL_SAMPLE_FLAG));
    }

    #[test]
    fn successive_runs_get_distinct_artifacts() {
        let store = MemoryRunStore::new();
        let artifacts = RecordingArtifacts::new();
        let collaborators = Collaborators {
            artifacts: &artifacts,
            store: Some(&store),
            suggestions: None,
        };
        for _ in 0..3 {
            run_backtest(
                "prices.csv",
                &series(&REFERENCE_PRICES),
                &BiasThresholds::default(),
                &collaborators,
            )
            .unwrap();
        }
        assert_eq!(artifacts.stems(), vec!["equity_1", "equity_2", "equity_3"]);
        let listed: Vec<i64> = store.list_runs(10).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(listed, vec![3, 2, 1]);
    }

    #[test]
    fn artifact_failure_still_records_run() {
        let store = MemoryRunStore::new();
        let artifacts = RecordingArtifacts::failing();
        let collaborators = Collaborators {
            artifacts: &artifacts,
            store: Some(&store),
            suggestions: None,
        };
        let outcome = run_backtest(
            "prices.csv",
            &series(&REFERENCE_PRICES),
            &BiasThresholds::default(),
            &collaborators,
        )
        .unwrap();

        assert!(matches!(outcome.artifact, ArtifactStatus::Unavailable { .. }));
        assert_eq!(outcome.warnings().len(), 1);
        let stored = store.get_run(outcome.run_id.unwrap()).unwrap().unwrap();
        assert_eq!(stored.equity_curve_path, None);
    }

    #[test]
    fn generator_failure_keeps_run_without_suggestions() {
        let store = MemoryRunStore::new();
        let artifacts = RecordingArtifacts::new();
        let generator = ScriptedGenerator::failing("503 service unavailable");
        let collaborators = Collaborators {
            artifacts: &artifacts,
            store: Some(&store),
            suggestions: Some(&generator),
        };
        let outcome = run_backtest(
            "prices.csv",
            &series(&REFERENCE_PRICES),
            &BiasThresholds::default(),
            &collaborators,
        )
        .unwrap();

        assert!(matches!(outcome.suggestions, SuggestionStatus::Unavailable { .. }));
        assert!(outcome.warnings()[0].contains("503"));
        assert!(store.get_run(1).unwrap().unwrap().suggestions.is_empty());
    }

    #[test]
    fn free_text_reply_is_stored_as_fallback() {
        let store = MemoryRunStore::new();
        let artifacts = RecordingArtifacts::new();
        let generator = ScriptedGenerator::replying("Try a longer history.");
        let collaborators = Collaborators {
            artifacts: &artifacts,
            store: Some(&store),
            suggestions: Some(&generator),
        };
        run_backtest(
            "prices.csv",
            &series(&REFERENCE_PRICES),
            &BiasThresholds::default(),
            &collaborators,
        )
        .unwrap();

        let stored = store.get_run(1).unwrap().unwrap();
        assert_eq!(stored.suggestions.len(), 1);
        assert_eq!(stored.suggestions[0].title, FALLBACK_TITLE);
        assert_eq!(stored.suggestions[0].description, "Try a longer history.");
    }

    #[test]
    fn store_failure_aborts() {
        let store = MemoryRunStore::failing();
        let artifacts = RecordingArtifacts::new();
        let generator = ScriptedGenerator::replying("[]");
        let collaborators = Collaborators {
            artifacts: &artifacts,
            store: Some(&store),
            suggestions: Some(&generator),
        };
        let err = run_backtest(
            "prices.csv",
            &series(&REFERENCE_PRICES),
            &BiasThresholds::default(),
            &collaborators,
        )
        .unwrap_err();

        assert!(matches!(err, CoachError::DatabaseQuery { .. }));
        assert_eq!(generator.calls(), 0);
    }

    #[test]
    fn invalid_prices_touch_nothing() {
        let store = MemoryRunStore::new();
        let artifacts = RecordingArtifacts::new();
        let collaborators = Collaborators {
            artifacts: &artifacts,
            store: Some(&store),
            suggestions: None,
        };
        let err = run_backtest(
            "prices.csv",
            &series(&[100.0, -5.0, 105.0]),
            &BiasThresholds::default(),
            &collaborators,
        )
        .unwrap_err();

        assert!(err.is_input_error());
        assert_eq!(store.upload_count(), 0);
        assert_eq!(store.run_count(), 0);
        assert!(artifacts.stems().is_empty());
    }
}

#[cfg(feature = "sqlite")]
mod sqlite_pipeline {
    use super::*;
    use backtest_coach::adapters::file_artifact_adapter::FileArtifactAdapter;
    use backtest_coach::adapters::sqlite_adapter::SqliteRunStore;
    use backtest_coach::ports::artifact_port::ArtifactFormat;
    use tempfile::TempDir;

    #[test]
    fn end_to_end_with_real_adapters() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteRunStore::in_memory().unwrap();
        let artifacts = FileArtifactAdapter::new(tmp.path().join("plots"), ArtifactFormat::Svg);
        let generator = ScriptedGenerator::replying(&format!("```json\n{THREE_SUGGESTIONS}\n```"));
        let collaborators = Collaborators {
            artifacts: &artifacts,
            store: Some(&store),
            suggestions: Some(&generator),
        };

        let outcome = run_backtest(
            "prices.csv",
            &series(&geometric_prices(100.0, 0.01, 80)),
            &BiasThresholds::default(),
            &collaborators,
        )
        .unwrap();

        let stored = store.get_run(outcome.run_id.unwrap()).unwrap().unwrap();
        let written = outcome.artifact.artifact().unwrap();
        assert_eq!(written.name, format!("equity_{}.svg", stored.upload_id));
        assert!(written.path.exists());

        assert_eq!(stored.metrics, outcome.metrics);
        assert_eq!(stored.suggestions.len(), 3);
        assert_eq!(
            stored.equity_curve_path.as_deref(),
            Some(written.path.to_string_lossy().as_ref())
        );
    }
}
