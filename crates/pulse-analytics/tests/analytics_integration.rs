//! 분석 엔진 통합 테스트
//!
//! 캔들 → 스윙 → 추세, ZigZag, EMA 피처 전체 흐름과 속성 기반 검증.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use pulse_analytics::{
    classify, compute_ema_features, enforce_alternation, find_swings, metrics, zigzag,
    zigzag_by_threshold, SeriesSummary, TaIndicatorSource,
};
use pulse_core::{closes, volumes, Candle, IndicatorSnapshot, IndicatorSource, SeriesResult, TrendState};

fn series(closes: &[f64]) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            Candle::new(
                start + Duration::days(i as i64),
                c,
                c * 1.01,
                c * 0.99,
                c,
                1_000 + i as i64,
            )
        })
        .collect()
}

/// 지그재그 파형 종가: 상승 폭이 하락 폭보다 커서 고점/저점이 모두 높아짐
fn rising_waves() -> Vec<f64> {
    let mut price = 100.0;
    let mut out = Vec::new();
    for _ in 0..6 {
        for _ in 0..5 {
            price += 2.0;
            out.push(price);
        }
        for _ in 0..5 {
            price -= 1.0;
            out.push(price);
        }
    }
    out
}

#[test]
fn test_rising_waves_classify_as_uptrend() {
    let candles = series(&rising_waves());
    let swings = find_swings(&candles, 2);
    assert!(!swings.is_empty());

    let (trend, changes) = classify(&swings);
    assert_eq!(trend, TrendState::Up);
    assert_eq!(changes.last().map(|c| c.trend), Some(TrendState::Up));
}

#[test]
fn test_swing_edge_example() {
    let candles = series(&[1.0, 2.0, 1.0]);
    assert!(find_swings(&candles, 2).is_empty());
}

#[test]
fn test_ema_warmup_with_default_provider() {
    let source = TaIndicatorSource::new();

    let short: Vec<f64> = (0..19).map(|i| 100.0 + i as f64).collect();
    let set = compute_ema_features(Some(&source), &short, 20, 100);
    assert!(!set.fast.ready);

    let enough: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
    let set = compute_ema_features(Some(&source), &enough, 20, 100);
    assert!(set.fast.ready);
    assert!(!set.slow.ready);
    assert!(!set.above_ready);
    // 꾸준히 오르는 가격은 EMA 위에 있음
    assert!(set.fast.has_event("price_above_ema20"));
    assert!(set.fast.delta > 0.0);
}

/// 마지막 두 값만 지정한 EMA 시리즈를 돌려주는 제공자
struct TrailingEma {
    prev: f64,
    last: f64,
}

impl IndicatorSource for TrailingEma {
    fn compute_snapshot(&self, _closes: &[f64]) -> IndicatorSnapshot {
        IndicatorSnapshot::default()
    }

    fn ema_series(&self, closes: &[f64], period: usize) -> SeriesResult {
        let mut values = vec![100.0; closes.len()];
        let n = values.len();
        values[n - 2] = self.prev;
        values[n - 1] = self.last;
        SeriesResult {
            values,
            warmup: period,
            ready: closes.len() > period,
        }
    }
}

#[test]
fn test_ema_cross_up_example() {
    let mut closes = vec![100.0; 23];
    closes.push(98.0);
    closes.push(102.0);
    let source = TrailingEma {
        prev: 99.0,
        last: 100.0,
    };

    let set = compute_ema_features(Some(&source), &closes, 20, 100);
    assert!(set.fast.has_event("price_crossed_up_ema20"));
    assert!(!set.fast.has_event("price_crossed_down_ema20"));
}

#[test]
fn test_summary_matches_metric_functions() {
    let candles = series(&rising_waves());
    let closes = closes(&candles);
    let summary = SeriesSummary::from_series(&closes, &volumes(&candles));

    assert_eq!(summary.last, metrics::last(&closes));
    assert_eq!(summary.max_drawdown, metrics::max_drawdown(&closes));
    assert!(summary.max_drawdown > 0.0 && summary.max_drawdown < 1.0);
}

fn arb_closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..1_000.0, 0..120)
}

proptest! {
    #[test]
    fn prop_threshold_zigzag_alternates(closes in arb_closes(), threshold in 0.001f64..0.2) {
        let points = zigzag_by_threshold(&series(&closes), threshold);
        for pair in points.windows(2) {
            prop_assert_ne!(pair[0].kind, pair[1].kind);
        }
    }

    #[test]
    fn prop_alternation_filter_alternates(
        closes in arb_closes(),
        depth in 1usize..10,
        backstep in 0usize..5,
    ) {
        let raw = zigzag(&series(&closes), depth, 0.0, backstep);
        let filtered = enforce_alternation(&raw);
        prop_assert!(filtered.len() <= raw.len());
        for pair in filtered.windows(2) {
            prop_assert_ne!(pair[0].kind, pair[1].kind);
        }
    }

    #[test]
    fn prop_analytics_are_deterministic(closes in arb_closes(), n in 1usize..5) {
        let candles = series(&closes);
        prop_assert_eq!(find_swings(&candles, n), find_swings(&candles, n));
        prop_assert_eq!(classify(&find_swings(&candles, n)), classify(&find_swings(&candles, n)));
        prop_assert_eq!(zigzag_by_threshold(&candles, 0.05), zigzag_by_threshold(&candles, 0.05));

        let source = TaIndicatorSource;
        prop_assert_eq!(
            compute_ema_features(Some(&source), &closes, 20, 100),
            compute_ema_features(Some(&source), &closes, 20, 100)
        );
        let a = SeriesSummary::from_series(&closes, &volumes(&candles));
        let b = SeriesSummary::from_series(&closes, &volumes(&candles));
        prop_assert_eq!(a.volatility.to_bits(), b.volatility.to_bits());
    }

    #[test]
    fn prop_swings_stay_inside_bounds(closes in arb_closes(), n in 1usize..6) {
        let candles = series(&closes);
        let swings = find_swings(&candles, n);
        if candles.len() < 2 * n + 1 {
            prop_assert!(swings.is_empty());
        } else {
            let lo = candles[n].time;
            let hi = candles[candles.len() - 1 - n].time;
            for s in &swings {
                prop_assert!(s.candle.time >= lo && s.candle.time <= hi);
            }
        }
    }

    #[test]
    fn prop_drawdown_is_a_fraction(closes in arb_closes()) {
        let dd = metrics::max_drawdown(&closes);
        prop_assert!((0.0..1.0).contains(&dd));
    }
}
