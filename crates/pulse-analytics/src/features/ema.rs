//! EMA 피처 엔진.
//!
//! 기간별로 `value`/`prev`/`delta`/`ready`와 이벤트 태그를 만들고,
//! fast/slow 두 EMA를 비교한 복합 피처를 계산합니다.
//!
//! # 이벤트
//!
//! | 태그 | 조건 |
//! |------|------|
//! | `price_above_ema{p}` | `last_close > value` |
//! | `price_crossed_up_ema{p}` | `prev_close <= prev` AND `last_close > value` |
//! | `price_crossed_down_ema{p}` | `prev_close >= prev` AND `last_close < value` |
//! | `ema{f}_crossed_above_ema{s}` | 직전 fast <= slow, 현재 fast > slow |
//! | `ema{f}_crossed_below_ema{s}` | 직전 fast > slow, 현재 fast <= slow |
//!
//! 데이터 부족은 에러가 아니라 `ready = false`인 0 값 피처로 표현됩니다.

use pulse_core::IndicatorSource;
use serde::{Deserialize, Serialize};

/// 단일 기간 EMA 피처.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmaFeature {
    /// 마지막 캔들의 EMA
    pub value: f64,
    /// 직전 캔들의 EMA
    pub prev: f64,
    /// `value - prev`
    pub delta: f64,
    /// 유효한 EMA 포인트가 두 개 이상이면 true
    pub ready: bool,
    /// 발생 이벤트 (정해진 순서)
    pub events: Vec<String>,
}

impl EmaFeature {
    /// 이벤트 포함 여부.
    pub fn has_event(&self, tag: &str) -> bool {
        self.events.iter().any(|e| e == tag)
    }
}

/// fast/slow EMA 피처와 복합 추세 필터.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmaFeatureSet {
    pub fast: EmaFeature,
    pub slow: EmaFeature,
    pub fast_period: usize,
    pub slow_period: usize,
    /// fast, slow 모두 준비되었을 때 true
    pub above_ready: bool,
    /// fast EMA > slow EMA
    pub fast_above_slow: bool,
    pub combined_events: Vec<String>,
}

impl EmaFeatureSet {
    /// 모든 이벤트 (fast, slow, 복합 순).
    pub fn all_events(&self) -> impl Iterator<Item = &str> {
        self.fast
            .events
            .iter()
            .chain(&self.slow.events)
            .chain(&self.combined_events)
            .map(String::as_str)
    }
}

/// 한 기간의 EMA 피처를 계산합니다.
///
/// 종가가 `period`개 미만이거나, 시리즈가 준비되지 않았거나,
/// 값이 두 개 미만이면 0 피처를 반환합니다.
///
/// # Panics
///
/// 준비된 시리즈의 길이가 `closes`와 다르면 패닉합니다 (호출자 버그).
pub fn build_feature(source: &dyn IndicatorSource, closes: &[f64], period: usize) -> EmaFeature {
    if closes.len() < period.max(2) {
        return EmaFeature::default();
    }

    let series = source.ema_series(closes, period);
    if !series.ready || series.values.len() < 2 {
        return EmaFeature::default();
    }
    assert_eq!(
        series.values.len(),
        closes.len(),
        "EMA{period} series must be aligned to closes"
    );

    let n = closes.len();
    let (last_close, prev_close) = (closes[n - 1], closes[n - 2]);
    let (value, prev) = (series.values[n - 1], series.values[n - 2]);

    let mut events = Vec::new();
    if last_close > value {
        events.push(format!("price_above_ema{period}"));
    }
    if prev_close <= prev && last_close > value {
        events.push(format!("price_crossed_up_ema{period}"));
    }
    if prev_close >= prev && last_close < value {
        events.push(format!("price_crossed_down_ema{period}"));
    }

    EmaFeature {
        value,
        prev,
        delta: value - prev,
        ready: true,
        events,
    }
}

/// fast/slow EMA 피처 세트를 계산합니다.
///
/// 지표 제공자가 없거나 종가가 두 개 미만이면 전부 준비되지 않은 세트를 반환합니다.
/// 같은 입력에는 항상 같은 결과를 냅니다.
pub fn compute_ema_features(
    source: Option<&dyn IndicatorSource>,
    closes: &[f64],
    fast_period: usize,
    slow_period: usize,
) -> EmaFeatureSet {
    let mut set = EmaFeatureSet {
        fast_period,
        slow_period,
        ..Default::default()
    };
    let Some(source) = source else {
        return set;
    };
    if closes.len() < 2 {
        return set;
    }

    set.fast = build_feature(source, closes, fast_period);
    set.slow = build_feature(source, closes, slow_period);

    if set.fast.ready && set.slow.ready {
        set.above_ready = true;
        set.fast_above_slow = set.fast.value > set.slow.value;
        let prev_above = set.fast.prev > set.slow.prev;
        if !prev_above && set.fast_above_slow {
            set.combined_events
                .push(format!("ema{fast_period}_crossed_above_ema{slow_period}"));
        }
        if prev_above && !set.fast_above_slow {
            set.combined_events
                .push(format!("ema{fast_period}_crossed_below_ema{slow_period}"));
        }
    }

    tracing::trace!(
        fast_ready = set.fast.ready,
        slow_ready = set.slow.ready,
        events = set.all_events().count(),
        "EMA 피처 계산"
    );
    set
}
