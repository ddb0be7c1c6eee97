//! `ta` 크레이트 기반 기본 지표 제공자.
//!
//! [`IndicatorSource`] 계약의 기본 구현입니다. 다른 EMA 알고리즘이 필요하면
//! 같은 trait을 구현한 타입으로 교체하면 되고, 피처/이벤트 로직은 영향을 받지 않습니다.

use pulse_core::{IndicatorSnapshot, IndicatorSource, SeriesResult};
use ta::indicators::{ExponentialMovingAverage, RelativeStrengthIndex, SimpleMovingAverage};
use ta::Next;

/// 스냅샷 SMA 기간
pub const SMA_PERIOD: usize = 20;
/// 스냅샷 EMA 기간
pub const EMA_PERIOD: usize = 20;
/// 스냅샷 RSI 기간
pub const RSI_PERIOD: usize = 14;

/// `ta` 크레이트로 SMA/EMA/RSI를 계산하는 지표 제공자.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaIndicatorSource;

impl TaIndicatorSource {
    pub fn new() -> Self {
        Self
    }
}

/// 지표를 끝까지 흘려 마지막 값을 얻습니다.
fn last_value<I: Next<f64, Output = f64>>(mut indicator: I, closes: &[f64]) -> Option<f64> {
    closes.iter().map(|&c| indicator.next(c)).last()
}

impl IndicatorSource for TaIndicatorSource {
    fn compute_snapshot(&self, closes: &[f64]) -> IndicatorSnapshot {
        let sma = (closes.len() >= SMA_PERIOD)
            .then(|| SimpleMovingAverage::new(SMA_PERIOD).ok())
            .flatten()
            .and_then(|ind| last_value(ind, closes));
        let ema = (closes.len() >= EMA_PERIOD)
            .then(|| ExponentialMovingAverage::new(EMA_PERIOD).ok())
            .flatten()
            .and_then(|ind| last_value(ind, closes));
        // RSI는 변화량 기준이므로 기간 + 1개의 종가가 필요
        let rsi = (closes.len() > RSI_PERIOD)
            .then(|| RelativeStrengthIndex::new(RSI_PERIOD).ok())
            .flatten()
            .and_then(|ind| last_value(ind, closes));

        IndicatorSnapshot { sma, ema, rsi }
    }

    /// 종가에 정렬된 EMA 시리즈.
    ///
    /// `period - 1` 이전 인덱스는 0으로 채웁니다.
    /// 유효 값이 두 개 이상(`len >= period + 1`)일 때만 준비 상태입니다.
    fn ema_series(&self, closes: &[f64], period: usize) -> SeriesResult {
        let Ok(mut ema) = ExponentialMovingAverage::new(period) else {
            tracing::warn!(period, "EMA 기간이 유효하지 않음");
            return SeriesResult::not_ready(closes.len(), period);
        };

        let values = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let value = ema.next(close);
                if i + 1 >= period {
                    value
                } else {
                    0.0
                }
            })
            .collect();

        SeriesResult {
            values,
            warmup: period,
            ready: closes.len() > period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_warmup() {
        let source = TaIndicatorSource::new();

        let short: Vec<f64> = (0..14).map(f64::from).collect();
        assert!(source.compute_snapshot(&short).is_empty());

        let mid: Vec<f64> = (0..15).map(f64::from).collect();
        let snapshot = source.compute_snapshot(&mid);
        assert!(snapshot.rsi.is_some());
        assert!(snapshot.sma.is_none());
        assert!(snapshot.ema.is_none());

        let long: Vec<f64> = (0..20).map(f64::from).collect();
        let snapshot = source.compute_snapshot(&long);
        // 0..19의 평균
        assert!((snapshot.sma.unwrap() - 9.5).abs() < 1e-9);
        assert!(snapshot.ema.is_some());
    }

    #[test]
    fn test_flat_series_ema_equals_price() {
        let closes = vec![50.0; 30];
        let series = TaIndicatorSource.ema_series(&closes, 20);

        assert!(series.ready);
        assert_eq!(series.values.len(), 30);
        assert_eq!(series.warmup, 20);
        assert!(series.values[..19].iter().all(|&v| v == 0.0));
        assert!(series.values[19..].iter().all(|&v| (v - 50.0).abs() < 1e-9));
    }

    #[test]
    fn test_ema_series_readiness() {
        let source = TaIndicatorSource;
        assert!(!source.ema_series(&[1.0; 20], 20).ready);
        assert!(source.ema_series(&[1.0; 21], 20).ready);
        assert!(!source.ema_series(&[1.0; 5], 0).ready);
    }

    #[test]
    fn test_rising_series_rsi_is_high() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let rsi = TaIndicatorSource.compute_snapshot(&closes).rsi.unwrap();
        assert!(rsi > 70.0);
    }
}
