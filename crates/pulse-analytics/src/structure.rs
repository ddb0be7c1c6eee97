//! 시장 구조 요약.
//!
//! 캔들 하나의 시리즈에 대해 스윙 → 추세 분류와 임계값 ZigZag를 한 번에 계산합니다.
//! 리포트 행과 차트 마커가 이 결과를 공유합니다.

use pulse_core::{Candle, Extremum, TrendChange, TrendState, ZigZagPoint};
use serde::Serialize;

use crate::swing::find_swings;
use crate::trend::classify;
use crate::zigzag::zigzag_by_threshold;

/// 종목 하나의 시장 구조.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketStructure {
    /// 스윙 윈도우 반경
    pub swing_window: usize,
    /// 탐지된 스윙 수
    pub swing_count: usize,
    /// 최종 추세
    pub trend: TrendState,
    /// 추세 변화 기록 (시간순)
    pub trend_changes: Vec<TrendChange>,
    /// ZigZag 임계값 (비율, 0.05 = 5%)
    pub zigzag_threshold: f64,
    /// 임계값 ZigZag 피벗 (고점/저점 교대)
    pub zigzag: Vec<ZigZagPoint>,
}

impl MarketStructure {
    /// 캔들에서 시장 구조를 계산합니다.
    pub fn analyze(candles: &[Candle], swing_window: usize, zigzag_threshold: f64) -> Self {
        let swings = find_swings(candles, swing_window);
        let (trend, trend_changes) = classify(&swings);

        Self {
            swing_window,
            swing_count: swings.len(),
            trend,
            trend_changes,
            zigzag_threshold,
            zigzag: zigzag_by_threshold(candles, zigzag_threshold),
        }
    }

    /// 마지막 추세 변화.
    pub fn last_change(&self) -> Option<&TrendChange> {
        self.trend_changes.last()
    }

    /// 마지막 ZigZag 피벗.
    pub fn last_pivot(&self) -> Option<&ZigZagPoint> {
        self.zigzag.last()
    }

    /// 고점 피벗과 저점 피벗을 나눕니다.
    pub fn pivots_by_kind(&self) -> (Vec<&ZigZagPoint>, Vec<&ZigZagPoint>) {
        self.zigzag.iter().partition(|p| p.kind == Extremum::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    /// 고점과 저점이 함께 올라가는 지그재그 시리즈
    fn rising_waves() -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let closes = [
            100.0, 104.0, 108.0, 103.0, 99.0, 105.0, 111.0, 106.0, 102.0, 109.0, 115.0, 110.0,
            106.0,
        ];
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(start + Duration::days(i as i64), c, c + 1.0, c - 1.0, c, 10))
            .collect()
    }

    #[test]
    fn test_analyze_rising_waves() {
        let structure = MarketStructure::analyze(&rising_waves(), 1, 0.03);

        assert_eq!(structure.swing_count, 5);
        assert_eq!(structure.trend, TrendState::Up);
        assert!(structure.last_change().is_some());
        assert!(structure.zigzag.len() >= 4);
        assert!(structure
            .zigzag
            .windows(2)
            .all(|w| w[0].kind != w[1].kind));

        let (highs, lows) = structure.pivots_by_kind();
        assert_eq!(highs.len() + lows.len(), structure.zigzag.len());
        assert!(highs.iter().all(|p| p.kind == Extremum::High));
    }

    #[test]
    fn test_analyze_empty() {
        let structure = MarketStructure::analyze(&[], 2, 0.05);
        assert_eq!(structure.swing_count, 0);
        assert_eq!(structure.trend, TrendState::None);
        assert!(structure.zigzag.is_empty());
        assert!(structure.last_pivot().is_none());
    }
}
