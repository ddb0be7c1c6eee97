//! 분석 결과 타입.
//!
//! 스윙, 추세 변화, 지그재그 피벗은 모두 실행 단위로 소유되는 값 타입입니다.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::market_data::Candle;

/// 극값 방향 (고점/저점).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Extremum {
    /// 고점
    High,
    /// 저점
    Low,
}

impl fmt::Display for Extremum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extremum::High => f.write_str("High"),
            Extremum::Low => f.write_str("Low"),
        }
    }
}

/// 대칭 윈도우 기준의 국소 극값.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Swing {
    /// 극값이 발생한 캔들
    pub candle: Candle,
    /// 판정에 사용한 윈도우 반경 `n`
    pub period: usize,
    /// 고점/저점
    pub kind: Extremum,
}

impl Swing {
    /// 스윙 가격: 고점이면 `high`, 저점이면 `low`.
    pub fn value(&self) -> f64 {
        match self.kind {
            Extremum::High => self.candle.high,
            Extremum::Low => self.candle.low,
        }
    }
}

/// 추세 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrendState {
    /// 상승 추세 (고점·저점 동반 상승)
    Up,
    /// 하락 추세 (고점·저점 동반 하락)
    Down,
    /// 추세 없음 (횡보)
    #[default]
    None,
}

impl fmt::Display for TrendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendState::Up => f.write_str("Up"),
            TrendState::Down => f.write_str("Down"),
            TrendState::None => f.write_str("No"),
        }
    }
}

/// 추세가 실제로 바뀐 지점.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendChange {
    /// 변화를 일으킨 스윙
    pub swing: Swing,
    /// 새 추세
    pub trend: TrendState,
}

/// 지그재그 피벗.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZigZagPoint {
    /// 피벗이 기록된 캔들
    pub candle: Candle,
    /// 고점/저점
    pub kind: Extremum,
    /// 피벗 가격
    pub price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_swing_value() {
        let candle = Candle::new(Utc::now(), 10.0, 15.0, 8.0, 12.0, 1);
        let high = Swing {
            candle,
            period: 2,
            kind: Extremum::High,
        };
        let low = Swing {
            kind: Extremum::Low,
            ..high
        };
        assert_eq!(high.value(), 15.0);
        assert_eq!(low.value(), 8.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(TrendState::Up.to_string(), "Up");
        assert_eq!(TrendState::None.to_string(), "No");
        assert_eq!(Extremum::Low.to_string(), "Low");
        assert_eq!(TrendState::default(), TrendState::None);
    }
}
