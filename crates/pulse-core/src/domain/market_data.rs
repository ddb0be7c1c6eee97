//! 시장 데이터 타입.
//!
//! - `Candle` - OHLCV 캔들
//! - `Instrument` - 조회된 종목 식별 정보

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV 캔들.
///
/// 코어에 전달되는 시리즈는 `time` 오름차순, 기간당 하나, 중복 없음이 전제입니다.
/// 코어는 캔들을 수정하지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 시가
    pub open: f64,
    /// 고가
    pub high: f64,
    /// 저가
    pub low: f64,
    /// 종가
    pub close: f64,
    /// 거래량
    pub volume: i64,
    /// 캔들 시작 시간
    pub time: DateTime<Utc>,
    /// 마감된 캔들 여부
    pub is_complete: bool,
}

impl Candle {
    /// 마감된 캔들을 생성합니다.
    pub fn new(
        time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
    ) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
            time,
            is_complete: true,
        }
    }

    /// 캔들 범위(고가 - 저가)를 반환합니다.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// 양봉인지 확인합니다.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// 종가 시리즈를 추출합니다.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// 거래량 시리즈를 추출합니다.
pub fn volumes(candles: &[Candle]) -> Vec<i64> {
    candles.iter().map(|c| c.volume).collect()
}

/// 시간 오름차순이고 중복 타임스탬프가 없는지 확인합니다.
pub fn is_chronological(candles: &[Candle]) -> bool {
    candles.windows(2).all(|w| w[0].time < w[1].time)
}

/// 조회된 종목.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// 백엔드 식별자 (FIGI, 티커 등)
    pub id: String,
    /// 티커
    pub ticker: String,
    /// 표시 이름
    pub name: String,
}

impl Instrument {
    /// 새 종목을 생성합니다.
    pub fn new(id: impl Into<String>, ticker: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ticker: ticker.into(),
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day)
    }

    #[test]
    fn test_series_extraction() {
        let candles = vec![
            Candle::new(at(0), 10.0, 12.0, 9.0, 11.0, 100),
            Candle::new(at(1), 11.0, 13.0, 10.0, 12.5, 250),
        ];
        assert_eq!(closes(&candles), vec![11.0, 12.5]);
        assert_eq!(volumes(&candles), vec![100, 250]);
        assert!(candles[0].is_bullish());
        assert_eq!(candles[1].range(), 3.0);
    }

    #[test]
    fn test_is_chronological() {
        let a = Candle::new(at(0), 1.0, 1.0, 1.0, 1.0, 0);
        let b = Candle::new(at(1), 1.0, 1.0, 1.0, 1.0, 0);
        assert!(is_chronological(&[]));
        assert!(is_chronological(&[a, b]));
        assert!(!is_chronological(&[b, a]));
        assert!(!is_chronological(&[a, a]));
    }
}
