//! 외부 협력자 계약.
//!
//! 코어는 시장 데이터 조회와 지표 계산을 직접 구현하지 않고
//! 아래 trait을 통해서만 접근합니다. 구현체는 `pulse-data`, `pulse-analytics`에 있습니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::market_data::{Candle, Instrument};
use crate::error::PulseResult;
use crate::types::Timeframe;

// =============================================================================
// MarketDataSource
// =============================================================================

/// 시장 데이터 제공자 trait.
///
/// # 구현 예시
///
/// ```ignore
/// pub struct YahooMarketData {
///     client: reqwest::Client,
/// }
///
/// #[async_trait]
/// impl MarketDataSource for YahooMarketData {
///     async fn find_instrument(&self, query: &str) -> PulseResult<Option<Instrument>> {
///         // 검색 API 호출 및 변환
///     }
///
///     // ... 나머지 메서드 구현
/// }
/// ```
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 질의 문자열(ISIN, 티커 등)로 종목을 찾습니다.
    ///
    /// 찾지 못하면 `Ok(None)`을 반환합니다.
    ///
    /// # Errors
    ///
    /// - `PulseError::Network`: 네트워크 연결 실패
    /// - `PulseError::MarketData`: 백엔드 API 에러
    async fn find_instrument(&self, query: &str) -> PulseResult<Option<Instrument>>;

    /// `[from, to)` 구간의 캔들을 조회합니다.
    ///
    /// 반환되는 캔들은 시간 오름차순이어야 합니다. 코어는 재정렬하지 않습니다.
    async fn get_candles(
        &self,
        instrument: &Instrument,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        timeframe: Timeframe,
    ) -> PulseResult<Vec<Candle>>;

    /// 제공자 이름 (로깅용).
    fn name(&self) -> &str;
}

// =============================================================================
// IndicatorSource
// =============================================================================

/// 지표 스냅샷: 각 지표의 마지막 값.
///
/// 워밍업이 끝나지 않은 지표는 `None`입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// SMA 마지막 값
    pub sma: Option<f64>,
    /// EMA 마지막 값
    pub ema: Option<f64>,
    /// RSI 마지막 값 (0 ~ 100)
    pub rsi: Option<f64>,
}

impl IndicatorSnapshot {
    /// 모든 값이 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.sma.is_none() && self.ema.is_none() && self.rsi.is_none()
    }
}

/// 종가에 인덱스 정렬된 지표 시리즈.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesResult {
    /// 종가와 같은 길이의 값 (워밍업 구간은 0)
    pub values: Vec<f64>,
    /// 유효 값이 나오기 전 필요한 포인트 수
    pub warmup: usize,
    /// 유효한 정렬 값이 두 개 이상 있으면 true
    pub ready: bool,
}

impl SeriesResult {
    /// 준비되지 않은 빈 시리즈.
    pub fn not_ready(len: usize, warmup: usize) -> Self {
        Self {
            values: vec![0.0; len],
            warmup,
            ready: false,
        }
    }
}

/// 지표 계산 제공자 trait.
///
/// 지표 값을 "어떻게" 계산하는지는 구현체의 몫이고,
/// 값의 의미(피처, 이벤트)는 분석 코어가 정의합니다.
pub trait IndicatorSource: Send + Sync {
    /// 종가 시리즈에서 SMA/EMA/RSI 마지막 값을 계산합니다.
    fn compute_snapshot(&self, closes: &[f64]) -> IndicatorSnapshot;

    /// 종가에 정렬된 EMA(period) 시리즈를 계산합니다.
    fn ema_series(&self, closes: &[f64], period: usize) -> SeriesResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_empty() {
        assert!(IndicatorSnapshot::default().is_empty());
        let snapshot = IndicatorSnapshot {
            rsi: Some(55.0),
            ..Default::default()
        };
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_series_not_ready() {
        let series = SeriesResult::not_ready(5, 20);
        assert_eq!(series.values.len(), 5);
        assert_eq!(series.warmup, 20);
        assert!(!series.ready);
    }
}
