//! 차트 렌더링 계약.
//!
//! 실제 이미지 생성은 외부 렌더러가 맡습니다. 파이프라인은 캔들, EMA 오버레이,
//! ZigZag 피벗 마커를 [`ChartInput`]으로 넘기고 PNG 바이트를 받습니다.

use chrono::{DateTime, Utc};
use pulse_analytics::MarketStructure;
use pulse_core::{closes, Candle, IndicatorSource};
use thiserror::Error;

/// 차트 렌더링 에러.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("차트 입력이 비어 있습니다")]
    EmptyInput,

    #[error("차트 열 길이가 다릅니다: {0}")]
    Misaligned(&'static str),

    #[error("차트 렌더링 실패: {0}")]
    Render(String),
}

/// 캔들 위에 그리는 선 시리즈 (예: EMA20).
#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub name: String,
    pub times: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

/// 점 마커 (예: ZigZag 고점).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// 렌더러 입력. OHLC 배열은 모두 같은 길이입니다.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartInput {
    pub title: String,
    pub times: Vec<DateTime<Utc>>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub overlays: Vec<LineSeries>,
    /// 고점 마커
    pub high_points: Vec<ChartPoint>,
    /// 저점 마커
    pub low_points: Vec<ChartPoint>,
}

impl ChartInput {
    /// 캔들을 열 단위 배열로 변환합니다.
    pub fn from_candles(
        title: impl Into<String>,
        candles: &[Candle],
        overlays: Vec<LineSeries>,
    ) -> Self {
        Self {
            title: title.into(),
            times: candles.iter().map(|c| c.time).collect(),
            open: candles.iter().map(|c| c.open).collect(),
            high: candles.iter().map(|c| c.high).collect(),
            low: candles.iter().map(|c| c.low).collect(),
            close: closes(candles),
            overlays,
            high_points: Vec::new(),
            low_points: Vec::new(),
        }
    }

    /// 고점/저점 마커를 설정합니다.
    pub fn with_markers(mut self, (high, low): (Vec<ChartPoint>, Vec<ChartPoint>)) -> Self {
        self.high_points = high;
        self.low_points = low;
        self
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// 렌더링 전에 입력을 확인합니다.
    ///
    /// 캔들이 없으면 `EmptyInput`, OHLC나 오버레이 길이가 맞지 않으면 `Misaligned`.
    pub fn validate(&self) -> Result<(), ChartError> {
        if self.is_empty() {
            return Err(ChartError::EmptyInput);
        }
        let len = self.len();
        for (name, column) in [
            ("open", &self.open),
            ("high", &self.high),
            ("low", &self.low),
            ("close", &self.close),
        ] {
            if column.len() != len {
                return Err(ChartError::Misaligned(name));
            }
        }
        if self
            .overlays
            .iter()
            .any(|o| o.values.len() != o.times.len())
        {
            return Err(ChartError::Misaligned("overlay"));
        }
        Ok(())
    }
}

/// 차트 렌더러 trait.
pub trait ChartRenderer: Send + Sync {
    /// PNG 이미지를 생성합니다. 빈 결과는 전송하지 않습니다.
    fn render(&self, input: &ChartInput) -> Result<Vec<u8>, ChartError>;
}

/// ZigZag 피벗을 고점/저점 마커로 나눕니다.
pub fn build_zigzag_markers(structure: &MarketStructure) -> (Vec<ChartPoint>, Vec<ChartPoint>) {
    let (highs, lows) = structure.pivots_by_kind();
    let to_points = |pivots: Vec<&pulse_core::ZigZagPoint>| {
        pivots
            .into_iter()
            .map(|p| ChartPoint {
                time: p.candle.time,
                value: p.price,
            })
            .collect::<Vec<_>>()
    };
    (to_points(highs), to_points(lows))
}

/// EMA 오버레이 시리즈를 만듭니다.
///
/// 기간마다 `ema_series`를 요청하고 캔들과 길이가 같은 시리즈만 포함합니다.
/// 지표 제공자가 없거나 캔들이 비어 있으면 빈 목록입니다.
pub fn build_ema_overlays(
    indicators: Option<&dyn IndicatorSource>,
    candles: &[Candle],
    periods: &[usize],
) -> Vec<LineSeries> {
    let Some(source) = indicators else {
        return Vec::new();
    };
    if candles.is_empty() {
        return Vec::new();
    }

    let closes = closes(candles);
    let times: Vec<DateTime<Utc>> = candles.iter().map(|c| c.time).collect();

    periods
        .iter()
        .filter_map(|&period| {
            let series = source.ema_series(&closes, period);
            if series.values.len() != times.len() {
                tracing::debug!(period, "EMA 시리즈 길이 불일치, 오버레이 제외");
                return None;
            }
            Some(LineSeries {
                name: format!("EMA{period}"),
                times: times.clone(),
                values: series.values,
            })
        })
        .collect()
}
