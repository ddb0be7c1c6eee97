//! 캔들 CSV 내보내기.
//!
//! CLI(`export-candles`)와 텔레그램 `/candles` 명령이 같은 경로를 씁니다.
//! 파이프라인과 달리 종목 없음/빈 결과는 호출자에게 에러로 돌려줍니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pulse_core::{MarketDataSource, Timeframe};
use tracing::info;

use crate::candle_csv::to_csv_bytes;
use crate::error::{DataError, Result};

/// 캔들 CSV 내보내기 서비스.
#[derive(Clone)]
pub struct CandleExporter {
    source: Arc<dyn MarketDataSource>,
}

impl CandleExporter {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self { source }
    }

    /// `[from, to)` 구간 캔들을 CSV 바이트로 내보냅니다.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: 알 수 없는 타임프레임
    /// - `NotFound`: 종목 없음
    /// - `InvalidData`: 구간에 캔들이 없음
    /// - `Source`: 제공자 에러
    pub async fn export(
        &self,
        query: &str,
        timeframe: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<u8>> {
        let timeframe: Timeframe = timeframe.parse().map_err(DataError::InvalidInput)?;

        let instrument = self
            .source
            .find_instrument(query)
            .await?
            .ok_or_else(|| DataError::NotFound(format!("instrument not found: {}", query)))?;

        let candles = self
            .source
            .get_candles(&instrument, from, to, timeframe)
            .await?;
        if candles.is_empty() {
            return Err(DataError::InvalidData(format!(
                "no candles for {} in the given period",
                query
            )));
        }

        info!(
            instrument = %instrument.ticker,
            timeframe = %timeframe,
            count = candles.len(),
            source = self.source.name(),
            "캔들 내보내기"
        );
        to_csv_bytes(&candles)
    }
}
