//! CSV 디렉터리 기반 시장 데이터 제공자.
//!
//! `{dir}/{QUERY}.csv` 파일 하나가 종목 하나입니다. 파일 형식은 [`crate::candle_csv`]를 따르며
//! `export-candles`로 내려받은 파일을 그대로 사용할 수 있습니다.
//! 네트워크 없이 파이프라인을 돌리거나 재현 가능한 리포트를 만들 때 씁니다.
//!
//! 파일 하나는 한 가지 간격만 담습니다. 요청한 타임프레임으로 리샘플링하지 않으며
//! 어떤 타임프레임을 요청해도 같은 파일을 돌려줍니다.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{is_chronological, Candle, Instrument, MarketDataSource, PulseResult, Timeframe};
use tracing::debug;

use crate::candle_csv::parse_candles;
use crate::error::DataError;

/// CSV 디렉터리 제공자.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 데이터 디렉터리.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker))
    }
}

/// 파일 이름으로 쓸 수 없는 질의인지 확인합니다.
fn is_safe_ticker(query: &str) -> bool {
    !query.is_empty()
        && query
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '^' | '='))
        && !query.contains("..")
}

#[async_trait]
impl MarketDataSource for CsvDirectorySource {
    async fn find_instrument(&self, query: &str) -> PulseResult<Option<Instrument>> {
        let ticker = query.trim().to_uppercase();
        if !is_safe_ticker(&ticker) {
            return Ok(None);
        }
        let exists = tokio::fs::try_exists(self.file_for(&ticker))
            .await
            .map_err(DataError::from)?;
        Ok(exists.then(|| Instrument::new(ticker.clone(), ticker.clone(), ticker)))
    }

    async fn get_candles(
        &self,
        instrument: &Instrument,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        timeframe: Timeframe,
    ) -> PulseResult<Vec<Candle>> {
        let path = self.file_for(&instrument.ticker);
        // 파일 간격은 확인하지 않음
        debug!(path = %path.display(), timeframe = %timeframe, "CSV 캔들 읽기");

        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(DataError::from)?;
        let mut candles: Vec<Candle> = parse_candles(&text)?
            .into_iter()
            .filter(|c| c.time >= from && c.time < to)
            .collect();

        if !is_chronological(&candles) {
            candles.sort_by_key(|c| c.time);
            candles.dedup_by_key(|c| c.time);
        }
        Ok(candles)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_ticker() {
        assert!(is_safe_ticker("SPY"));
        assert!(is_safe_ticker("005930.KS"));
        assert!(is_safe_ticker("^GSPC"));
        assert!(!is_safe_ticker("../etc/passwd"));
        assert!(!is_safe_ticker("A/B"));
        assert!(!is_safe_ticker(""));
    }
}
