//! Yahoo Finance 기반 시장 데이터 제공자.
//!
//! `yahoo_finance_api`의 [`YahooConnector`](yahoo::YahooConnector)를 사용합니다.
//! - 종목 조회: 티커 검색 결과에서 심볼이 일치하는 항목 (없으면 첫 항목)
//! - 캔들 조회: 기간 지정 조회 후 `[from, to)`로 필터링
//!
//! 값이 비정상인 봉(NaN, 0 이하 가격)은 버립니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pulse_core::{Candle, Instrument, MarketDataSource, PulseError, PulseResult, Timeframe};
use time::OffsetDateTime;
use tracing::{debug, warn};
use yahoo_finance_api as yahoo;

use crate::error::{DataError, Result};

/// 타임프레임을 Yahoo 간격 문자열로 변환합니다.
///
/// Yahoo가 지원하지 않는 간격(3m, 10m, 2h, 4h)은 `None`입니다.
pub fn yahoo_interval(timeframe: Timeframe) -> Option<&'static str> {
    match timeframe {
        Timeframe::M1 => Some("1m"),
        Timeframe::M2 => Some("2m"),
        Timeframe::M5 => Some("5m"),
        Timeframe::M15 => Some("15m"),
        Timeframe::M30 => Some("30m"),
        Timeframe::H1 => Some("60m"),
        Timeframe::D1 => Some("1d"),
        Timeframe::W1 => Some("1wk"),
        Timeframe::MN1 => Some("1mo"),
        Timeframe::M3 | Timeframe::M10 | Timeframe::H2 | Timeframe::H4 => None,
    }
}

/// Yahoo 오류 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum YahooFailure {
    NotFound,
    Empty,
    RateLimited,
    Other,
}

/// 오류 메시지로 Yahoo 오류를 분류합니다.
///
/// 커넥터 오류 타입은 HTTP 상태를 메시지로만 전달합니다.
fn classify_failure(message: &str) -> YahooFailure {
    let lower = message.to_ascii_lowercase();
    if lower.contains("429") || lower.contains("too many") {
        YahooFailure::RateLimited
    } else if lower.contains("404") || lower.contains("not found") || lower.contains("no data") {
        YahooFailure::NotFound
    } else if lower.contains("empty data") {
        YahooFailure::Empty
    } else {
        YahooFailure::Other
    }
}

fn failure_to_error(symbol: &str, message: String) -> PulseError {
    match classify_failure(&message) {
        YahooFailure::RateLimited => PulseError::RateLimit(format!("Yahoo Finance: {}", message)),
        YahooFailure::NotFound => PulseError::NotFound(symbol.to_string()),
        YahooFailure::Empty | YahooFailure::Other => DataError::FetchError(format!(
            "Yahoo Finance API 오류 ({}): {}",
            symbol, message
        ))
        .into(),
    }
}

fn to_offset_datetime(time: DateTime<Utc>) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(time.timestamp())
        .map_err(|e| DataError::InvalidInput(format!("기간 변환 실패: {}", e)))
}

/// 커넥터 응답에서 뽑은 봉 하나.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bar {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
}

impl Bar {
    fn from_quote(quote: &yahoo::Quote) -> Self {
        Self {
            timestamp: quote.timestamp as i64,
            open: quote.open,
            high: quote.high,
            low: quote.low,
            close: quote.close,
            volume: quote.volume as i64,
        }
    }

    fn is_valid(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }
}

/// 봉을 캔들로 변환합니다. 정렬/중복 제거 후 `[from, to)` 구간만 남깁니다.
fn bars_to_candles(
    bars: impl IntoIterator<Item = Bar>,
    timeframe: Timeframe,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<Candle>> {
    let span = chrono::Duration::from_std(timeframe.duration())
        .map_err(|e| DataError::InvalidInput(e.to_string()))?;

    let mut candles: Vec<Candle> = bars
        .into_iter()
        .filter_map(|bar| {
            if !bar.is_valid() {
                debug!(timestamp = bar.timestamp, "비정상 봉 건너뜀");
                return None;
            }
            let Some(time) = DateTime::from_timestamp(bar.timestamp, 0) else {
                warn!(timestamp = bar.timestamp, "잘못된 타임스탬프");
                return None;
            };
            let mut candle = Candle::new(time, bar.open, bar.high, bar.low, bar.close, bar.volume);
            candle.is_complete = time + span <= now;
            Some(candle)
        })
        .filter(|c| c.time >= from && c.time < to)
        .collect();

    // 날짜순 정렬 (오래된 것부터), 중복 제거
    candles.sort_by_key(|c| c.time);
    candles.dedup_by_key(|c| c.time);
    Ok(candles)
}

/// Yahoo Finance 시장 데이터 제공자.
pub struct YahooMarketData {
    connector: yahoo::YahooConnector,
}

impl YahooMarketData {
    pub fn new() -> Result<Self> {
        let connector = yahoo::YahooConnector::new()
            .map_err(|e| DataError::FetchError(format!("Yahoo Finance 연결 실패: {}", e)))?;
        Ok(Self { connector })
    }
}

#[async_trait]
impl MarketDataSource for YahooMarketData {
    async fn find_instrument(&self, query: &str) -> PulseResult<Option<Instrument>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        let result = match self.connector.search_ticker(query).await {
            Ok(result) => result,
            Err(e) => {
                return match failure_to_error(query, e.to_string()) {
                    PulseError::NotFound(_) => Ok(None),
                    other => Err(other),
                }
            }
        };

        let quote = result
            .quotes
            .iter()
            .find(|q| q.symbol.eq_ignore_ascii_case(query))
            .or_else(|| result.quotes.first());
        let Some(quote) = quote else {
            debug!(query, "검색 결과 없음");
            return Ok(None);
        };

        let name = [&quote.long_name, &quote.short_name]
            .into_iter()
            .find(|n| !n.is_empty())
            .cloned()
            .unwrap_or_else(|| quote.symbol.clone());
        Ok(Some(Instrument::new(
            quote.symbol.clone(),
            quote.symbol.clone(),
            name,
        )))
    }

    async fn get_candles(
        &self,
        instrument: &Instrument,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        timeframe: Timeframe,
    ) -> PulseResult<Vec<Candle>> {
        let interval = yahoo_interval(timeframe).ok_or_else(|| {
            PulseError::InvalidInput(format!("Yahoo Finance does not support {}", timeframe))
        })?;
        if from >= to {
            return Ok(Vec::new());
        }

        let symbol = instrument.ticker.as_str();
        debug!(symbol, interval, from = %from, to = %to, "Yahoo Finance 기간 조회");

        let response = match self
            .connector
            .get_quote_history_interval(
                symbol,
                to_offset_datetime(from)?,
                to_offset_datetime(to)?,
                interval,
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let message = e.to_string();
                if classify_failure(&message) == YahooFailure::Empty {
                    return Ok(Vec::new());
                }
                return Err(failure_to_error(symbol, message));
            }
        };

        let quotes = match response.quotes() {
            Ok(quotes) => quotes,
            Err(e) => {
                let message = e.to_string();
                if classify_failure(&message) == YahooFailure::Empty {
                    return Ok(Vec::new());
                }
                return Err(DataError::ParseError(format!("Quote 파싱 오류: {}", message)).into());
            }
        };

        let candles = bars_to_candles(
            quotes.iter().map(Bar::from_quote),
            timeframe,
            from,
            to,
            Utc::now(),
        )?;
        Ok(candles)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(timestamp: i64, close: f64) -> Bar {
        Bar {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 10,
        }
    }

    #[test]
    fn test_interval_mapping() {
        assert_eq!(yahoo_interval(Timeframe::D1), Some("1d"));
        assert_eq!(yahoo_interval(Timeframe::H1), Some("60m"));
        assert_eq!(yahoo_interval(Timeframe::W1), Some("1wk"));
        assert_eq!(yahoo_interval(Timeframe::H4), None);
    }

    #[test]
    fn test_bars_to_candles_sorts_and_filters() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        let bars = vec![
            bar(1704153600, 2.0), // 01-02
            bar(1704067200, 1.0), // 01-01
            bar(1704067200, 1.0), // 중복
            bar(1704240000, 3.0), // 01-03, 구간 밖
            bar(1704110400, f64::NAN),
        ];

        let candles = bars_to_candles(bars, Timeframe::D1, from, to, now).unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, 1.0);
        assert_eq!(candles[1].close, 2.0);
        assert!(candles[0].is_complete);
        // 2024-01-02 봉은 아직 끝나지 않음
        assert!(!candles[1].is_complete);
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(
            classify_failure("fetching failed: 429 Too Many Requests"),
            YahooFailure::RateLimited
        );
        assert_eq!(classify_failure("HTTP 404 Not Found"), YahooFailure::NotFound);
        assert_eq!(
            classify_failure("yahoo! finance returned an empty data set"),
            YahooFailure::Empty
        );
        assert_eq!(classify_failure("connection reset"), YahooFailure::Other);
    }

    #[test]
    fn test_failure_to_error() {
        assert!(matches!(
            failure_to_error("SPY", "429".into()),
            PulseError::RateLimit(_)
        ));
        assert!(matches!(
            failure_to_error("NOPE", "Not Found".into()),
            PulseError::NotFound(ref s) if s == "NOPE"
        ));
        assert!(failure_to_error("SPY", "timeout".into()).is_retryable());
    }

    #[test]
    fn test_to_offset_datetime() {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(to_offset_datetime(time).unwrap().unix_timestamp(), 1704067200);
    }
}
