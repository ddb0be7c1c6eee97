//! 캔들 CSV 포맷.
//!
//! 헤더 `time,open,high,low,close,volume`, 시간은 RFC 3339 (UTC),
//! 가격은 소수점 4자리, 거래량은 정수입니다.
//! 내보내기와 CSV 디렉터리 제공자가 같은 포맷을 공유합니다.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use pulse_core::Candle;
use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

/// CSV 열 이름
pub const COLUMNS: [&str; 6] = ["time", "open", "high", "low", "close", "volume"];

/// 쓰기용 행. 가격은 고정 소수점 문자열로 씁니다.
#[derive(Debug, Serialize)]
struct CandleRecord {
    time: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: i64,
}

impl From<&Candle> for CandleRecord {
    fn from(candle: &Candle) -> Self {
        Self {
            time: candle.time.to_rfc3339_opts(SecondsFormat::Secs, true),
            open: format!("{:.4}", candle.open),
            high: format!("{:.4}", candle.high),
            low: format!("{:.4}", candle.low),
            close: format!("{:.4}", candle.close),
            volume: candle.volume,
        }
    }
}

/// 읽기용 행. 열 순서가 아니라 헤더 이름으로 매핑됩니다.
#[derive(Debug, Deserialize)]
struct CandleRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
}

/// 캔들을 CSV로 씁니다.
pub fn write_candles<W: Write>(writer: W, candles: &[Candle]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for candle in candles {
        wtr.serialize(CandleRecord::from(candle))?;
    }
    if candles.is_empty() {
        wtr.write_record(COLUMNS)?;
    }
    wtr.flush()?;
    Ok(())
}

/// 캔들을 CSV 바이트로 변환합니다.
pub fn to_csv_bytes(candles: &[Candle]) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(64 * (candles.len() + 1));
    write_candles(&mut buf, candles)?;
    Ok(buf)
}

/// CSV 텍스트를 캔들로 읽습니다.
///
/// 필수 열이 없거나 값 파싱에 실패하면 줄 번호를 포함한 `ParseError`를 반환합니다.
pub fn parse_candles(text: &str) -> Result<Vec<Candle>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if let Some(missing) = COLUMNS.iter().find(|c| !headers.iter().any(|h| h == **c)) {
        return Err(DataError::ParseError(format!("missing column: {}", missing)));
    }

    let mut candles = Vec::new();
    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record)? {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let row: CandleRow = record
            .deserialize(Some(&headers))
            .map_err(|e| DataError::ParseError(format!("line {}: {}", line, e)))?;
        let time = DateTime::parse_from_rfc3339(&row.time)
            .map_err(|e| DataError::ParseError(format!("line {}: invalid time: {}", line, e)))?
            .with_timezone(&Utc);

        candles.push(Candle::new(
            time, row.open, row.high, row.low, row.close, row.volume,
        ));
    }
    Ok(candles)
}
