//! 시장 데이터 어댑터.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Yahoo Finance 제공자 (`yahoo_finance_api`)
//! - CSV 디렉터리 제공자 (오프라인 실행용)
//! - 캔들 CSV 포맷과 내보내기 서비스

pub mod candle_csv;
pub mod error;
pub mod export;
pub mod provider;

pub use error::{DataError, Result};
pub use export::CandleExporter;
pub use provider::{CsvDirectorySource, YahooMarketData};
