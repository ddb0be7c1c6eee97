//! 시장 데이터 제공자 구현.

pub mod csv_dir;
pub mod yahoo;

pub use csv_dir::CsvDirectorySource;
pub use yahoo::{yahoo_interval, YahooMarketData};
