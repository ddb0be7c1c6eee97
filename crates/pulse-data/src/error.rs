//! 데이터 모듈 오류 타입.

use pulse_core::PulseError;
use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 레코드를 찾을 수 없음
    #[error("Record not found: {0}")]
    NotFound(String),

    /// 잘못된 데이터 형식
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 잘못된 입력 (타임프레임, 기간 등)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 데이터 가져오기 오류 (외부 소스)
    #[error("Fetch error: {0}")]
    FetchError(String),

    /// 파싱 오류
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 파일 입출력 오류
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 시장 데이터 제공자 오류
    #[error(transparent)]
    Source(#[from] PulseError),
}

impl From<csv::Error> for DataError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::Io(_) => DataError::Io(std::io::Error::other(err.to_string())),
            _ => DataError::ParseError(err.to_string()),
        }
    }
}

impl From<DataError> for PulseError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::NotFound(msg) => PulseError::NotFound(msg),
            DataError::InvalidInput(msg) => PulseError::InvalidInput(msg),
            DataError::FetchError(msg) => PulseError::Network(msg),
            DataError::Source(inner) => inner,
            other => PulseError::MarketData(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
